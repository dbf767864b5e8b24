//! 公共工具函数模块
//!
//! 提供各命令模块共享的功能：
//! - 配置加载
//! - 本机节点上下文构建

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rfs_common::BootstrapConfig;
use rfs_executor::{CommandRunner, LocalRunner};
use rfs_gluster::GlusterClient;
use rfs_orchestrator::NodeContext;
use tracing::info;

/// 加载并校验配置文件
pub fn load_config(path: &Path) -> Result<BootstrapConfig> {
    let config = BootstrapConfig::load(path)
        .with_context(|| format!("加载配置文件失败: {}", path.display()))?;
    info!(
        "配置已加载: server_type={:?}, peers={}, disks={}",
        config.server_type,
        config.peers.len(),
        config.disks.len()
    );
    Ok(config)
}

/// 构建在本机执行的节点上下文
pub fn local_context(config: BootstrapConfig) -> NodeContext {
    let runner: Arc<dyn CommandRunner> = Arc::new(LocalRunner::new());
    let volumes = Arc::new(GlusterClient::new(runner.clone()));
    NodeContext::new(config, runner, volumes)
}
