use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use rfs_executor::{AuthMethod, LocalRunner, SshConfig, SshRunner};
use rfs_orchestrator::collect_stat;
use tracing::{info, warn};

use super::common::load_config;

/// 远端诊断目标
pub struct RemoteTarget {
    pub host: String,
    pub user: String,
    pub key: Option<PathBuf>,
    pub password: Option<String>,
    pub port: u16,
}

impl RemoteTarget {
    fn ssh_config(&self) -> SshConfig {
        let auth = AuthMethod::choose(self.password.clone(), self.key.clone());
        SshConfig::new(&self.host, &self.user, auth).port(self.port)
    }
}

pub async fn handle(config_path: &Path, target: Option<RemoteTarget>) -> Result<()> {
    let config = load_config(config_path)?;

    let report = match target {
        Some(target) => {
            info!("诊断远端节点: {}", target.host);
            let remote = Arc::new(
                SshRunner::connect(target.ssh_config())
                    .await
                    .with_context(|| format!("连接 {} 失败", target.host))?,
            );
            let report = collect_stat(remote.clone(), &config).await;
            if let Err(e) = remote.disconnect().await {
                warn!("关闭 SSH 会话失败: {}", e);
            }
            report
        }
        None => collect_stat(Arc::new(LocalRunner::new()), &config).await,
    };

    println!("{}\n", format!("节点 {} 诊断信息:", report.host).bold());
    for section in &report.sections {
        println!("{} {}", "==>".bright_black(), section.command.cyan().bold());
        println!("{}\n", section.output.trim_end());
    }
    Ok(())
}
