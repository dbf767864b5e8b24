//! 节点上下文
//!
//! 持有配置、命令执行器和卷驱动，按需构造各阶段使用的组件。

use std::sync::Arc;

use rfs_common::{BootstrapConfig, ClusterView, ConfigError};
use rfs_disk::{compose_mount_options, MountManager, PreparedStorage, StorageBuilder};
use rfs_executor::CommandRunner;
use rfs_gluster::VolumeDriver;
use tracing::{debug, info};

use crate::error::Result;
use crate::peering::PeeringCoordinator;
use crate::state::StateStore;
use crate::volume::VolumeManager;

/// 单个节点的运行上下文
pub struct NodeContext {
    pub config: BootstrapConfig,
    pub runner: Arc<dyn CommandRunner>,
    pub volumes: Arc<dyn VolumeDriver>,
}

impl NodeContext {
    pub fn new(config: BootstrapConfig, runner: Arc<dyn CommandRunner>, volumes: Arc<dyn VolumeDriver>) -> Self {
        Self {
            config,
            runner,
            volumes,
        }
    }

    /// 本机 IP：配置优先，否则取 `hostname -I` 中第一个出现在对等列表里的地址
    pub async fn local_ip(&self) -> Result<String> {
        if let Some(ip) = &self.config.local_ip {
            return Ok(ip.clone());
        }

        let output = self.runner.run_checked("hostname -I").await?;
        let addresses: Vec<&str> = output.stdout.split_whitespace().collect();
        debug!("本机地址: {:?}", addresses);

        addresses
            .iter()
            .find(|a| self.config.peers.iter().any(|p| p == *a))
            .or_else(|| addresses.first())
            .map(|a| a.to_string())
            .ok_or_else(|| ConfigError::Invalid("无法探测本机 IP".to_string()).into())
    }

    /// 本机视角的集群成员关系
    pub async fn cluster_view(&self) -> Result<ClusterView> {
        let local_ip = self.local_ip().await?;
        Ok(ClusterView::new(&self.config.peers, &local_ip)?)
    }

    pub fn state_store(&self) -> Result<StateStore> {
        StateStore::open(&self.config.paths.state_dir)
    }

    pub fn storage_builder(&self) -> StorageBuilder {
        StorageBuilder::new(self.runner.clone(), &self.config)
    }

    pub fn mounts(&self) -> MountManager {
        MountManager::new(
            self.runner.clone(),
            &self.config.paths.fstab,
            self.config.timeouts.device_policy(),
        )
    }

    pub fn peering(&self) -> PeeringCoordinator {
        PeeringCoordinator::new(self.volumes.clone(), &self.config.timeouts)
    }

    pub fn volume_manager(&self) -> VolumeManager {
        VolumeManager::new(
            self.volumes.clone(),
            self.mounts(),
            self.config.gluster.clone(),
            self.config.brick_path(),
            &self.config.timeouts,
        )
    }

    /// 本地存储：构建 → 挂载 → 有新磁盘时扩容
    pub async fn prepare_local_storage(&self) -> Result<PreparedStorage> {
        let config = &self.config;
        let builder = self.storage_builder();
        let prepared = builder.prepare().await?;

        let options = compose_mount_options(config.filesystem, config.storage_tier, &config.mount_options);
        self.mounts()
            .mount_local(&prepared.uuid, &config.mountpoint, config.filesystem, &options)
            .await?;

        if prepared.needs_grow() {
            builder.grow(&prepared, &config.mountpoint).await?;
        }

        info!("本地存储已挂载到 {}", config.mountpoint);
        Ok(prepared)
    }
}
