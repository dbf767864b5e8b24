//! 节点引导流程
//!
//! 本地存储 → (glusterfs) 角色 → 对等探测 → 卷创建或加入 → 集群挂载 → 完成标记；
//! (nfs) 本地存储 → 导出 → 完成标记。
//!
//! 每次调用都会重新核对各阶段的实际状态，已完成的节点直接返回。

use rfs_common::{Role, ServerType};
use rfs_disk::{apply_tcp_tuning, NfsExporter, SambaExporter};
use tracing::info;

use crate::context::NodeContext;
use crate::error::Result;
use crate::state::{BootstrapState, StateStore};
use crate::volume::VolumeAction;

/// 引导结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// 之前已完成，本次未做任何修改
    AlreadyDone,
    /// NFS 导出完成
    Exported,
    /// 集群卷已挂载
    Joined {
        role: Role,
        volume: Option<VolumeAction>,
    },
}

/// 引导器
pub struct Bootstrapper {
    ctx: NodeContext,
}

impl Bootstrapper {
    pub fn new(ctx: NodeContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &NodeContext {
        &self.ctx
    }

    /// 执行完整引导流程
    pub async fn run(&self) -> Result<BootstrapOutcome> {
        let mut store = self.ctx.state_store()?;
        if store.is_done() {
            info!("节点已完成引导，无需操作");
            return Ok(BootstrapOutcome::AlreadyDone);
        }
        store.restart();

        if self.ctx.config.tcp_tuning {
            apply_tcp_tuning(self.ctx.runner.as_ref(), &self.ctx.config.paths.sysctl_conf).await?;
        }

        self.ctx.prepare_local_storage().await?;
        store.advance(BootstrapState::LocalStorageReady)?;

        let outcome = match self.ctx.config.server_type {
            ServerType::Nfs => self.export(&mut store).await?,
            ServerType::Glusterfs => self.join_cluster(&mut store).await?,
        };

        self.share_samba().await?;

        store.advance(BootstrapState::Done)?;
        info!("节点引导完成: {:?}", outcome);
        Ok(outcome)
    }

    async fn export(&self, store: &mut StateStore) -> Result<BootstrapOutcome> {
        let config = &self.ctx.config;

        self.ctx.mounts().ensure_shared_dir(&config.mountpoint).await?;
        NfsExporter::new(
            self.ctx.runner.clone(),
            &config.paths.exports,
            &config.nfs.service,
            config.timeouts.device_policy(),
        )
        .export(&config.mountpoint, &config.nfs.hosts)
        .await?;

        store.advance(BootstrapState::Exported)?;
        Ok(BootstrapOutcome::Exported)
    }

    async fn join_cluster(&self, store: &mut StateStore) -> Result<BootstrapOutcome> {
        let cluster = self.ctx.cluster_view().await?;
        let local = cluster.local().clone();
        info!("本机 {} 角色: {} (位置 {})", local.ip, local.role, local.position);

        store.set_role(local.role)?;
        store.advance(BootstrapState::RoleAssigned)?;

        let volumes = self.ctx.volume_manager();
        volumes.prepare_brick_roots(cluster.peers(), &local.ip).await?;

        let mut action = None;
        if cluster.is_coordinator() {
            let peering = self.ctx.peering();
            let others = cluster.others();

            store.advance(BootstrapState::Peering)?;
            peering.probe_all(&others).await?;

            store.advance(BootstrapState::QuorumWait)?;
            peering.wait_quorum(&others, cluster.required_quorum()).await?;
            peering.settle().await;

            action = Some(volumes.ensure_volume(cluster.peers()).await?);
        }

        store.advance(BootstrapState::VolumeWait)?;
        volumes.wait_for_volume(None).await?;

        volumes.mount_client(&local.ip).await?;
        store.advance(BootstrapState::Mounted)?;

        Ok(BootstrapOutcome::Joined {
            role: local.role,
            volume: action,
        })
    }

    async fn share_samba(&self) -> Result<()> {
        let config = &self.ctx.config;
        let Some(samba) = &config.samba else {
            return Ok(());
        };

        let path = samba.path.clone().unwrap_or_else(|| match config.server_type {
            ServerType::Glusterfs => config.gluster.mountpoint.clone(),
            ServerType::Nfs => config.mountpoint.clone(),
        });

        let exporter = SambaExporter::new(
            self.ctx.runner.clone(),
            &config.paths.smb_conf,
            config.timeouts.device_policy(),
        );
        if !exporter.ensure_share(samba, &path).await? {
            info!("Samba 共享 {} 已存在，未修改", samba.share_name);
        }
        Ok(())
    }
}
