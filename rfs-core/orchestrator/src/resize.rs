//! 扩容协调
//!
//! - 磁盘扩容：重新计算分区清单，把新分区加入已挂载的阵列/池
//! - 集群扩容：对等列表前 K 个为原有节点，其余为新节点。协调者只探测新节点，
//!   一次 add-brick 只加入新 brick；所有节点等待 brick 数达到 N；只有新节点挂载集群卷

use rfs_common::ConfigError;
use tracing::{info, warn};

use crate::context::NodeContext;
use crate::error::{BootstrapError, Result};

const RESIZE_DISKS_MARKER: &str = "resize-disks";
const RESIZE_CLUSTER_MARKER: &str = "resize-cluster";

/// 集群扩容结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterResize {
    /// 扩容后的节点数
    pub node_count: usize,
    /// 本机是否为新节点
    pub is_new_node: bool,
    /// 本次是否执行了 add-brick
    pub added_bricks: bool,
}

/// 扩容协调器
pub struct ResizeCoordinator {
    ctx: NodeContext,
}

impl ResizeCoordinator {
    pub fn new(ctx: NodeContext) -> Self {
        Self { ctx }
    }

    /// 把新磁盘加入本地阵列
    ///
    /// # Returns
    /// 是否执行了扩容
    pub async fn resize_disks(&self) -> Result<bool> {
        let config = &self.ctx.config;
        if config.raid_level != 0 {
            return Err(ConfigError::Unsupported(format!(
                "RAID 级别 {} 不支持磁盘扩容",
                config.raid_level
            ))
            .into());
        }

        let builder = self.ctx.storage_builder();
        let prepared = builder.prepare().await?;
        if !prepared.needs_grow() {
            info!("没有新的磁盘需要加入");
            return Ok(false);
        }

        // 扩容要求阵列已挂载
        let mounts = self.ctx.mounts();
        if !mounts.is_mounted(&config.mountpoint).await? {
            warn!("{} 未挂载，先挂载再扩容", config.mountpoint);
            self.ctx.prepare_local_storage().await?;
        } else {
            builder.grow(&prepared, &config.mountpoint).await?;
        }

        self.ctx.state_store()?.write_marker(RESIZE_DISKS_MARKER)?;
        Ok(true)
    }

    /// 集群扩容
    ///
    /// # Arguments
    /// * `old_count` - 扩容前的节点数 K，对等列表中 `peers[K..]` 为新节点
    pub async fn resize_cluster(&self, old_count: usize) -> Result<ClusterResize> {
        let cluster = self.ctx.cluster_view().await?;
        let node_count = cluster.node_count();

        if old_count == 0 || old_count >= node_count {
            return Err(ConfigError::Invalid(format!(
                "原有节点数 {} 无效（当前对等列表 {} 个节点）",
                old_count, node_count
            ))
            .into());
        }

        let peers = cluster.peers();
        let new_peers = &peers[old_count..];
        let local = cluster.local().clone();
        let is_new_node = local.position >= old_count;
        info!(
            "集群扩容 {} -> {} 个节点，本机 {} 为{}节点",
            old_count,
            node_count,
            local.ip,
            if is_new_node { "新" } else { "原有" }
        );

        let volumes = self.ctx.volume_manager();

        if is_new_node {
            self.ctx.prepare_local_storage().await?;
            volumes.prepare_brick_roots(peers, &local.ip).await?;
        }

        let mut added_bricks = false;
        if cluster.is_coordinator() {
            let targets: Vec<&str> = new_peers.iter().map(|p| p.as_str()).collect();
            self.ctx.peering().form(&targets, targets.len()).await?;

            let current = volumes.current().await?.ok_or_else(|| {
                BootstrapError::Ambiguous(format!("卷 {} 不存在，无法扩容", volumes.volume_name()))
            })?;

            if current.brick_count == node_count {
                info!("卷 {} 已有 {} 个 brick，跳过 add-brick", current.name, node_count);
            } else if current.brick_count == old_count {
                volumes.add_bricks(new_peers, node_count).await?;
                added_bricks = true;
            } else {
                return Err(BootstrapError::Ambiguous(format!(
                    "卷 {} 有 {} 个 brick，既不是原有的 {} 个也不是目标 {} 个",
                    current.name, current.brick_count, old_count, node_count
                )));
            }
        }

        volumes.wait_for_volume(Some(node_count)).await?;

        if is_new_node {
            volumes.mount_client(&local.ip).await?;
        }

        self.ctx.state_store()?.write_marker(RESIZE_CLUSTER_MARKER)?;

        Ok(ClusterResize {
            node_count,
            is_new_node,
            added_bricks,
        })
    }
}
