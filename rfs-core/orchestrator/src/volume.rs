//! 卷生命周期
//!
//! - 协调者：卷不存在则创建（必要时 force）、调优、启动；已创建未启动则只启动
//! - 所有节点：轮询卷信息直到卷可见，稳定等待后挂载集群卷

use std::sync::Arc;
use std::time::Duration;

use rfs_common::{wait_for, GlusterConfig, Probe, RetryPolicy, TimeoutConfig, VolumeType};
use rfs_disk::MountManager;
use rfs_gluster::{CreateOutcome, GlusterBrick, GlusterError, GlusterVolume, VolumeCreateRequest, VolumeDriver};
use tracing::{debug, info, warn};

use crate::error::{BootstrapError, Result};

/// 有序 brick 列表：`<peer>:<brick_path>`，顺序与对等列表一致
pub fn brick_list(peers: &[String], brick_path: &str) -> Vec<GlusterBrick> {
    peers
        .iter()
        .map(|peer| GlusterBrick::new(peer.as_str(), brick_path))
        .collect()
}

/// 卷类型参数
pub fn volume_type_args(volume_type: VolumeType, custom_args: &str, node_count: usize) -> Vec<String> {
    match volume_type {
        VolumeType::Distributed => Vec::new(),
        VolumeType::Replica => vec!["replica".to_string(), node_count.to_string()],
        VolumeType::Stripe => vec!["stripe".to_string(), node_count.to_string()],
        VolumeType::Custom => custom_args.split_whitespace().map(String::from).collect(),
    }
}

/// 协调者对卷采取的动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeAction {
    /// 新建并启动
    Created { forced: bool },
    /// 已存在，只执行了启动
    Started,
    /// 已存在且已启动
    Unchanged,
}

/// 卷生命周期管理
pub struct VolumeManager {
    volumes: Arc<dyn VolumeDriver>,
    mounts: MountManager,
    gluster: GlusterConfig,
    brick_path: String,
    policy: RetryPolicy,
    settle: Duration,
}

impl VolumeManager {
    pub fn new(
        volumes: Arc<dyn VolumeDriver>,
        mounts: MountManager,
        gluster: GlusterConfig,
        brick_path: impl Into<String>,
        timeouts: &TimeoutConfig,
    ) -> Self {
        Self {
            volumes,
            mounts,
            gluster,
            brick_path: brick_path.into(),
            policy: timeouts.cluster_policy(),
            settle: timeouts.settle(),
        }
    }

    pub fn volume_name(&self) -> &str {
        &self.gluster.volume_name
    }

    /// 卷创建请求
    pub fn create_request(&self, peers: &[String]) -> VolumeCreateRequest {
        VolumeCreateRequest {
            name: self.gluster.volume_name.clone(),
            type_args: volume_type_args(self.gluster.volume_type, &self.gluster.custom_args, peers.len()),
            transport: self.gluster.transport.clone(),
            bricks: brick_list(peers, &self.brick_path),
        }
    }

    /// 为本机拥有的 brick 创建根目录
    pub async fn prepare_brick_roots(&self, peers: &[String], local_ip: &str) -> Result<()> {
        for brick in brick_list(peers, &self.brick_path) {
            if brick.host != local_ip {
                continue;
            }
            self.mounts.ensure_shared_dir(&brick.brick_path).await?;
            debug!("brick 根目录就绪: {}", brick.full_path());
        }
        Ok(())
    }

    /// 协调者：确保卷存在并已启动
    pub async fn ensure_volume(&self, peers: &[String]) -> Result<VolumeAction> {
        let name = self.volume_name();

        match self.volumes.volume_info(name).await? {
            Some(volume) if volume.is_started() => {
                info!("卷 {} 已存在且已启动", name);
                Ok(VolumeAction::Unchanged)
            }
            Some(volume) => {
                info!("卷 {} 已存在（状态 {}），启动", name, volume.status);
                self.volumes.start_volume(name).await?;
                Ok(VolumeAction::Started)
            }
            None => {
                let forced = self.create(peers).await?;
                for (key, value) in &self.gluster.options {
                    self.volumes.set_option(name, key, value).await?;
                }
                self.volumes.start_volume(name).await?;

                if forced && self.gluster.volume_type.is_replicated(&self.gluster.custom_args) {
                    self.report_heal().await;
                }
                Ok(VolumeAction::Created { forced })
            }
        }
    }

    /// 创建卷，只有 Gluster 明确要求时才使用 force
    async fn create(&self, peers: &[String]) -> Result<bool> {
        let request = self.create_request(peers);

        match self.volumes.create_volume(&request, false).await? {
            CreateOutcome::Created => Ok(false),
            CreateOutcome::NeedsForce(reason) => {
                warn!("创建卷 {} 需要 force: {}", request.name, reason.trim());
                match self.volumes.create_volume(&request, true).await? {
                    CreateOutcome::Created => Ok(true),
                    CreateOutcome::NeedsForce(reason) => Err(BootstrapError::Gluster(
                        GlusterError::CommandError(format!("force 创建仍失败: {}", reason)),
                    )),
                }
            }
        }
    }

    /// 强制创建后检查修复状态，只记录日志
    async fn report_heal(&self) {
        let name = self.volume_name();

        match self.volumes.heal_info_succeeds(name).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("卷 {} 不支持 heal info，跳过修复", name);
                return;
            }
            Err(e) => {
                warn!("查询卷 {} 修复信息失败: {}", name, e);
                return;
            }
        }

        if let Err(e) = self.volumes.trigger_heal(name).await {
            warn!("触发卷 {} 修复失败: {}", name, e);
            return;
        }

        match self.volumes.heal_summary(name).await {
            Ok(summary) => info!(
                "卷 {} 修复统计: 待修复 {:?}, 修复失败 {:?}, 脑裂 {:?}",
                name, summary.pending, summary.heal_failed, summary.split_brain
            ),
            Err(e) => warn!("获取卷 {} 修复统计失败: {}", name, e),
        }
    }

    /// 向卷添加 brick，类型参数按扩容后的节点数重新计算
    pub async fn add_bricks(&self, new_peers: &[String], node_count: usize) -> Result<()> {
        let type_args = volume_type_args(self.gluster.volume_type, &self.gluster.custom_args, node_count);
        let bricks = brick_list(new_peers, &self.brick_path);
        self.volumes
            .add_bricks(self.volume_name(), &type_args, &bricks)
            .await?;
        info!("卷 {} 新增 {} 个 brick", self.volume_name(), bricks.len());
        Ok(())
    }

    /// 当前卷信息
    pub async fn current(&self) -> Result<Option<GlusterVolume>> {
        Ok(self.volumes.volume_info(self.volume_name()).await?)
    }

    /// 轮询直到卷可见（可选地要求 brick 数），随后稳定等待
    pub async fn wait_for_volume(&self, expected_bricks: Option<usize>) -> Result<GlusterVolume> {
        let volumes = &self.volumes;
        let name = self.volume_name();
        let operation = match expected_bricks {
            Some(n) => format!("等待卷 {} 达到 {} 个 brick", name, n),
            None => format!("等待卷 {} 可见", name),
        };

        let volume = wait_for(&operation, &self.policy, || async move {
            match volumes.volume_info(name).await {
                Ok(Some(volume)) => match expected_bricks {
                    Some(n) if volume.brick_count != n => Ok(Probe::NotReady(format!(
                        "brick 数 {}/{}",
                        volume.brick_count, n
                    ))),
                    _ => Ok(Probe::Ready(volume)),
                },
                Ok(None) => Ok(Probe::NotReady("卷尚未创建".to_string())),
                Err(e) if e.is_transient() => Ok(Probe::NotReady(e.to_string())),
                Err(e) => Err(BootstrapError::from(e)),
            }
        })
        .await
        .into_result(|_| BootstrapError::timeout(operation.clone(), self.policy.ceiling))?;

        info!("卷 {} 可见: {} 个 brick", name, volume.brick_count);
        tokio::time::sleep(self.settle).await;
        Ok(volume)
    }

    /// 挂载集群卷
    pub async fn mount_client(&self, host: &str) -> Result<()> {
        self.mounts
            .mount_glusterfs(host, self.volume_name(), &self.gluster.mountpoint)
            .await?;
        info!("集群卷挂载到 {}", self.gluster.mountpoint);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peers(ips: &[&str]) -> Vec<String> {
        ips.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_brick_list_is_ordered() {
        let bricks = brick_list(&peers(&["10.0.0.4", "10.0.0.5", "10.0.0.6"]), "/data/brick0");
        let rendered: Vec<String> = bricks.iter().map(|b| b.full_path()).collect();
        assert_eq!(
            rendered,
            vec![
                "10.0.0.4:/data/brick0",
                "10.0.0.5:/data/brick0",
                "10.0.0.6:/data/brick0"
            ]
        );
    }

    #[test]
    fn test_volume_type_args() {
        assert!(volume_type_args(VolumeType::Distributed, "", 3).is_empty());
        assert_eq!(volume_type_args(VolumeType::Replica, "", 4), vec!["replica", "4"]);
        assert_eq!(volume_type_args(VolumeType::Stripe, "", 2), vec!["stripe", "2"]);
        assert_eq!(
            volume_type_args(VolumeType::Custom, "disperse 3  redundancy 1", 3),
            vec!["disperse", "3", "redundancy", "1"]
        );
    }
}
