//! 对等探测与仲裁等待
//!
//! 只有协调者执行：逐个探测其他节点（先 ping 再 `peer probe`），
//! 随后轮询对等状态直到已连接节点数达到仲裁数，最后固定等待一段时间。

use std::sync::Arc;
use std::time::Duration;

use rfs_common::{wait_for, Probe, RetryPolicy, TimeoutConfig};
use rfs_gluster::{GlusterError, VolumeDriver};
use tracing::{debug, info};

use crate::error::{BootstrapError, Result};

/// 对等探测协调器
pub struct PeeringCoordinator {
    volumes: Arc<dyn VolumeDriver>,
    policy: RetryPolicy,
    settle: Duration,
}

impl PeeringCoordinator {
    pub fn new(volumes: Arc<dyn VolumeDriver>, timeouts: &TimeoutConfig) -> Self {
        Self {
            volumes,
            policy: timeouts.cluster_policy(),
            settle: timeouts.settle(),
        }
    }

    /// 探测单个节点，直到成功或超过上限
    pub async fn probe(&self, peer: &str) -> Result<()> {
        let volumes = &self.volumes;
        let operation = format!("探测对等节点 {}", peer);

        wait_for(&operation, &self.policy, || async move {
            if !volumes.ping(peer).await? {
                return Ok(Probe::NotReady("网络不可达".to_string()));
            }
            Ok::<_, BootstrapError>(if volumes.probe_peer(peer).await? {
                Probe::Ready(())
            } else {
                Probe::NotReady("peer probe 未成功".to_string())
            })
        })
        .await
        .into_result(|_| BootstrapError::timeout(operation.clone(), self.policy.ceiling))?;

        info!("对等节点 {} 探测成功", peer);
        Ok(())
    }

    /// 依次探测所有节点
    pub async fn probe_all(&self, peers: &[&str]) -> Result<()> {
        for peer in peers {
            self.probe(peer).await?;
        }
        Ok(())
    }

    /// 给定节点中已连接的数量
    pub async fn connected_among(&self, peers: &[&str]) -> std::result::Result<usize, GlusterError> {
        let status = self.volumes.peer_status().await?;
        Ok(status
            .iter()
            .filter(|p| p.is_connected() && peers.contains(&p.hostname.as_str()))
            .count())
    }

    /// 轮询对等状态，直到给定节点中已连接数达到 `required`
    pub async fn wait_quorum(&self, peers: &[&str], required: usize) -> Result<usize> {
        let operation = format!("等待 {} 个对等节点连接", required);

        let connected = wait_for(&operation, &self.policy, || async move {
            match self.connected_among(peers).await {
                Ok(n) if n >= required => Ok(Probe::Ready(n)),
                Ok(n) => Ok(Probe::NotReady(format!("已连接 {}/{}", n, required))),
                Err(e) if e.is_transient() => Ok(Probe::NotReady(e.to_string())),
                Err(e) => Err(BootstrapError::from(e)),
            }
        })
        .await
        .into_result(|_| BootstrapError::timeout(operation.clone(), self.policy.ceiling))?;

        info!("仲裁达成: {}/{} 个对等节点已连接", connected, required);
        Ok(connected)
    }

    /// 仲裁达成后的固定等待
    pub async fn settle(&self) {
        debug!("等待 {:?} 让对等状态稳定", self.settle);
        tokio::time::sleep(self.settle).await;
    }

    /// 探测、等待仲裁并稳定
    pub async fn form(&self, peers: &[&str], required: usize) -> Result<()> {
        self.probe_all(peers).await?;
        self.wait_quorum(peers, required).await?;
        self.settle().await;
        Ok(())
    }
}
