//! 卷驱动抽象
//!
//! 对等探测、仲裁与卷生命周期只依赖这个 trait，
//! 生产环境使用 [`crate::GlusterClient`]，测试中使用内存实现。

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CreateOutcome, GlusterBrick, GlusterVolume, HealSummary, PeerInfo, VolumeCreateRequest};

#[async_trait]
pub trait VolumeDriver: Send + Sync {
    /// 网络可达性检查
    async fn ping(&self, peer: &str) -> Result<bool>;

    /// 探测对等节点；返回 false 表示本次未成功，可重试
    async fn probe_peer(&self, peer: &str) -> Result<bool>;

    /// 对等节点状态
    async fn peer_status(&self) -> Result<Vec<PeerInfo>>;

    /// 卷信息，卷不存在时返回 None
    async fn volume_info(&self, name: &str) -> Result<Option<GlusterVolume>>;

    /// 创建卷
    async fn create_volume(&self, request: &VolumeCreateRequest, force: bool) -> Result<CreateOutcome>;

    /// 启动卷（已启动视为成功）
    async fn start_volume(&self, name: &str) -> Result<()>;

    /// 设置卷参数
    async fn set_option(&self, name: &str, key: &str, value: &str) -> Result<()>;

    /// 向卷添加 brick
    async fn add_bricks(&self, name: &str, type_args: &[String], bricks: &[GlusterBrick]) -> Result<()>;

    /// `volume heal <name> info` 是否执行成功
    async fn heal_info_succeeds(&self, name: &str) -> Result<bool>;

    /// 触发修复
    async fn trigger_heal(&self, name: &str) -> Result<()>;

    /// 修复统计
    async fn heal_summary(&self, name: &str) -> Result<HealSummary>;
}
