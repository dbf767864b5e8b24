//! Gluster 数据模型

use serde::{Deserialize, Serialize};

/// Gluster Brick 信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlusterBrick {
    /// 主机名/IP
    pub host: String,
    /// Brick 路径
    pub brick_path: String,
}

impl GlusterBrick {
    /// 创建新的 Brick 信息
    pub fn new(host: impl Into<String>, brick_path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            brick_path: brick_path.into(),
        }
    }

    /// 解析 `host:/path` 格式
    pub fn parse(s: &str) -> Option<Self> {
        let (host, path) = s.trim().split_once(':')?;
        if host.is_empty() || !path.starts_with('/') {
            return None;
        }
        Some(Self::new(host, path))
    }

    /// 获取完整的 brick 标识（host:path 格式）
    pub fn full_path(&self) -> String {
        format!("{}:{}", self.host, self.brick_path)
    }
}

/// Gluster 卷信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlusterVolume {
    /// 卷名
    pub name: String,
    /// 卷类型（Distribute/Replicate/Distributed-Replicate 等）
    pub volume_type: String,
    /// 副本数（`A x B = N` 形式中的 B）
    #[serde(default)]
    pub replica_count: u32,
    /// 状态（Created/Started/Stopped）
    pub status: String,
    /// Brick 总数
    #[serde(default)]
    pub brick_count: usize,
    /// 传输类型
    #[serde(default)]
    pub transport: String,
    /// Brick 列表
    pub bricks: Vec<GlusterBrick>,
}

impl GlusterVolume {
    /// 创建新的卷信息
    pub fn new(name: impl Into<String>, volume_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            volume_type: volume_type.into(),
            replica_count: 0,
            status: "Unknown".to_string(),
            brick_count: 0,
            transport: String::new(),
            bricks: Vec::new(),
        }
    }

    /// 是否已启动
    pub fn is_started(&self) -> bool {
        self.status.eq_ignore_ascii_case("started")
    }

    /// 是否为副本卷
    pub fn is_replicated(&self) -> bool {
        self.replica_count > 1 || self.volume_type.to_lowercase().contains("replicate")
    }
}

/// 对等节点信息（`gluster peer status` 中的一段）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    /// 主机名/IP
    pub hostname: String,
    /// 节点 UUID
    pub uuid: String,
    /// 状态行，如 `Peer in Cluster (Connected)`
    pub state: String,
}

impl PeerInfo {
    /// 是否已加入集群且处于连接状态
    pub fn is_connected(&self) -> bool {
        self.state.contains("Peer in Cluster") && self.state.contains("(Connected)")
    }
}

/// 修复统计（仅用于报告，不影响流程）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealSummary {
    /// 待修复条目数
    pub pending: Option<usize>,
    /// 修复失败条目数（新版本 Gluster 已移除该子命令）
    pub heal_failed: Option<usize>,
    /// 脑裂条目数
    pub split_brain: Option<usize>,
}

/// 卷创建请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeCreateRequest {
    /// 卷名
    pub name: String,
    /// 卷类型参数（如 `replica 3`），分布卷为空
    pub type_args: Vec<String>,
    /// 传输类型
    pub transport: String,
    /// 有序 brick 列表
    pub bricks: Vec<GlusterBrick>,
}

impl VolumeCreateRequest {
    /// 生成 `gluster volume create` 命令
    pub fn to_command(&self, force: bool) -> String {
        let mut parts = vec![
            "gluster".to_string(),
            "volume".to_string(),
            "create".to_string(),
            self.name.clone(),
        ];
        parts.extend(self.type_args.iter().cloned());
        parts.push("transport".to_string());
        parts.push(self.transport.clone());
        parts.extend(self.bricks.iter().map(|b| b.full_path()));
        if force {
            parts.push("force".to_string());
        }
        parts.join(" ")
    }
}

/// 卷创建结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// 创建成功
    Created,
    /// Gluster 拒绝创建并提示需要 force（brick 不属于干净的新目录）
    NeedsForce(String),
}
