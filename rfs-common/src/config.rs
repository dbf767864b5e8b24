//! 引导配置
//!
//! **数据来源**: 外部供给层渲染的 TOML 文件（默认 /etc/rfs/rfs.toml）
//!
//! 外部层负责申请虚拟机与磁盘，这里只消费结果：
//! - 有序的对等节点 IP 列表（首位即协调者）
//! - 磁盘列表（为空时自动发现）
//! - 文件系统 / RAID / 挂载 / 卷相关的标量参数

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::retry::RetryPolicy;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "/etc/rfs/rfs.toml";

/// 服务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    /// 单节点 NFS 导出
    Nfs,
    /// 多节点 GlusterFS 集群
    Glusterfs,
}

/// 文件系统类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilesystemType {
    Btrfs,
    Ext2,
    Ext3,
    Ext4,
}

impl FilesystemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilesystemType::Btrfs => "btrfs",
            FilesystemType::Ext2 => "ext2",
            FilesystemType::Ext3 => "ext3",
            FilesystemType::Ext4 => "ext4",
        }
    }

    pub fn is_btrfs(&self) -> bool {
        matches!(self, FilesystemType::Btrfs)
    }
}

impl fmt::Display for FilesystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 存储层级（决定挂载选项提示）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageTier {
    /// 高级 SSD 磁盘
    Premium,
    /// 标准磁盘
    Standard,
}

/// Gluster 卷类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeType {
    /// 分布卷，不附加参数
    Distributed,
    /// 副本卷，副本数等于节点数
    Replica,
    /// 条带卷，条带数等于节点数
    Stripe,
    /// 自定义参数，原样透传（如 `disperse 3 redundancy 1`）
    Custom,
}

impl VolumeType {
    /// 是否为需要修复检查的副本/纠删类卷
    pub fn is_replicated(&self, custom_args: &str) -> bool {
        match self {
            VolumeType::Replica => true,
            VolumeType::Custom => {
                let args = custom_args.to_lowercase();
                args.contains("replica") || args.contains("disperse")
            }
            _ => false,
        }
    }
}

/// 引导配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// 服务类型
    pub server_type: ServerType,

    /// 有序的对等节点 IP 列表
    #[serde(default)]
    pub peers: Vec<String>,

    /// 本机 IP（为空时通过 `hostname -I` 探测）
    #[serde(default)]
    pub local_ip: Option<String>,

    /// 数据盘列表（为空时自动发现）
    #[serde(default)]
    pub disks: Vec<String>,

    /// 系统盘 / 临时盘挂载点，承载这些挂载点的磁盘会被排除
    #[serde(default = "default_excluded_mounts")]
    pub excluded_mounts: Vec<String>,

    /// 文件系统类型
    pub filesystem: FilesystemType,

    /// RAID 级别（-1 表示禁用，0 是多盘唯一支持的级别）
    #[serde(default)]
    pub raid_level: i32,

    /// 本地挂载点（brick 根目录或 NFS 导出目录所在位置）
    pub mountpoint: String,

    /// 额外挂载选项（逗号分隔）
    #[serde(default)]
    pub mount_options: String,

    /// 存储层级
    #[serde(default = "default_storage_tier")]
    pub storage_tier: StorageTier,

    /// 是否应用 TCP 调优
    #[serde(default)]
    pub tcp_tuning: bool,

    /// 扩容后是否执行 btrfs 全量均衡
    #[serde(default)]
    pub rebalance: bool,

    /// Gluster 配置
    #[serde(default)]
    pub gluster: GlusterConfig,

    /// NFS 配置
    #[serde(default)]
    pub nfs: NfsConfig,

    /// Samba 共享（可选）
    #[serde(default)]
    pub samba: Option<SambaConfig>,

    /// 超时配置
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// 持久化文件路径
    #[serde(default)]
    pub paths: PathConfig,
}

/// Gluster 卷配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlusterConfig {
    /// 卷名
    #[serde(default = "default_volume_name")]
    pub volume_name: String,

    /// 卷类型
    #[serde(default = "default_volume_type")]
    pub volume_type: VolumeType,

    /// 自定义卷类型参数（仅 custom 类型使用）
    #[serde(default)]
    pub custom_args: String,

    /// 传输类型
    #[serde(default = "default_transport")]
    pub transport: String,

    /// 集群客户端挂载点
    #[serde(default = "default_gluster_mountpoint")]
    pub mountpoint: String,

    /// 卷调优参数（按顺序执行 `gluster volume set`）
    #[serde(default)]
    pub options: Vec<(String, String)>,
}

/// NFS 导出的单个主机规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfsHostRule {
    /// 主机、网段或通配符
    pub host: String,
    /// 导出选项
    pub options: String,
}

/// NFS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NfsConfig {
    /// 主机规则（为空时使用默认规则）
    #[serde(default)]
    pub hosts: Vec<NfsHostRule>,

    /// 内核 NFS 服务名
    #[serde(default = "default_nfs_service")]
    pub service: String,
}

/// Samba 基础共享配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SambaConfig {
    /// 共享名
    pub share_name: String,

    /// 共享路径（为空时使用集群挂载点或本地挂载点）
    #[serde(default)]
    pub path: Option<String>,

    /// 只读
    #[serde(default)]
    pub read_only: bool,

    /// 服务名
    #[serde(default = "default_samba_service")]
    pub service: String,
}

/// 超时配置（秒）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// 轮询间隔
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// 设备 / 挂载类操作的上限
    #[serde(default = "default_device_ceiling")]
    pub device_secs: u64,

    /// 集群类操作（探测、仲裁、卷可见）的上限
    #[serde(default = "default_cluster_ceiling")]
    pub cluster_secs: u64,

    /// 仲裁达成后的固定等待
    #[serde(default = "default_settle")]
    pub settle_secs: u64,

    /// mdadm 重塑的上限
    #[serde(default = "default_reshape_ceiling")]
    pub reshape_secs: u64,
}

/// 持久化文件路径
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    #[serde(default = "default_fstab")]
    pub fstab: PathBuf,
    #[serde(default = "default_exports")]
    pub exports: PathBuf,
    #[serde(default = "default_smb_conf")]
    pub smb_conf: PathBuf,
    #[serde(default = "default_sysctl_conf")]
    pub sysctl_conf: PathBuf,
    /// 状态文件与阶段标记所在目录
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

impl Default for GlusterConfig {
    fn default() -> Self {
        Self {
            volume_name: default_volume_name(),
            volume_type: default_volume_type(),
            custom_args: String::new(),
            transport: default_transport(),
            mountpoint: default_gluster_mountpoint(),
            options: Vec::new(),
        }
    }
}

impl Default for NfsConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            service: default_nfs_service(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            device_secs: default_device_ceiling(),
            cluster_secs: default_cluster_ceiling(),
            settle_secs: default_settle(),
            reshape_secs: default_reshape_ceiling(),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            fstab: default_fstab(),
            exports: default_exports(),
            smb_conf: default_smb_conf(),
            sysctl_conf: default_sysctl_conf(),
            state_dir: default_state_dir(),
        }
    }
}

impl TimeoutConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    /// 设备出现、挂载、服务健康检查使用的策略
    pub fn device_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.interval(), Duration::from_secs(self.device_secs))
    }

    /// 对等探测、仲裁、卷可见使用的策略
    pub fn cluster_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.interval(), Duration::from_secs(self.cluster_secs))
    }

    /// mdadm 重塑等待策略
    pub fn reshape_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_secs(self.interval_secs.max(2)),
            Duration::from_secs(self.reshape_secs),
        )
    }
}

impl BootstrapConfig {
    /// 加载并校验配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// 从 TOML 文本解析并校验配置
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: BootstrapConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 是否启用 RAID
    pub fn raid_enabled(&self) -> bool {
        self.raid_level >= 0
    }

    /// Brick 所在目录：`<mountpoint>/brick0`
    pub fn brick_path(&self) -> String {
        format!("{}/brick0", self.mountpoint.trim_end_matches('/'))
    }

    /// 校验配置组合
    pub fn validate(&self) -> Result<()> {
        if self.mountpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("挂载点不能为空".to_string()));
        }

        match self.raid_level {
            -1 => {
                if self.disks.len() > 1 {
                    return Err(ConfigError::Unsupported(format!(
                        "RAID 已禁用但提供了 {} 块磁盘",
                        self.disks.len()
                    )));
                }
            }
            0 => {}
            level => {
                return Err(ConfigError::Unsupported(format!(
                    "RAID 级别 {} 不受支持（仅支持 -1 或 0），文件系统 {}",
                    level, self.filesystem
                )));
            }
        }

        let mut seen = HashSet::new();
        for peer in &self.peers {
            if !seen.insert(peer.as_str()) {
                return Err(ConfigError::Invalid(format!("对等节点重复: {}", peer)));
            }
        }

        if self.server_type == ServerType::Glusterfs {
            if self.peers.is_empty() {
                return Err(ConfigError::Invalid(
                    "glusterfs 需要至少一个对等节点".to_string(),
                ));
            }
            if self.gluster.volume_name.trim().is_empty() {
                return Err(ConfigError::Invalid("卷名不能为空".to_string()));
            }
            if self.gluster.volume_type == VolumeType::Custom
                && self.gluster.custom_args.trim().is_empty()
            {
                return Err(ConfigError::Invalid(
                    "custom 卷类型需要 custom_args".to_string(),
                ));
            }
        }

        Ok(())
    }
}

// 默认值函数
fn default_excluded_mounts() -> Vec<String> {
    ["/", "/boot", "/boot/efi", "/mnt", "/mnt/resource"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_storage_tier() -> StorageTier {
    StorageTier::Standard
}

fn default_volume_name() -> String {
    "gv0".to_string()
}

fn default_volume_type() -> VolumeType {
    VolumeType::Distributed
}

fn default_transport() -> String {
    "tcp".to_string()
}

fn default_gluster_mountpoint() -> String {
    "/mnt/gluster".to_string()
}

fn default_nfs_service() -> String {
    "nfs-kernel-server".to_string()
}

fn default_samba_service() -> String {
    "smbd".to_string()
}

fn default_interval() -> u64 {
    1
}

fn default_device_ceiling() -> u64 {
    300
}

fn default_cluster_ceiling() -> u64 {
    900
}

fn default_settle() -> u64 {
    5
}

fn default_reshape_ceiling() -> u64 {
    3600
}

fn default_fstab() -> PathBuf {
    PathBuf::from("/etc/fstab")
}

fn default_exports() -> PathBuf {
    PathBuf::from("/etc/exports")
}

fn default_smb_conf() -> PathBuf {
    PathBuf::from("/etc/samba/smb.conf")
}

fn default_sysctl_conf() -> PathBuf {
    PathBuf::from("/etc/sysctl.d/60-rfs-tcp.conf")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("/var/lib/rfs")
}
