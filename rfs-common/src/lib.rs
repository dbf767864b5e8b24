//! RFS 通用类型定义
//!
//! 此 crate 包含各节点引导流程共享的基础能力：
//! - 引导配置模型（TOML 文件）
//! - 节点角色推断（协调者 / 跟随者）
//! - 固定间隔、有上限的轮询重试抽象

pub mod config;
pub mod error;
pub mod node;
pub mod retry;

pub use config::{
    BootstrapConfig, FilesystemType, GlusterConfig, NfsConfig, NfsHostRule, PathConfig,
    SambaConfig, ServerType, StorageTier, TimeoutConfig, VolumeType, DEFAULT_CONFIG_PATH,
};
pub use error::{ConfigError, Result};
pub use node::{ClusterView, Node, Role};
pub use retry::{wait_for, Probe, RetryPolicy, WaitOutcome};
