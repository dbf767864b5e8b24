//! 编排错误定义

use std::time::Duration;

use thiserror::Error;

use crate::state::BootstrapState;

/// 编排结果类型
pub type Result<T> = std::result::Result<T, BootstrapError>;

/// 编排错误类型
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] rfs_common::ConfigError),

    /// 本地存储错误
    #[error("本地存储错误: {0}")]
    Disk(#[from] rfs_disk::DiskError),

    /// Gluster 错误
    #[error("Gluster 错误: {0}")]
    Gluster(#[from] rfs_gluster::GlusterError),

    /// 执行器错误
    #[error("执行器错误: {0}")]
    Exec(#[from] rfs_executor::ExecError),

    /// 等待超时
    #[error("{operation} 超时 (上限 {ceiling:?})")]
    Timeout { operation: String, ceiling: Duration },

    /// 状态不明确
    #[error("状态不明确，需要人工处理: {0}")]
    Ambiguous(String),

    /// 非法状态迁移
    #[error("非法状态迁移: {from:?} -> {to:?}")]
    IllegalTransition {
        from: BootstrapState,
        to: BootstrapState,
    },

    /// 状态文件错误
    #[error("状态文件错误: {0}")]
    State(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),
}

impl BootstrapError {
    pub(crate) fn timeout(operation: impl Into<String>, ceiling: Duration) -> Self {
        BootstrapError::Timeout {
            operation: operation.into(),
            ceiling,
        }
    }
}

impl From<serde_json::Error> for BootstrapError {
    fn from(e: serde_json::Error) -> Self {
        BootstrapError::State(e.to_string())
    }
}
