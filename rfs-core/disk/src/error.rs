//! 本地存储错误定义

use std::time::Duration;

use thiserror::Error;

/// 本地存储操作结果类型
pub type Result<T> = std::result::Result<T, DiskError>;

/// 本地存储错误类型
#[derive(Error, Debug)]
pub enum DiskError {
    /// 执行器错误
    #[error("执行器错误: {0}")]
    ExecError(#[from] rfs_executor::ExecError),

    /// 不支持的文件系统 / RAID 组合
    #[error("不支持的配置: {0}")]
    Unsupported(String),

    /// 状态不明确，需要人工介入
    #[error("状态不明确，需要人工处理: {0}")]
    Ambiguous(String),

    /// 等待超时
    #[error("{operation} 超时 (上限 {ceiling:?})")]
    Timeout { operation: String, ceiling: Duration },

    /// 没有可用数据盘
    #[error("没有可用的数据盘")]
    NoDisks,

    /// 文件系统缺少 UUID
    #[error("设备 {0} 没有文件系统 UUID")]
    MissingUuid(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),
}

impl DiskError {
    pub(crate) fn timeout(operation: impl Into<String>, ceiling: Duration) -> Self {
        DiskError::Timeout {
            operation: operation.into(),
            ceiling,
        }
    }
}
