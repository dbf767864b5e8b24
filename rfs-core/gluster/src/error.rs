//! Gluster 错误定义

use thiserror::Error;

/// Gluster 操作结果类型
pub type Result<T> = std::result::Result<T, GlusterError>;

/// Gluster 错误类型
#[derive(Error, Debug)]
pub enum GlusterError {
    /// 执行器错误
    #[error("执行器错误: {0}")]
    ExecError(#[from] rfs_executor::ExecError),

    /// 命令执行错误
    #[error("命令执行错误: {0}")]
    CommandError(String),

    /// Gluster 未运行
    #[error("Gluster 服务未运行: {0}")]
    GlusterNotRunning(String),
}

impl GlusterError {
    /// 是否为可以通过等待恢复的瞬时错误
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GlusterError::CommandError(_) | GlusterError::GlusterNotRunning(_)
        )
    }
}
