//! 执行错误定义

use thiserror::Error;

/// 执行操作结果类型
pub type Result<T> = std::result::Result<T, ExecError>;

/// 执行错误类型
#[derive(Error, Debug)]
pub enum ExecError {
    /// 启动进程失败
    #[error("启动进程失败: {0}")]
    SpawnError(String),

    /// 命令以非零状态退出
    #[error("命令执行失败 (退出码 {exit_code:?}): {command}: {output}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    /// 超时错误
    #[error("命令执行超时: {0}")]
    TimeoutError(String),

    /// SSH 连接错误
    #[error("SSH 连接失败: {0}")]
    ConnectionError(String),

    /// SSH 认证错误
    #[error("SSH 认证失败: {0}")]
    AuthenticationError(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),
}
