//! 配置错误定义

use thiserror::Error;

/// 配置操作结果类型
pub type Result<T> = std::result::Result<T, ConfigError>;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件失败: {0}")]
    IoError(#[from] std::io::Error),

    /// 配置文件格式错误
    #[error("解析配置文件失败: {0}")]
    ParseError(#[from] toml::de::Error),

    /// 配置组合不受支持
    #[error("不支持的配置: {0}")]
    Unsupported(String),

    /// 配置取值无效
    #[error("配置无效: {0}")]
    Invalid(String),
}
