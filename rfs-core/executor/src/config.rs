//! SSH 配置
//!
//! 仅用于 `stat` 诊断远端节点，引导流程本身总在本机执行。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// SSH 认证方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// 密码认证
    Password(String),
    /// 指定私钥
    Key(PathBuf),
    /// 依次尝试 `~/.ssh` 下的默认私钥
    DefaultKey,
}

impl AuthMethod {
    /// 按命令行参数选择认证方式，密码优先
    pub fn choose(password: Option<String>, key: Option<PathBuf>) -> Self {
        match (password, key) {
            (Some(password), _) => AuthMethod::Password(password),
            (None, Some(key)) => AuthMethod::Key(key),
            (None, None) => AuthMethod::DefaultKey,
        }
    }
}

/// 远端诊断目标
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_username")]
    pub username: String,
    pub auth: AuthMethod,
    /// 建立连接的超时（秒）
    #[serde(default = "default_connect_secs")]
    pub connect_secs: u64,
    /// 单条诊断命令的超时（秒）
    #[serde(default = "default_command_secs")]
    pub command_secs: u64,
}

fn default_port() -> u16 {
    22
}

fn default_username() -> String {
    "root".to_string()
}

fn default_connect_secs() -> u64 {
    15
}

fn default_command_secs() -> u64 {
    120
}

impl SshConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>, auth: AuthMethod) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            username: username.into(),
            auth,
            connect_secs: default_connect_secs(),
            command_secs: default_command_secs(),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_secs = timeout.as_secs().max(1);
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn command_deadline(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    /// `user@host`
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    /// `host:port`，用于日志
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
