//! SSH 执行器
//!
//! 基于 russh 的进程内 SSH 会话，只用于诊断远端节点。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use russh::client;
use russh::{ChannelMsg, Disconnect};
use russh_keys::key;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::{AuthMethod, SshConfig};
use crate::error::{ExecError, Result};
use crate::runner::{CommandOutput, CommandRunner};

/// stderr 对应的扩展数据类型
const EXTENDED_DATA_STDERR: u32 = 1;

/// 未指定私钥时依次尝试的默认密钥
const DEFAULT_KEYS: [&str; 3] = ["id_ed25519", "id_ecdsa", "id_rsa"];

/// 会话回调：诊断场景不校验主机指纹
struct AcceptAnyHostKey;

#[async_trait]
impl client::Handler for AcceptAnyHostKey {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}

pub struct SshRunner {
    config: SshConfig,
    session: Mutex<client::Handle<AcceptAnyHostKey>>,
}

impl SshRunner {
    /// 建立会话并完成认证
    pub async fn connect(config: SshConfig) -> Result<Self> {
        info!("连接远端节点: {} ({})", config.destination(), config.address());

        let session_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.command_deadline()),
            ..Default::default()
        });

        let mut session = timeout(
            config.connect_timeout(),
            client::connect(
                session_config,
                (config.host.as_str(), config.port),
                AcceptAnyHostKey,
            ),
        )
        .await
        .map_err(|_| ExecError::TimeoutError(format!("连接 {}", config.address())))?
        .map_err(|e| ExecError::ConnectionError(format!("{}: {}", config.address(), e)))?;

        if !authenticate(&mut session, &config).await? {
            return Err(ExecError::AuthenticationError(config.destination()));
        }

        info!("SSH 会话已建立: {}", config.destination());
        Ok(Self {
            config,
            session: Mutex::new(session),
        })
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// 关闭会话
    pub async fn disconnect(&self) -> Result<()> {
        self.session
            .lock()
            .await
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| ExecError::ConnectionError(e.to_string()))
    }

    async fn execute(&self, command: &str) -> Result<CommandOutput> {
        let mut channel = {
            let session = self.session.lock().await;
            session
                .channel_open_session()
                .await
                .map_err(|e| ExecError::ConnectionError(format!("{}: {}", self.config.host, e)))?
        };

        channel
            .exec(true, command)
            .await
            .map_err(|e| ExecError::SpawnError(format!("{}: {}", self.config.host, e)))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = None;

        // 退出码可能先于剩余输出到达，读到通道关闭为止
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext } if ext == EXTENDED_DATA_STDERR => {
                    stderr.extend_from_slice(data)
                }
                ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status as i32),
                _ => {}
            }
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&stdout).trim_end().to_string(),
            stderr: String::from_utf8_lossy(&stderr).trim_end().to_string(),
            exit_code,
        })
    }
}

#[async_trait]
impl CommandRunner for SshRunner {
    fn host(&self) -> &str {
        &self.config.host
    }

    async fn run(&self, command: &str) -> Result<CommandOutput> {
        debug!("[{}] {}", self.config.host, command);

        timeout(self.config.command_deadline(), self.execute(command))
            .await
            .map_err(|_| ExecError::TimeoutError(format!("{}: {}", self.config.host, command)))?
    }
}

async fn authenticate(
    session: &mut client::Handle<AcceptAnyHostKey>,
    config: &SshConfig,
) -> Result<bool> {
    let user = config.username.as_str();
    let auth_error = |e: russh::Error| ExecError::AuthenticationError(format!("{}: {}", user, e));

    match &config.auth {
        AuthMethod::Password(password) => session
            .authenticate_password(user, password.as_str())
            .await
            .map_err(auth_error),
        AuthMethod::Key(path) => {
            let key = load_key(&expand_home(path))?;
            session
                .authenticate_publickey(user, Arc::new(key))
                .await
                .map_err(auth_error)
        }
        AuthMethod::DefaultKey => {
            for path in default_key_paths().into_iter().filter(|p| p.exists()) {
                let key = match load_key(&path) {
                    Ok(key) => key,
                    Err(e) => {
                        warn!("跳过私钥 {}: {}", path.display(), e);
                        continue;
                    }
                };
                if session
                    .authenticate_publickey(user, Arc::new(key))
                    .await
                    .map_err(auth_error)?
                {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

fn load_key(path: &Path) -> Result<key::KeyPair> {
    russh_keys::load_secret_key(path, None).map_err(|e| {
        ExecError::AuthenticationError(format!("读取私钥 {} 失败: {}", path.display(), e))
    })
}

/// `~/.ssh` 下的默认私钥，按优先级排列
fn default_key_paths() -> Vec<PathBuf> {
    dirs::home_dir()
        .map(|home| DEFAULT_KEYS.iter().map(|name| home.join(".ssh").join(name)).collect())
        .unwrap_or_default()
}

/// 展开开头的 `~`
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
