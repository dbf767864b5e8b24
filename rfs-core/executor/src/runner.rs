//! 命令执行抽象与本地实现

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{ExecError, Result};

/// 命令执行输出
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// 标准输出
    pub stdout: String,
    /// 标准错误
    pub stderr: String,
    /// 退出码（被信号终止时为 None）
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// 构造成功输出
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    /// 构造失败输出
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
        }
    }

    /// 检查命令是否成功执行
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// 获取合并的输出（stdout + stderr）
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// 命令执行器
///
/// 命令以完整的 shell 字符串传入，由实现决定在哪里执行。
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// 执行目标的主机标识（本地为 `localhost`）
    fn host(&self) -> &str;

    /// 执行命令，非零退出码不视为错误
    async fn run(&self, command: &str) -> Result<CommandOutput>;

    /// 执行命令并检查是否成功
    async fn run_checked(&self, command: &str) -> Result<CommandOutput> {
        let output = self.run(command).await?;

        if !output.is_success() {
            return Err(ExecError::CommandFailed {
                command: command.to_string(),
                exit_code: output.exit_code,
                output: output.combined_output(),
            });
        }

        Ok(output)
    }
}

/// 本地 shell 执行器（`sh -c`）
pub struct LocalRunner {
    command_timeout: Duration,
}

impl LocalRunner {
    pub fn new() -> Self {
        Self {
            command_timeout: Duration::from_secs(600),
        }
    }

    /// 设置单条命令超时
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    async fn execute_internal(&self, command: &str) -> Result<CommandOutput> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::SpawnError(format!("{}: {}", command, e)))?;

        let output = child.wait_with_output().await?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code(),
        })
    }
}

impl Default for LocalRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for LocalRunner {
    fn host(&self) -> &str {
        "localhost"
    }

    async fn run(&self, command: &str) -> Result<CommandOutput> {
        debug!("执行命令: {}", command);

        let result = timeout(self.command_timeout, self.execute_internal(command))
            .await
            .map_err(|_| ExecError::TimeoutError(command.to_string()))??;

        debug!(
            "命令执行完成, 退出码: {:?}, stdout 长度: {}, stderr 长度: {}",
            result.exit_code,
            result.stdout.len(),
            result.stderr.len()
        );

        Ok(result)
    }
}

/// 对 shell 参数加单引号
pub fn quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/-_.:=,@+".contains(c))
    {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}
