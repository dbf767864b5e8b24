//! NFS 导出与 Samba 基础共享
//!
//! 单节点替代路径：向 exports 追加一行（幂等），重载并启动内核 NFS 服务，
//! 返回前确认服务健康。

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use rfs_common::{wait_for, NfsHostRule, Probe, RetryPolicy, SambaConfig};
use rfs_executor::{quote, CommandRunner};
use tracing::{debug, info};

use crate::error::{DiskError, Result};

/// 默认导出选项
pub const DEFAULT_EXPORT_OPTIONS: &str = "rw,sync,root_squash,no_subtree_check";

/// 生成 exports 行
pub fn render_export_line(path: &str, hosts: &[NfsHostRule]) -> String {
    if hosts.is_empty() {
        return format!("{} *({})", path, DEFAULT_EXPORT_OPTIONS);
    }

    let rules: Vec<String> = hosts
        .iter()
        .map(|rule| format!("{}({})", rule.host, rule.options))
        .collect();
    format!("{} {}", path, rules.join(" "))
}

fn append_line(path: &PathBuf, line: &str) -> Result<()> {
    let needs_newline = path.exists()
        && fs::read_to_string(path)?
            .chars()
            .last()
            .map_or(false, |c| c != '\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if needs_newline {
        writeln!(file)?;
    }
    writeln!(file, "{}", line)?;
    Ok(())
}

async fn wait_service_active(
    runner: &Arc<dyn CommandRunner>,
    service: &str,
    policy: &RetryPolicy,
) -> Result<()> {
    let operation = format!("等待服务 {} 就绪", service);
    let cmd = format!("systemctl is-active {}", quote(service));
    let cmd = cmd.as_str();

    wait_for(&operation, policy, || async move {
        let output = runner.run(cmd).await?;
        Ok::<_, DiskError>(if output.is_success() && output.stdout.trim() == "active" {
            Probe::Ready(())
        } else {
            Probe::NotReady(output.combined_output())
        })
    })
    .await
    .into_result(|_| DiskError::timeout(operation.clone(), policy.ceiling))
}

/// NFS 导出管理
pub struct NfsExporter {
    runner: Arc<dyn CommandRunner>,
    exports: PathBuf,
    service: String,
    policy: RetryPolicy,
}

impl NfsExporter {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        exports: impl Into<PathBuf>,
        service: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            runner,
            exports: exports.into(),
            service: service.into(),
            policy,
        }
    }

    /// 追加导出行（幂等）
    ///
    /// # Returns
    /// 本次是否写入了新行
    pub fn ensure_export(&self, path: &str, hosts: &[NfsHostRule]) -> Result<bool> {
        if self.exports.exists() {
            let content = fs::read_to_string(&self.exports)?;
            let exported = content.lines().any(|line| {
                let line = line.trim();
                !line.starts_with('#') && line.split_whitespace().next() == Some(path)
            });
            if exported {
                debug!("{} 已在 {:?} 中导出", path, self.exports);
                return Ok(false);
            }
        }

        let line = render_export_line(path, hosts);
        append_line(&self.exports, &line)?;
        info!("写入导出: {}", line);
        Ok(true)
    }

    /// 重载导出并启动服务，确认健康后返回
    pub async fn reload_service(&self) -> Result<()> {
        let service = quote(&self.service);
        self.runner
            .run_checked(&format!("systemctl enable {}", service))
            .await?;
        self.runner
            .run_checked(&format!("systemctl restart {}", service))
            .await?;
        self.runner.run_checked("exportfs -ra").await?;

        wait_service_active(&self.runner, &self.service, &self.policy).await?;
        info!("NFS 服务 {} 运行正常", self.service);
        Ok(())
    }

    /// 导出目录
    pub async fn export(&self, path: &str, hosts: &[NfsHostRule]) -> Result<()> {
        self.ensure_export(path, hosts)?;
        self.reload_service().await
    }
}

/// Samba 基础共享管理
pub struct SambaExporter {
    runner: Arc<dyn CommandRunner>,
    smb_conf: PathBuf,
    policy: RetryPolicy,
}

impl SambaExporter {
    pub fn new(runner: Arc<dyn CommandRunner>, smb_conf: impl Into<PathBuf>, policy: RetryPolicy) -> Self {
        Self {
            runner,
            smb_conf: smb_conf.into(),
            policy,
        }
    }

    /// 追加共享段（幂等）并重启服务
    pub async fn ensure_share(&self, config: &SambaConfig, path: &str) -> Result<bool> {
        let header = format!("[{}]", config.share_name);
        let exists = self.smb_conf.exists()
            && fs::read_to_string(&self.smb_conf)?
                .lines()
                .any(|l| l.trim() == header);

        if exists {
            debug!("Samba 共享 {} 已存在", config.share_name);
            return Ok(false);
        }

        let block = format!(
            "\n{}\n  path = {}\n  browseable = yes\n  read only = {}\n  guest ok = no\n  create mask = 0777\n  directory mask = 0777\n",
            header,
            path,
            if config.read_only { "yes" } else { "no" }
        );
        append_line(&self.smb_conf, &block)?;
        info!("写入 Samba 共享 {} -> {}", config.share_name, path);

        self.runner
            .run_checked(&format!("systemctl restart {}", quote(&config.service)))
            .await?;
        wait_service_active(&self.runner, &config.service, &self.policy).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_default_export() {
        assert_eq!(
            render_export_line("/data", &[]),
            "/data *(rw,sync,root_squash,no_subtree_check)"
        );
    }

    #[test]
    fn test_render_host_rules() {
        let hosts = vec![
            NfsHostRule {
                host: "10.0.0.0/24".to_string(),
                options: "rw,sync,no_root_squash".to_string(),
            },
            NfsHostRule {
                host: "backup".to_string(),
                options: "ro".to_string(),
            },
        ];
        assert_eq!(
            render_export_line("/data", &hosts),
            "/data 10.0.0.0/24(rw,sync,no_root_squash) backup(ro)"
        );
    }
}
