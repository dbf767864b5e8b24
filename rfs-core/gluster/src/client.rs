//! Gluster 客户端

use std::sync::Arc;

use async_trait::async_trait;
use rfs_executor::{quote, CommandOutput, CommandRunner};
use tracing::{debug, info, warn};

use crate::driver::VolumeDriver;
use crate::error::{GlusterError, Result};
use crate::models::{
    CreateOutcome, GlusterBrick, GlusterVolume, HealSummary, PeerInfo, VolumeCreateRequest,
};
use crate::parser::{parse_entry_count, parse_peer_status, parse_volume_info};

/// Gluster 客户端
///
/// 通过命令执行器调用本机 `gluster` 命令行
pub struct GlusterClient {
    runner: Arc<dyn CommandRunner>,
}

impl GlusterClient {
    /// 创建新的 Gluster 客户端
    ///
    /// # Arguments
    /// * `runner` - 命令执行器（本机或 SSH）
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// 收集卷与客户端诊断信息（只读）
    ///
    /// # Returns
    /// (命令, 输出) 列表，命令失败时输出中包含错误信息
    pub async fn diagnostics(&self, volume_name: &str) -> Vec<(String, String)> {
        let name = quote(volume_name);
        let commands = [
            "gluster peer status".to_string(),
            format!("gluster volume info {}", name),
            format!("gluster volume status {} detail", name),
            format!("gluster volume status {} clients", name),
        ];

        let mut sections = Vec::new();
        for cmd in commands {
            let text = match self.runner.run(&cmd).await {
                Ok(output) => output.combined_output(),
                Err(e) => format!("<执行失败: {}>", e),
            };
            sections.push((cmd, text));
        }
        sections
    }

    async fn count_entries(&self, cmd: &str) -> Option<usize> {
        match self.runner.run(cmd).await {
            Ok(output) if output.is_success() => Some(parse_entry_count(&output.stdout)),
            Ok(output) => {
                debug!("{} 不可用: {}", cmd, output.combined_output());
                None
            }
            Err(e) => {
                warn!("{} 执行失败: {}", cmd, e);
                None
            }
        }
    }
}

/// 把失败输出归类为错误
fn classify_failure(cmd: &str, output: &CommandOutput) -> GlusterError {
    let text = output.combined_output();
    if text.contains("command not found")
        || text.contains("Connection failed")
        || text.contains("glusterd")
    {
        return GlusterError::GlusterNotRunning(text);
    }
    GlusterError::CommandError(format!("{} 失败: {}", cmd, text))
}

#[async_trait]
impl VolumeDriver for GlusterClient {
    async fn ping(&self, peer: &str) -> Result<bool> {
        let output = self
            .runner
            .run(&format!("ping -c 1 -W 2 {}", quote(peer)))
            .await?;
        Ok(output.is_success())
    }

    async fn probe_peer(&self, peer: &str) -> Result<bool> {
        let output = self
            .runner
            .run(&format!("gluster peer probe {}", quote(peer)))
            .await?;

        if output.is_success() {
            info!("peer probe {}: {}", peer, output.stdout);
            Ok(true)
        } else {
            debug!("peer probe {} 未成功: {}", peer, output.combined_output());
            Ok(false)
        }
    }

    async fn peer_status(&self) -> Result<Vec<PeerInfo>> {
        let output = self.runner.run("gluster peer status").await?;

        if !output.is_success() {
            return Err(classify_failure("gluster peer status", &output));
        }

        Ok(parse_peer_status(&output.stdout))
    }

    async fn volume_info(&self, name: &str) -> Result<Option<GlusterVolume>> {
        let cmd = format!("gluster volume info {}", quote(name));
        let output = self.runner.run(&cmd).await?;

        if !output.is_success() {
            if output.combined_output().contains("does not exist") {
                return Ok(None);
            }
            return Err(classify_failure(&cmd, &output));
        }

        Ok(Some(parse_volume_info(&output.stdout, name)))
    }

    async fn create_volume(
        &self,
        request: &VolumeCreateRequest,
        force: bool,
    ) -> Result<CreateOutcome> {
        let cmd = request.to_command(force);
        info!("创建卷: {}", cmd);

        let output = self.runner.run(&cmd).await?;
        if output.is_success() {
            return Ok(CreateOutcome::Created);
        }

        let text = output.combined_output();
        if !force && text.contains("force") {
            return Ok(CreateOutcome::NeedsForce(text));
        }

        Err(GlusterError::CommandError(format!(
            "创建卷 {} 失败: {}",
            request.name, text
        )))
    }

    async fn start_volume(&self, name: &str) -> Result<()> {
        let output = self
            .runner
            .run(&format!("gluster volume start {}", quote(name)))
            .await?;

        if output.is_success() || output.combined_output().contains("already started") {
            info!("卷 {} 已启动", name);
            return Ok(());
        }

        Err(GlusterError::CommandError(format!(
            "启动卷 {} 失败: {}",
            name,
            output.combined_output()
        )))
    }

    async fn set_option(&self, name: &str, key: &str, value: &str) -> Result<()> {
        let cmd = format!(
            "gluster volume set {} {} {}",
            quote(name),
            quote(key),
            quote(value)
        );
        self.runner.run_checked(&cmd).await?;
        info!("卷 {} 设置 {}={}", name, key, value);
        Ok(())
    }

    async fn add_bricks(
        &self,
        name: &str,
        type_args: &[String],
        bricks: &[GlusterBrick],
    ) -> Result<()> {
        let mut parts = vec![
            "gluster".to_string(),
            "volume".to_string(),
            "add-brick".to_string(),
            quote(name),
        ];
        parts.extend(type_args.iter().cloned());
        parts.extend(bricks.iter().map(|b| b.full_path()));
        let cmd = parts.join(" ");

        info!("扩容卷: {}", cmd);
        let output = self.runner.run(&cmd).await?;
        if !output.is_success() {
            return Err(GlusterError::CommandError(format!(
                "add-brick 失败: {}",
                output.combined_output()
            )));
        }
        Ok(())
    }

    async fn heal_info_succeeds(&self, name: &str) -> Result<bool> {
        let output = self
            .runner
            .run(&format!("gluster volume heal {} info", quote(name)))
            .await?;
        Ok(output.is_success())
    }

    async fn trigger_heal(&self, name: &str) -> Result<()> {
        let output = self
            .runner
            .run(&format!("gluster volume heal {}", quote(name)))
            .await?;

        if !output.is_success() {
            return Err(GlusterError::CommandError(format!(
                "触发修复失败: {}",
                output.combined_output()
            )));
        }

        info!("卷 {} 修复已触发", name);
        Ok(())
    }

    async fn heal_summary(&self, name: &str) -> Result<HealSummary> {
        let name = quote(name);
        Ok(HealSummary {
            pending: self
                .count_entries(&format!("gluster volume heal {} info", name))
                .await,
            heal_failed: self
                .count_entries(&format!("gluster volume heal {} info heal-failed", name))
                .await,
            split_brain: self
                .count_entries(&format!("gluster volume heal {} info split-brain", name))
                .await,
        })
    }
}
