//! 文件系统格式化
//!
//! 只有目标设备没有文件系统 UUID 时才格式化，重复执行不会破坏已有数据。

use std::sync::Arc;

use rfs_common::FilesystemType;
use rfs_executor::{quote, CommandRunner};
use tracing::info;

use crate::error::Result;

/// 文件系统管理器
pub struct FilesystemManager {
    runner: Arc<dyn CommandRunner>,
}

impl FilesystemManager {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// 设备上的文件系统 UUID
    pub async fn uuid(&self, device: &str) -> Result<Option<String>> {
        let output = self
            .runner
            .run(&format!("blkid -s UUID -o value {}", quote(device)))
            .await?;
        let uuid = output.stdout.trim();
        if output.is_success() && !uuid.is_empty() {
            Ok(Some(uuid.to_string()))
        } else {
            Ok(None)
        }
    }

    /// 格式化命令
    pub fn mkfs_command(filesystem: FilesystemType, device: &str) -> String {
        match filesystem {
            FilesystemType::Btrfs => format!("mkfs.btrfs {}", quote(device)),
            ext => format!("mkfs.{} -F -m 0 {}", ext.as_str(), quote(device)),
        }
    }

    /// 按需格式化
    ///
    /// # Returns
    /// 本次是否执行了格式化
    pub async fn format_if_needed(&self, device: &str, filesystem: FilesystemType) -> Result<bool> {
        if let Some(uuid) = self.uuid(device).await? {
            info!("{} 已有文件系统 (UUID={})，跳过格式化", device, uuid);
            return Ok(false);
        }

        let cmd = Self::mkfs_command(filesystem, device);
        info!("格式化 {} 为 {}: {}", device, filesystem, cmd);
        self.runner.run_checked(&cmd).await?;
        Ok(true)
    }
}
