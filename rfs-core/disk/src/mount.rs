//! 挂载管理
//!
//! 解析 UUID → 写入 fstab（仅一次）→ 带重试挂载 → 设置共享目录权限。
//! 已挂载的路径直接跳过。

use std::path::PathBuf;
use std::sync::Arc;

use rfs_common::{wait_for, FilesystemType, Probe, RetryPolicy, StorageTier};
use rfs_executor::{quote, CommandRunner};
use tracing::{debug, info};

use crate::error::{DiskError, Result};
use crate::fstab::{ensure_entry, FstabEntry};

/// 组合挂载选项：`defaults` + 调用方选项 + 存储层级提示
pub fn compose_mount_options(filesystem: FilesystemType, tier: StorageTier, extra: &str) -> String {
    let tier_hint = match (tier, filesystem) {
        (StorageTier::Premium, FilesystemType::Btrfs) => "nobarrier,ssd",
        (StorageTier::Premium, _) => "barrier=0",
        (StorageTier::Standard, _) => "discard",
    };

    let mut options: Vec<&str> = vec!["defaults"];
    for option in extra.split(',').chain(tier_hint.split(',')) {
        let option = option.trim();
        if !option.is_empty() && !options.contains(&option) {
            options.push(option);
        }
    }
    options.join(",")
}

/// 挂载管理器
pub struct MountManager {
    runner: Arc<dyn CommandRunner>,
    fstab: PathBuf,
    policy: RetryPolicy,
}

impl MountManager {
    /// # Arguments
    /// * `runner` - 命令执行器
    /// * `fstab` - fstab 文件路径
    /// * `policy` - 挂载重试策略（默认 1s / 5min）
    pub fn new(runner: Arc<dyn CommandRunner>, fstab: impl Into<PathBuf>, policy: RetryPolicy) -> Self {
        Self {
            runner,
            fstab: fstab.into(),
            policy,
        }
    }

    /// 路径是否已经是挂载点
    pub async fn is_mounted(&self, mountpoint: &str) -> Result<bool> {
        let output = self
            .runner
            .run(&format!("mountpoint -q {}", quote(mountpoint)))
            .await?;
        Ok(output.is_success())
    }

    /// 写入 fstab 条目（幂等）
    pub fn ensure_fstab(&self, entry: &FstabEntry) -> Result<bool> {
        ensure_entry(&self.fstab, entry)
    }

    /// 按 fstab 挂载，带重试
    pub async fn mount(&self, mountpoint: &str) -> Result<()> {
        if self.is_mounted(mountpoint).await? {
            info!("{} 已挂载，跳过", mountpoint);
            return Ok(());
        }

        self.runner
            .run_checked(&format!("mkdir -p {}", quote(mountpoint)))
            .await?;

        let operation = format!("挂载 {}", mountpoint);
        let mount_cmd = format!("mount {}", quote(mountpoint));
        let mount_cmd = mount_cmd.as_str();

        wait_for(&operation, &self.policy, || async move {
            if self.is_mounted(mountpoint).await? {
                return Ok(Probe::Ready(()));
            }
            let output = self.runner.run(mount_cmd).await?;
            Ok::<_, DiskError>(if output.is_success() {
                Probe::Ready(())
            } else {
                Probe::NotReady(output.combined_output())
            })
        })
        .await
        .into_result(|_| DiskError::timeout(operation.clone(), self.policy.ceiling))?;

        info!("{} 挂载成功", mountpoint);
        Ok(())
    }

    /// 挂载本地文件系统（按 UUID 写 fstab）
    pub async fn mount_local(
        &self,
        uuid: &str,
        mountpoint: &str,
        filesystem: FilesystemType,
        options: &str,
    ) -> Result<()> {
        let entry = FstabEntry::local(uuid, mountpoint, filesystem.as_str(), options);
        debug!("本地挂载条目: {}", entry);
        self.ensure_fstab(&entry)?;
        self.mount(mountpoint).await
    }

    /// 挂载集群卷（按 host:/volume 写 fstab）
    pub async fn mount_glusterfs(&self, host: &str, volume: &str, mountpoint: &str) -> Result<()> {
        let entry = FstabEntry::glusterfs(host, volume, mountpoint);
        self.ensure_fstab(&entry)?;
        self.mount(mountpoint).await
    }

    /// 创建共享目录并设置 1777 权限
    pub async fn ensure_shared_dir(&self, path: &str) -> Result<()> {
        let path = quote(path);
        self.runner
            .run_checked(&format!("mkdir -p {}", path))
            .await?;
        self.runner
            .run_checked(&format!("chmod 1777 {}", path))
            .await?;
        Ok(())
    }
}
