//! RAID 阵列构建
//!
//! 两种后端：
//! - btrfs 原生多设备池（`mkfs.btrfs -d raid0 -m raid0`），池本身即文件系统
//! - mdadm 软 RAID（定位已有阵列，否则使用规范设备 /dev/md0）
//!
//! 多盘只允许 RAID 0。成员关系通过 `blkid` 的 TYPE 判定。

use std::sync::Arc;

use async_trait::async_trait;
use rfs_common::{wait_for, FilesystemType, Probe, RetryPolicy};
use rfs_executor::{quote, CommandRunner};
use tracing::{debug, info, warn};

use crate::error::{DiskError, Result};
use crate::parser::{mdstat_busy, parse_btrfs_total_devices, parse_mdadm_raid_devices, parse_mdadm_scan};

/// mdadm 规范目标设备
pub const MDADM_TARGET: &str = "/dev/md0";

/// 阵列处理计划
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayPlan {
    /// 所有分区都已是成员
    Noop,
    /// 没有任何成员，完整构建
    Build,
    /// 部分成员且其余全部空闲：扩容，交给扩容协调器
    Grow { new_members: Vec<String> },
    /// 无法判断来源的状态
    Ambiguous(String),
}

/// 根据成员关系决定如何处理阵列
///
/// # Arguments
/// * `partitions` - 目标分区全集
/// * `members` - 其中已经是阵列/池成员的分区
/// * `array_devices` - 已有阵列记录的成员数（没有阵列时为 None）
pub fn plan_array(partitions: &[String], members: &[String], array_devices: Option<usize>) -> ArrayPlan {
    let total = partitions.len();
    let member_count = members.len();

    if member_count == 0 {
        return match array_devices {
            Some(n) if n > 0 => ArrayPlan::Ambiguous(format!(
                "已存在 {} 个成员的阵列，但本机数据盘均不是成员",
                n
            )),
            _ => ArrayPlan::Build,
        };
    }

    if let Some(n) = array_devices {
        if n != member_count {
            return ArrayPlan::Ambiguous(format!(
                "阵列记录 {} 个成员，实际识别到 {} 个成员分区",
                n, member_count
            ));
        }
    }

    if member_count == total {
        return ArrayPlan::Noop;
    }

    if member_count > total {
        return ArrayPlan::Ambiguous(format!(
            "成员分区 {} 个多于目标分区 {} 个",
            member_count, total
        ));
    }

    let new_members: Vec<String> = partitions
        .iter()
        .filter(|p| !members.contains(p))
        .cloned()
        .collect();

    if new_members.len() + member_count != total {
        return ArrayPlan::Ambiguous("成员分区不在目标分区内".to_string());
    }

    ArrayPlan::Grow { new_members }
}

/// 校验 RAID 级别：多盘只允许 0
pub fn validate_level(level: i32, disk_count: usize) -> Result<()> {
    match level {
        0 => Ok(()),
        -1 if disk_count <= 1 => Ok(()),
        -1 => Err(DiskError::Unsupported(format!(
            "RAID 已禁用但有 {} 块磁盘",
            disk_count
        ))),
        other => Err(DiskError::Unsupported(format!("RAID 级别 {} 不受支持", other))),
    }
}

/// RAID 驱动
#[async_trait]
pub trait RaidDriver: Send + Sync {
    /// 后端名称
    fn name(&self) -> &'static str;

    /// 阵列目标设备（挂载与格式化对象）
    ///
    /// `members` 为已识别的成员分区，扩容时目标必须取自其中
    async fn target(&self, partitions: &[String], members: &[String]) -> Result<String>;

    /// 分区是否已是成员
    async fn is_member(&self, partition: &str) -> Result<bool>;

    /// 已有阵列记录的成员数，不存在时为 None
    async fn array_devices(&self, target: &str) -> Result<Option<usize>>;

    /// 在分区上构建阵列
    async fn build(&self, target: &str, partitions: &[String]) -> Result<()>;

    /// 向已挂载的阵列添加新分区并扩展文件系统
    async fn grow(&self, target: &str, mountpoint: &str, new_members: &[String], total: usize) -> Result<()>;
}

/// 按文件系统选择驱动；多盘只允许 RAID 0
pub fn raid_driver(
    runner: Arc<dyn CommandRunner>,
    filesystem: FilesystemType,
    level: i32,
    rebalance: bool,
    reshape_policy: RetryPolicy,
) -> Result<Box<dyn RaidDriver>> {
    if level != 0 {
        return Err(DiskError::Unsupported(format!(
            "RAID 级别 {} 不受支持（文件系统 {}）",
            level, filesystem
        )));
    }

    if filesystem.is_btrfs() {
        Ok(Box::new(BtrfsDriver::new(runner, level, rebalance)))
    } else {
        Ok(Box::new(MdadmDriver::new(runner, level, filesystem, reshape_policy)))
    }
}

async fn blkid_type(runner: &dyn CommandRunner, device: &str) -> Result<Option<String>> {
    let output = runner
        .run(&format!("blkid -s TYPE -o value {}", quote(device)))
        .await?;
    let value = output.stdout.trim();
    if output.is_success() && !value.is_empty() {
        Ok(Some(value.to_string()))
    } else {
        Ok(None)
    }
}

/// btrfs 原生多设备池
pub struct BtrfsDriver {
    runner: Arc<dyn CommandRunner>,
    level: i32,
    rebalance: bool,
}

impl BtrfsDriver {
    pub fn new(runner: Arc<dyn CommandRunner>, level: i32, rebalance: bool) -> Self {
        Self {
            runner,
            level,
            rebalance,
        }
    }

    fn profile(&self) -> String {
        format!("raid{}", self.level)
    }
}

#[async_trait]
impl RaidDriver for BtrfsDriver {
    fn name(&self) -> &'static str {
        "btrfs"
    }

    async fn target(&self, partitions: &[String], members: &[String]) -> Result<String> {
        // 新盘可能排在已有成员之前，不能用它作为池设备
        members
            .first()
            .or_else(|| partitions.first())
            .cloned()
            .ok_or(DiskError::NoDisks)
    }

    async fn is_member(&self, partition: &str) -> Result<bool> {
        Ok(blkid_type(self.runner.as_ref(), partition).await?.as_deref() == Some("btrfs"))
    }

    async fn array_devices(&self, target: &str) -> Result<Option<usize>> {
        let output = self
            .runner
            .run(&format!("btrfs filesystem show {}", quote(target)))
            .await?;
        if !output.is_success() {
            return Ok(None);
        }
        Ok(parse_btrfs_total_devices(&output.stdout))
    }

    async fn build(&self, _target: &str, partitions: &[String]) -> Result<()> {
        let profile = self.profile();
        let devices: Vec<String> = partitions.iter().map(|p| quote(p)).collect();
        let cmd = format!(
            "mkfs.btrfs -d {} -m {} {}",
            profile,
            profile,
            devices.join(" ")
        );
        info!("创建 btrfs 池 ({} 个设备): {}", partitions.len(), cmd);
        self.runner.run_checked(&cmd).await?;
        Ok(())
    }

    async fn grow(&self, _target: &str, mountpoint: &str, new_members: &[String], total: usize) -> Result<()> {
        let devices: Vec<String> = new_members.iter().map(|p| quote(p)).collect();
        info!(
            "btrfs 池扩容: 新增 {} 个设备, 扩容后共 {} 个",
            new_members.len(),
            total
        );

        self.runner
            .run_checked(&format!("btrfs device add {} {}", devices.join(" "), quote(mountpoint)))
            .await?;
        self.runner
            .run_checked(&format!("btrfs filesystem resize max {}", quote(mountpoint)))
            .await?;

        if self.rebalance {
            // 均衡会阻塞并发写入
            info!("开始 btrfs 全量均衡: {}", mountpoint);
            self.runner
                .run_checked(&format!("btrfs filesystem balance {}", quote(mountpoint)))
                .await?;
        } else {
            debug!("未请求均衡，跳过");
        }

        Ok(())
    }
}

/// mdadm 软 RAID
pub struct MdadmDriver {
    runner: Arc<dyn CommandRunner>,
    level: i32,
    filesystem: FilesystemType,
    reshape_policy: RetryPolicy,
}

impl MdadmDriver {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        level: i32,
        filesystem: FilesystemType,
        reshape_policy: RetryPolicy,
    ) -> Self {
        Self {
            runner,
            level,
            filesystem,
            reshape_policy,
        }
    }

    async fn wait_reshape(&self, target: &str) -> Result<()> {
        let runner = &self.runner;
        let operation = format!("等待 {} 重塑完成", target);

        wait_for(&operation, &self.reshape_policy, || async move {
            let output = runner.run_checked("cat /proc/mdstat").await?;
            Ok::<_, DiskError>(if mdstat_busy(&output.stdout) {
                Probe::NotReady("阵列仍在重塑".to_string())
            } else {
                Probe::Ready(())
            })
        })
        .await
        .into_result(|_| DiskError::timeout(operation.clone(), self.reshape_policy.ceiling))
    }
}

#[async_trait]
impl RaidDriver for MdadmDriver {
    fn name(&self) -> &'static str {
        "mdadm"
    }

    async fn target(&self, _partitions: &[String], _members: &[String]) -> Result<String> {
        let output = self.runner.run("mdadm --detail --scan").await?;
        let arrays = parse_mdadm_scan(&output.stdout);

        match arrays.as_slice() {
            [] => Ok(MDADM_TARGET.to_string()),
            [single] => {
                info!("找到已有阵列: {}", single);
                Ok(single.clone())
            }
            many => Err(DiskError::Ambiguous(format!(
                "存在多个阵列: {}",
                many.join(", ")
            ))),
        }
    }

    async fn is_member(&self, partition: &str) -> Result<bool> {
        Ok(blkid_type(self.runner.as_ref(), partition).await?.as_deref() == Some("linux_raid_member"))
    }

    async fn array_devices(&self, target: &str) -> Result<Option<usize>> {
        let output = self
            .runner
            .run(&format!("mdadm --detail {}", quote(target)))
            .await?;
        if !output.is_success() {
            return Ok(None);
        }
        Ok(parse_mdadm_raid_devices(&output.stdout))
    }

    async fn build(&self, target: &str, partitions: &[String]) -> Result<()> {
        let devices: Vec<String> = partitions.iter().map(|p| quote(p)).collect();
        let cmd = format!(
            "mdadm --create --verbose --run {} --level={} --raid-devices={} {}",
            quote(target),
            self.level,
            partitions.len(),
            devices.join(" ")
        );
        info!("创建 mdadm 阵列: {}", cmd);
        self.runner.run_checked(&cmd).await?;
        Ok(())
    }

    async fn grow(&self, target: &str, _mountpoint: &str, new_members: &[String], total: usize) -> Result<()> {
        let devices: Vec<String> = new_members.iter().map(|p| quote(p)).collect();
        info!(
            "mdadm 阵列 {} 扩容: 新增 {} 个设备, 扩容后共 {} 个",
            target,
            new_members.len(),
            total
        );

        self.runner
            .run_checked(&format!("mdadm --add {} {}", quote(target), devices.join(" ")))
            .await?;
        self.runner
            .run_checked(&format!(
                "mdadm --grow {} --raid-devices={}",
                quote(target),
                total
            ))
            .await?;

        self.wait_reshape(target).await?;

        match self.filesystem {
            FilesystemType::Btrfs => {
                warn!("mdadm 上的 btrfs 由自身管理容量，跳过 resize2fs");
            }
            _ => {
                self.runner
                    .run_checked(&format!("resize2fs {}", quote(target)))
                    .await?;
            }
        }

        Ok(())
    }
}
