//! 磁盘发现与分区
//!
//! 枚举除系统盘 / 临时盘以外的整盘设备，对缺少主分区的磁盘创建一个占满全盘的
//! GPT 主分区，并等待分区设备节点出现。已有分区的磁盘跳过并单独记录。

use std::collections::HashSet;
use std::sync::Arc;

use rfs_common::{wait_for, Probe, RetryPolicy};
use rfs_executor::{quote, CommandRunner};
use tracing::{debug, info, warn};

use crate::error::{DiskError, Result};
use crate::parser::{parse_lsblk_pairs, BlockDevice};

/// 分区后的磁盘清单
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskInventory {
    /// 参与构建的整盘（有序）
    pub disks: Vec<String>,
    /// 与 disks 一一对应的主分区
    pub partitions: Vec<String>,
    /// 本次新建分区的磁盘
    pub newly_partitioned: Vec<String>,
    /// 本次运行前已有分区的磁盘
    pub prepartitioned: Vec<String>,
}

impl DiskInventory {
    /// 仅一块磁盘且已有分区；分区上已有文件系统时 `prepare` 直接复用它
    pub fn is_single_prepartitioned(&self) -> bool {
        self.disks.len() == 1 && self.prepartitioned.len() == 1
    }
}

/// 磁盘主分区路径：`/dev/sdc` → `/dev/sdc1`，`/dev/nvme0n1` → `/dev/nvme0n1p1`
pub fn partition_path(disk: &str) -> String {
    if disk.chars().last().map_or(false, |c| c.is_ascii_digit()) {
        format!("{}p1", disk)
    } else {
        format!("{}1", disk)
    }
}

/// 磁盘管理器
pub struct DiskManager {
    runner: Arc<dyn CommandRunner>,
    policy: RetryPolicy,
}

impl DiskManager {
    /// # Arguments
    /// * `runner` - 命令执行器
    /// * `policy` - 等待分区设备出现的策略（默认 1s / 5min）
    pub fn new(runner: Arc<dyn CommandRunner>, policy: RetryPolicy) -> Self {
        Self { runner, policy }
    }

    /// 列出所有块设备
    pub async fn list_block_devices(&self) -> Result<Vec<BlockDevice>> {
        let output = self
            .runner
            .run_checked("lsblk -P -p -o NAME,TYPE,PKNAME,MOUNTPOINT")
            .await?;
        Ok(parse_lsblk_pairs(&output.stdout))
    }

    /// 发现数据盘
    ///
    /// # Arguments
    /// * `explicit` - 外部提供的磁盘列表，为空时枚举所有整盘
    /// * `excluded_mounts` - 系统盘 / 临时盘挂载点
    pub async fn discover(&self, explicit: &[String], excluded_mounts: &[String]) -> Result<Vec<String>> {
        let devices = self.list_block_devices().await?;
        let excluded = excluded_disks(&devices, excluded_mounts);
        debug!("系统/临时盘: {:?}", excluded);

        let candidates: Vec<String> = if explicit.is_empty() {
            devices
                .iter()
                .filter(|d| d.kind == "disk")
                .map(|d| d.path.clone())
                .collect()
        } else {
            explicit.to_vec()
        };

        let mut disks = Vec::new();
        for disk in candidates {
            if excluded.contains(&disk) {
                warn!("跳过系统/临时盘: {}", disk);
                continue;
            }
            disks.push(disk);
        }
        disks.sort();
        disks.dedup();

        info!("发现 {} 块数据盘: {:?}", disks.len(), disks);
        Ok(disks)
    }

    /// 磁盘是否已有主分区
    pub async fn has_partition(&self, disk: &str) -> Result<bool> {
        let output = self
            .runner
            .run(&format!("test -b {}", quote(&partition_path(disk))))
            .await?;
        Ok(output.is_success())
    }

    /// 创建占满全盘的 GPT 主分区并等待设备出现
    pub async fn create_partition(&self, disk: &str) -> Result<String> {
        let partition = partition_path(disk);
        info!("为 {} 创建 GPT 主分区 {}", disk, partition);

        self.runner
            .run_checked(&format!(
                "parted --script --align optimal {} mklabel gpt mkpart primary 0% 100%",
                quote(disk)
            ))
            .await?;

        let runner = &self.runner;
        let check_cmd = format!("test -b {}", quote(&partition));
        let check_cmd = check_cmd.as_str();
        let operation = format!("等待分区 {}", partition);

        wait_for(&operation, &self.policy, || async move {
            let output = runner.run(check_cmd).await?;
            Ok::<_, DiskError>(if output.is_success() {
                Probe::Ready(())
            } else {
                Probe::NotReady("设备节点尚未出现".to_string())
            })
        })
        .await
        .into_result(|_| DiskError::timeout(operation.clone(), self.policy.ceiling))?;

        Ok(partition)
    }

    /// 对磁盘逐一分区（幂等）
    pub async fn partition_all(&self, disks: &[String]) -> Result<DiskInventory> {
        if disks.is_empty() {
            return Err(DiskError::NoDisks);
        }

        let mut inventory = DiskInventory::default();

        for disk in disks {
            let partition = if self.has_partition(disk).await? {
                debug!("{} 已有分区，跳过", disk);
                inventory.prepartitioned.push(disk.clone());
                partition_path(disk)
            } else {
                let partition = self.create_partition(disk).await?;
                inventory.newly_partitioned.push(disk.clone());
                partition
            };
            inventory.disks.push(disk.clone());
            inventory.partitions.push(partition);
        }

        info!(
            "分区完成: 共 {} 块, 新建 {} 块, 已存在 {} 块",
            inventory.disks.len(),
            inventory.newly_partitioned.len(),
            inventory.prepartitioned.len()
        );

        Ok(inventory)
    }
}

/// 承载被排除挂载点的整盘
fn excluded_disks(devices: &[BlockDevice], excluded_mounts: &[String]) -> HashSet<String> {
    let mut excluded = HashSet::new();

    for device in devices {
        let Some(mountpoint) = &device.mountpoint else {
            continue;
        };
        if !excluded_mounts.iter().any(|m| m == mountpoint) {
            continue;
        }
        excluded.insert(root_disk(devices, device));
    }

    excluded
}

/// 沿父设备链找到整盘
fn root_disk(devices: &[BlockDevice], device: &BlockDevice) -> String {
    let mut current = device;
    // 层级有限（part → raid/lvm → disk），防御环路
    for _ in 0..8 {
        let Some(parent) = &current.parent else {
            break;
        };
        match devices.iter().find(|d| &d.path == parent) {
            Some(next) => current = next,
            None => return parent.clone(),
        }
    }
    current.path.clone()
}
