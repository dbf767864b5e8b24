//! 本地存储构建流程
//!
//! 发现 → 分区 → 阵列计划 → 构建 → 格式化 → 解析 UUID。
//! 扩容计划（[`ArrayPlan::Grow`]）需要文件系统已挂载，由调用方在挂载后执行
//! [`StorageBuilder::grow`]。

use std::sync::Arc;

use rfs_common::{BootstrapConfig, FilesystemType, RetryPolicy};
use rfs_executor::CommandRunner;
use tracing::{info, warn};

use crate::discovery::{DiskInventory, DiskManager};
use crate::error::{DiskError, Result};
use crate::filesystem::FilesystemManager;
use crate::raid::{plan_array, raid_driver, validate_level, ArrayPlan, RaidDriver};

/// 已准备好的本地存储
#[derive(Debug, Clone)]
pub struct PreparedStorage {
    /// 格式化与挂载的目标设备
    pub target: String,
    /// 目标文件系统 UUID
    pub uuid: String,
    /// 分区清单
    pub inventory: DiskInventory,
    /// 阵列处理计划
    pub plan: ArrayPlan,
    /// 本次是否执行了格式化
    pub formatted: bool,
}

impl PreparedStorage {
    /// 是否还有待加入的新成员
    pub fn needs_grow(&self) -> bool {
        matches!(self.plan, ArrayPlan::Grow { .. })
    }
}

/// 本地存储构建器
pub struct StorageBuilder {
    runner: Arc<dyn CommandRunner>,
    disks: Vec<String>,
    excluded_mounts: Vec<String>,
    filesystem: FilesystemType,
    raid_level: i32,
    rebalance: bool,
    device_policy: RetryPolicy,
    reshape_policy: RetryPolicy,
}

impl StorageBuilder {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &BootstrapConfig) -> Self {
        Self {
            runner,
            disks: config.disks.clone(),
            excluded_mounts: config.excluded_mounts.clone(),
            filesystem: config.filesystem,
            raid_level: config.raid_level,
            rebalance: config.rebalance,
            device_policy: config.timeouts.device_policy(),
            reshape_policy: config.timeouts.reshape_policy(),
        }
    }

    fn driver(&self) -> Result<Box<dyn RaidDriver>> {
        raid_driver(
            self.runner.clone(),
            self.filesystem,
            self.raid_level,
            self.rebalance,
            self.reshape_policy,
        )
    }

    fn uses_array(&self, inventory: &DiskInventory) -> bool {
        self.raid_level >= 0 && inventory.partitions.len() > 1
    }

    /// 发现并分区
    pub async fn inventory(&self) -> Result<DiskInventory> {
        let manager = DiskManager::new(self.runner.clone(), self.device_policy);
        let disks = manager.discover(&self.disks, &self.excluded_mounts).await?;
        let inventory = manager.partition_all(&disks).await?;
        validate_level(self.raid_level, inventory.disks.len())?;
        Ok(inventory)
    }

    /// 计算阵列目标与处理计划
    async fn plan(&self, inventory: &DiskInventory) -> Result<(String, ArrayPlan)> {
        if !self.uses_array(inventory) {
            let target = inventory
                .partitions
                .first()
                .cloned()
                .ok_or(DiskError::NoDisks)?;
            return Ok((target, ArrayPlan::Noop));
        }

        let driver = self.driver()?;

        let mut members = Vec::new();
        for partition in &inventory.partitions {
            if driver.is_member(partition).await? {
                members.push(partition.clone());
            }
        }
        let target = driver.target(&inventory.partitions, &members).await?;
        let array_devices = driver.array_devices(&target).await?;

        let plan = plan_array(&inventory.partitions, &members, array_devices);
        info!(
            "{} 阵列 {}: 成员 {}/{}, 计划 {:?}",
            driver.name(),
            target,
            members.len(),
            inventory.partitions.len(),
            plan
        );

        if plan == ArrayPlan::Build {
            // 非成员分区上已有文件系统：不能覆盖
            let fs = FilesystemManager::new(self.runner.clone());
            for partition in &inventory.partitions {
                if fs.uuid(partition).await?.is_some() {
                    return Err(DiskError::Ambiguous(format!(
                        "分区 {} 已有文件系统但不属于阵列",
                        partition
                    )));
                }
            }
        }

        Ok((target, plan))
    }

    /// 准备本地存储：构建阵列、按需格式化并解析 UUID
    pub async fn prepare(&self) -> Result<PreparedStorage> {
        let inventory = self.inventory().await?;

        let fs = FilesystemManager::new(self.runner.clone());

        if let (true, Some(partition)) = (
            inventory.is_single_prepartitioned(),
            inventory.partitions.first().cloned(),
        ) {
            if let Some(uuid) = fs.uuid(&partition).await? {
                info!("单块已格式化磁盘，直接复用 {} (UUID={})", partition, uuid);
                return Ok(PreparedStorage {
                    target: partition,
                    uuid,
                    plan: ArrayPlan::Noop,
                    inventory,
                    formatted: false,
                });
            }
        }

        let (target, plan) = self.plan(&inventory).await?;

        match &plan {
            ArrayPlan::Build => {
                self.driver()?.build(&target, &inventory.partitions).await?;
            }
            ArrayPlan::Noop => {}
            ArrayPlan::Grow { new_members } => {
                warn!("阵列需要扩容，新成员: {:?}", new_members);
            }
            ArrayPlan::Ambiguous(reason) => {
                return Err(DiskError::Ambiguous(reason.clone()));
            }
        }

        let formatted = fs.format_if_needed(&target, self.filesystem).await?;
        let uuid = fs
            .uuid(&target)
            .await?
            .ok_or_else(|| DiskError::MissingUuid(target.clone()))?;

        info!("本地存储就绪: {} (UUID={})", target, uuid);

        Ok(PreparedStorage {
            target,
            uuid,
            inventory,
            plan,
            formatted,
        })
    }

    /// 将新成员加入已挂载的阵列
    ///
    /// # Returns
    /// 是否执行了扩容
    pub async fn grow(&self, prepared: &PreparedStorage, mountpoint: &str) -> Result<bool> {
        let ArrayPlan::Grow { new_members } = &prepared.plan else {
            info!("没有需要加入的新磁盘");
            return Ok(false);
        };

        if self.raid_level != 0 {
            return Err(DiskError::Unsupported(format!(
                "RAID 级别 {} 不支持扩容",
                self.raid_level
            )));
        }

        let driver = self.driver()?;
        driver
            .grow(
                &prepared.target,
                mountpoint,
                new_members,
                prepared.inventory.partitions.len(),
            )
            .await?;
        info!("{} 阵列扩容完成", driver.name());
        Ok(true)
    }
}
