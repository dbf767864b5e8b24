//! RFS 本地存储
//!
//! 每个节点独立执行、可重复执行的本地存储准备：
//! - 磁盘发现与 GPT 分区（[`discovery`]）
//! - RAID 阵列 / btrfs 多设备池构建与扩容（[`raid`]）
//! - 文件系统格式化（[`filesystem`]）
//! - fstab 持久化与带重试的挂载（[`fstab`], [`mount`]）
//! - NFS 导出与 Samba 基础共享（[`export`]）
//! - TCP 调优（[`tuning`]）
//!
//! 每一步在修改系统前都会重新探测实际状态，已完成的步骤直接跳过。

pub mod builder;
pub mod discovery;
pub mod error;
pub mod export;
pub mod filesystem;
pub mod fstab;
pub mod mount;
pub mod parser;
pub mod raid;
pub mod tuning;

pub use builder::{PreparedStorage, StorageBuilder};
pub use discovery::{partition_path, DiskInventory, DiskManager};
pub use error::{DiskError, Result};
pub use export::{NfsExporter, SambaExporter};
pub use filesystem::FilesystemManager;
pub use fstab::FstabEntry;
pub use mount::{compose_mount_options, MountManager};
pub use raid::{plan_array, raid_driver, ArrayPlan, BtrfsDriver, MdadmDriver, RaidDriver};
pub use tuning::apply_tcp_tuning;
