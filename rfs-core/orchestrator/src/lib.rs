//! RFS 编排
//!
//! 每个节点独立运行同一个引导流程，节点之间不直接通信，
//! 所有协调都通过轮询 Gluster 控制面完成：
//! - 持久化状态机与阶段标记（[`state`]）
//! - 协调者的对等探测与仲裁等待（[`peering`]）
//! - 卷创建、启动、修复检查与集群挂载（[`volume`]）
//! - 磁盘扩容与集群扩容（[`resize`]）
//! - 只读诊断（[`stat`]）

pub mod bootstrap;
pub mod context;
pub mod error;
pub mod peering;
pub mod resize;
pub mod stat;
pub mod state;
pub mod volume;

pub use bootstrap::{BootstrapOutcome, Bootstrapper};
pub use context::NodeContext;
pub use error::{BootstrapError, Result};
pub use peering::PeeringCoordinator;
pub use resize::{ClusterResize, ResizeCoordinator};
pub use stat::{collect as collect_stat, StatReport, StatSection};
pub use state::{BootstrapState, StateRecord, StateStore};
pub use volume::{brick_list, volume_type_args, VolumeAction, VolumeManager};
