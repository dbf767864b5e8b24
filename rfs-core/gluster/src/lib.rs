//! RFS Gluster 驱动库
//!
//! 提供 Gluster 控制面操作，支持：
//! - 对等节点探测与连接状态查询
//! - 卷创建、启动、调优、扩容（add-brick）
//! - 修复（heal）触发与统计
//! - `gluster` 命令输出解析
//!
//! 所有操作经由 [`VolumeDriver`] trait 暴露，[`GlusterClient`] 为基于
//! `gluster` 命令行的实现，测试中可替换为内存实现。
//!
//! # 示例
//!
//! ```ignore
//! use std::sync::Arc;
//! use rfs_executor::LocalRunner;
//! use rfs_gluster::{GlusterClient, VolumeDriver};
//!
//! let gluster = GlusterClient::new(Arc::new(LocalRunner::new()));
//! for peer in gluster.peer_status().await? {
//!     println!("{} {}", peer.hostname, peer.state);
//! }
//! ```

mod client;
mod driver;
mod error;
mod models;
mod parser;

pub use client::GlusterClient;
pub use driver::VolumeDriver;
pub use error::{GlusterError, Result};
pub use models::{
    CreateOutcome, GlusterBrick, GlusterVolume, HealSummary, PeerInfo, VolumeCreateRequest,
};
pub use parser::{parse_entry_count, parse_peer_status, parse_volume_info};
