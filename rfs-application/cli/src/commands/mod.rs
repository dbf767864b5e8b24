//! 命令处理模块

pub mod bootstrap; // 节点引导
pub mod common; // 公共工具函数
pub mod resize; // 磁盘与集群扩容
pub mod stat; // 只读诊断
