//! RFS 命令执行器
//!
//! 引导流程中的所有系统操作（parted、mdadm、btrfs、gluster、mount 等）
//! 都通过 [`CommandRunner`] 执行，提供：
//! - 本地 shell 执行（[`LocalRunner`]）
//! - 基于 russh 的远程执行（[`SshRunner`]，用于诊断其他节点）
//! - 脚本化模拟执行（[`MockRunner`]，用于测试替身）
//!
//! # 示例
//!
//! ```ignore
//! use rfs_executor::{CommandRunner, LocalRunner};
//!
//! let runner = LocalRunner::new();
//! let output = runner.run("lsblk -dn -o NAME,TYPE").await?;
//! println!("{}", output.stdout);
//! ```

mod config;
mod error;
mod mock;
mod runner;
mod ssh;

pub use config::{AuthMethod, SshConfig};
pub use error::{ExecError, Result};
pub use mock::MockRunner;
pub use runner::{quote, CommandOutput, CommandRunner, LocalRunner};
pub use ssh::SshRunner;
