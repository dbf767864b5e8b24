//! 只读诊断
//!
//! 收集块设备、阵列/池、磁盘用量以及集群卷状态，不修改任何东西。

use std::fmt;
use std::sync::Arc;

use rfs_common::{BootstrapConfig, ServerType};
use rfs_executor::{quote, CommandRunner};
use rfs_gluster::GlusterClient;

/// 诊断输出的一段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatSection {
    pub command: String,
    pub output: String,
}

/// 诊断报告
#[derive(Debug, Clone, Default)]
pub struct StatReport {
    pub host: String,
    pub sections: Vec<StatSection>,
}

impl fmt::Display for StatReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            writeln!(f, "==> {} ({})", section.command, self.host)?;
            writeln!(f, "{}", section.output.trim_end())?;
            writeln!(f)?;
        }
        Ok(())
    }
}

async fn capture(runner: &dyn CommandRunner, command: &str) -> StatSection {
    let output = match runner.run(command).await {
        Ok(output) => output.combined_output(),
        Err(e) => format!("<执行失败: {}>", e),
    };
    StatSection {
        command: command.to_string(),
        output,
    }
}

/// 本地存储相关的诊断命令
pub fn storage_commands(config: &BootstrapConfig) -> Vec<String> {
    let mountpoint = quote(&config.mountpoint);
    let mut commands = vec!["lsblk".to_string()];

    if config.filesystem.is_btrfs() {
        commands.push(format!("btrfs filesystem show {}", mountpoint));
        commands.push(format!("btrfs filesystem usage {}", mountpoint));
    } else {
        commands.push("cat /proc/mdstat".to_string());
        commands.push("mdadm --detail --scan".to_string());
    }

    commands.push("df -h".to_string());
    commands
}

/// 收集诊断信息
pub async fn collect(runner: Arc<dyn CommandRunner>, config: &BootstrapConfig) -> StatReport {
    let mut report = StatReport {
        host: runner.host().to_string(),
        sections: Vec::new(),
    };

    for command in storage_commands(config) {
        report.sections.push(capture(runner.as_ref(), &command).await);
    }

    if config.server_type == ServerType::Glusterfs {
        let gluster = GlusterClient::new(runner.clone());
        for (command, output) in gluster.diagnostics(&config.gluster.volume_name).await {
            report.sections.push(StatSection { command, output });
        }
    }

    report
}
