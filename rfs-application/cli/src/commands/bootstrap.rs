use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use rfs_orchestrator::{BootstrapOutcome, Bootstrapper, VolumeAction};

use super::common::{load_config, local_context};

pub async fn handle(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let bootstrapper = Bootstrapper::new(local_context(config));

    let outcome = bootstrapper.run().await.context("节点引导失败")?;

    match outcome {
        BootstrapOutcome::AlreadyDone => {
            println!("{} 节点已完成引导，无需变更", "✓".green().bold());
        }
        BootstrapOutcome::Exported => {
            println!("{} 本地存储已就绪并导出", "✓".green().bold());
            println!(
                "  挂载点: {}",
                bootstrapper.context().config.mountpoint.yellow()
            );
        }
        BootstrapOutcome::Joined { role, volume } => {
            let config = &bootstrapper.context().config;
            println!(
                "{} 已加入集群卷 {}",
                "✓".green().bold(),
                config.gluster.volume_name.cyan().bold()
            );
            println!("  角色:   {}", format!("{:?}", role).yellow());
            println!("  挂载点: {}", config.gluster.mountpoint.yellow());
            match volume {
                Some(VolumeAction::Created { forced }) => {
                    let note = if forced { "（force）" } else { "" };
                    println!("  卷:     {}{}", "已创建".green(), note.bright_black());
                }
                Some(VolumeAction::Started) => println!("  卷:     {}", "已启动".green()),
                Some(VolumeAction::Unchanged) => println!("  卷:     {}", "已存在".bright_black()),
                None => {}
            }
        }
    }

    Ok(())
}
