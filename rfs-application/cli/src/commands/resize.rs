use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use rfs_orchestrator::ResizeCoordinator;

use super::common::{load_config, local_context};

pub async fn handle_disks(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let mountpoint = config.mountpoint.clone();
    let coordinator = ResizeCoordinator::new(local_context(config));

    let grown = coordinator.resize_disks().await.context("磁盘扩容失败")?;

    if grown {
        println!("{} 本地存储已扩容: {}", "✓".green().bold(), mountpoint.yellow());
    } else {
        println!("{} 没有可并入的新磁盘", "✓".green().bold());
    }
    Ok(())
}

pub async fn handle_cluster(config_path: &Path, old_count: usize) -> Result<()> {
    let config = load_config(config_path)?;
    if old_count == 0 {
        bail!("--old-count 必须大于 0");
    }
    let coordinator = ResizeCoordinator::new(local_context(config));

    let resize = coordinator
        .resize_cluster(old_count)
        .await
        .with_context(|| format!("集群扩容失败: {} 节点起", old_count))?;

    println!(
        "{} 集群已扩容: {} -> {} 节点",
        "✓".green().bold(),
        old_count,
        resize.node_count.to_string().cyan().bold()
    );
    if resize.is_new_node {
        println!("  本节点: {}", "新加入".yellow());
    }
    if resize.added_bricks {
        println!("  brick:  {}", "已追加".green());
    }
    Ok(())
}
