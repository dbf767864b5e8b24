//! RFS CLI 应用

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rfs_common::DEFAULT_CONFIG_PATH;
use tracing::{info, Level};

mod commands;

#[derive(Parser)]
#[command(name = "rfs")]
#[command(about = "RFS - 节点本地存储与 Gluster/NFS 引导工具", long_about = None)]
#[command(version)]
struct Cli {
    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// 配置文件路径
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 引导本节点（本地存储、导出或集群卷）
    Bootstrap,

    /// 将新增磁盘并入本地存储
    ResizeDisks,

    /// 扩容集群，peers 列表末尾为新增节点
    ResizeCluster {
        /// 扩容前的节点数
        #[arg(long)]
        old_count: usize,
    },

    /// 只读诊断
    Stat {
        /// 远端节点地址，缺省为本机
        #[arg(long)]
        host: Option<String>,
        /// SSH 用户名
        #[arg(long, default_value = "root")]
        ssh_user: String,
        /// SSH 私钥路径
        #[arg(long)]
        ssh_key: Option<PathBuf>,
        /// SSH 密码
        #[arg(long)]
        ssh_password: Option<String>,
        /// SSH 端口
        #[arg(long, default_value = "22")]
        ssh_port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt().with_max_level(log_level).init();

    info!("RFS CLI 启动");

    // 处理命令
    match cli.command {
        Commands::Bootstrap => commands::bootstrap::handle(&cli.config).await?,
        Commands::ResizeDisks => commands::resize::handle_disks(&cli.config).await?,
        Commands::ResizeCluster { old_count } => {
            commands::resize::handle_cluster(&cli.config, old_count).await?
        }
        Commands::Stat {
            host,
            ssh_user,
            ssh_key,
            ssh_password,
            ssh_port,
        } => {
            let target = host.map(|host| commands::stat::RemoteTarget {
                host,
                user: ssh_user,
                key: ssh_key,
                password: ssh_password,
                port: ssh_port,
            });
            commands::stat::handle(&cli.config, target).await?
        }
    }

    Ok(())
}
