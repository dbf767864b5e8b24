//! TCP 调优
//!
//! 写入固定的 sysctl 配置片段并立即生效。内容一致时不重写文件。

use std::fs;
use std::path::Path;

use rfs_executor::{quote, CommandRunner};
use tracing::{debug, info};

use crate::error::Result;

/// sysctl 配置片段
pub const TCP_SYSCTL: &str = "\
# managed by rfs
net.core.rmem_max = 16777216
net.core.wmem_max = 16777216
net.core.rmem_default = 262144
net.core.wmem_default = 262144
net.core.netdev_max_backlog = 30000
net.ipv4.tcp_rmem = 4096 87380 16777216
net.ipv4.tcp_wmem = 4096 65536 16777216
net.ipv4.tcp_slow_start_after_idle = 0
net.ipv4.tcp_window_scaling = 1
";

/// 写入并应用 TCP 调优
///
/// # Returns
/// 本次是否改写了配置文件
pub async fn apply_tcp_tuning(runner: &dyn CommandRunner, path: &Path) -> Result<bool> {
    let current = if path.exists() {
        Some(fs::read_to_string(path)?)
    } else {
        None
    };

    let changed = current.as_deref() != Some(TCP_SYSCTL);
    if changed {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, TCP_SYSCTL)?;
        info!("写入 TCP 调优配置: {:?}", path);
    } else {
        debug!("TCP 调优配置未变化: {:?}", path);
    }

    runner
        .run_checked(&format!("sysctl -p {}", quote(&path.to_string_lossy())))
        .await?;
    Ok(changed)
}
