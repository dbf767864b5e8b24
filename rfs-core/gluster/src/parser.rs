//! Gluster 输出解析模块
//!
//! 解析 `gluster peer status`、`gluster volume info` 与 `gluster volume heal` 输出

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::models::{GlusterBrick, GlusterVolume, PeerInfo};

/// 解析 `gluster peer status` 输出
///
/// # 输出格式示例
/// ```text
/// Number of Peers: 2
///
/// Hostname: 10.0.0.5
/// Uuid: 5e2a3c8e-7d0f-4c53-8a0b-1f0e7d6c5b4a
/// State: Peer in Cluster (Connected)
///
/// Hostname: 10.0.0.6
/// Uuid: 0d7c1f2e-9a3b-4e8c-b6d5-2a1f0e9d8c7b
/// State: Peer in Cluster (Disconnected)
/// Other names:
/// node3
/// ```
pub fn parse_peer_status(output: &str) -> Vec<PeerInfo> {
    let mut peers = Vec::new();
    let mut current: Option<PeerInfo> = None;

    for line in output.lines() {
        let line = line.trim();

        if let Some(hostname) = line.strip_prefix("Hostname:") {
            if let Some(peer) = current.take() {
                peers.push(peer);
            }
            current = Some(PeerInfo {
                hostname: hostname.trim().to_string(),
                uuid: String::new(),
                state: String::new(),
            });
        } else if let Some(peer) = current.as_mut() {
            if let Some(uuid) = line.strip_prefix("Uuid:") {
                peer.uuid = uuid.trim().to_string();
            } else if let Some(state) = line.strip_prefix("State:") {
                peer.state = state.trim().to_string();
            }
        }
    }

    if let Some(peer) = current {
        peers.push(peer);
    }

    debug!("解析到 {} 个对等节点", peers.len());
    peers
}

fn brick_count_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    // "Number of Bricks: 3" 或 "Number of Bricks: 1 x 2 = 2" 或 "2 x (2 + 1) = 6"
    RE.get_or_init(|| {
        Regex::new(r"^Number of Bricks:\s*(?:(\d+)\s*x\s*(\d+|\([^)]*\))\s*=\s*)?(\d+)\s*$").ok()
    })
    .as_ref()
}

/// 解析 `gluster volume info <name>` 输出
///
/// # 输出格式示例
/// ```text
/// Volume Name: gv0
/// Type: Replicate
/// Volume ID: 12345678-1234-1234-1234-123456789012
/// Status: Started
/// Number of Bricks: 1 x 2 = 2
/// Transport-type: tcp
/// Bricks:
/// Brick1: 10.0.0.4:/data/brick0
/// Brick2: 10.0.0.5:/data/brick0
/// ```
pub fn parse_volume_info(output: &str, volume_name: &str) -> GlusterVolume {
    let mut volume = GlusterVolume::new(volume_name, "Unknown");

    for line in output.lines() {
        let line = line.trim();

        if let Some(name) = line.strip_prefix("Volume Name:") {
            volume.name = name.trim().to_string();
        } else if let Some(kind) = line.strip_prefix("Type:") {
            volume.volume_type = kind.trim().to_string();
        } else if let Some(status) = line.strip_prefix("Status:") {
            volume.status = status.trim().to_string();
        } else if let Some(transport) = line.strip_prefix("Transport-type:") {
            volume.transport = transport.trim().to_string();
        } else if let Some(caps) = brick_count_regex().and_then(|re| re.captures(line)) {
            if let Some(replica) = caps.get(2) {
                volume.replica_count = replica.as_str().parse().unwrap_or(0);
            }
            volume.brick_count = caps
                .get(3)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
        } else if line.starts_with("Brick") && !line.starts_with("Bricks:") {
            // "Brick1: 10.0.0.4:/data/brick0"
            if let Some((_, brick)) = line.split_once(':') {
                if let Some(brick) = GlusterBrick::parse(brick) {
                    volume.bricks.push(brick);
                }
            }
        }
    }

    if volume.brick_count == 0 {
        volume.brick_count = volume.bricks.len();
    }

    debug!(
        "卷 {} 解析完成: 类型={}, 状态={}, Brick数={}",
        volume.name,
        volume.volume_type,
        volume.status,
        volume.brick_count
    );

    volume
}

/// 汇总 `gluster volume heal <vol> info*` 输出中的条目数量
///
/// 同时兼容 `Number of entries:` 与 `Number of entries in split-brain:` 两种写法
pub fn parse_entry_count(output: &str) -> usize {
    output
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            line.strip_prefix("Number of entries in split-brain:")
                .or_else(|| line.strip_prefix("Number of entries:"))
        })
        .filter_map(|count| count.trim().parse::<usize>().ok())
        .sum()
}
