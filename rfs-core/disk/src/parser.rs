//! 系统工具输出解析
//!
//! 解析 `lsblk -P`、`mdadm --detail`、`btrfs filesystem show` 与 `/proc/mdstat`

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// 块设备信息（`lsblk -P -p -o NAME,TYPE,PKNAME,MOUNTPOINT` 的一行）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDevice {
    /// 设备路径，如 /dev/sdc
    pub path: String,
    /// 类型：disk / part / raid0 / lvm / rom ...
    pub kind: String,
    /// 父设备路径
    pub parent: Option<String>,
    /// 挂载点
    pub mountpoint: Option<String>,
}

fn pair_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([A-Z:]+)="([^"]*)""#).ok())
        .as_ref()
}

/// 解析 `lsblk -P` 输出
///
/// # 输出格式示例
/// ```text
/// NAME="/dev/sda" TYPE="disk" PKNAME="" MOUNTPOINT=""
/// NAME="/dev/sda1" TYPE="part" PKNAME="/dev/sda" MOUNTPOINT="/"
/// NAME="/dev/sdc" TYPE="disk" PKNAME="" MOUNTPOINT=""
/// ```
pub fn parse_lsblk_pairs(output: &str) -> Vec<BlockDevice> {
    let Some(re) = pair_regex() else {
        return Vec::new();
    };

    output
        .lines()
        .filter_map(|line| {
            let fields: HashMap<&str, &str> = re
                .captures_iter(line)
                .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
                .collect();

            let path = fields.get("NAME").filter(|s| !s.is_empty())?.to_string();
            let non_empty = |key: &str| {
                fields
                    .get(key)
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
            };

            Some(BlockDevice {
                path,
                kind: non_empty("TYPE").unwrap_or_default(),
                parent: non_empty("PKNAME"),
                mountpoint: non_empty("MOUNTPOINT"),
            })
        })
        .collect()
}

/// 解析 `mdadm --detail --scan` 输出，返回阵列设备列表
///
/// ```text
/// ARRAY /dev/md0 metadata=1.2 name=node1:0 UUID=3a9c...
/// ```
pub fn parse_mdadm_scan(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some("ARRAY"), Some(device)) => Some(device.to_string()),
                _ => None,
            }
        })
        .collect()
}

/// 解析 `mdadm --detail <device>` 中的 `Raid Devices : N`
pub fn parse_mdadm_raid_devices(output: &str) -> Option<usize> {
    output.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim() == "Raid Devices" {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// 解析 `btrfs filesystem show` 中的 `Total devices N`
///
/// ```text
/// Label: none  uuid: 1b2c...
///     Total devices 2 FS bytes used 112.00KiB
///     devid    1 size 128.00GiB used 2.01GiB path /dev/sdc1
/// ```
pub fn parse_btrfs_total_devices(output: &str) -> Option<usize> {
    output.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("Total devices")?;
        rest.split_whitespace().next()?.parse().ok()
    })
}

/// `/proc/mdstat` 是否显示阵列仍在重塑或同步
pub fn mdstat_busy(output: &str) -> bool {
    output.lines().any(|line| {
        let line = line.trim();
        line.contains("reshape") || line.contains("resync") || line.contains("recovery")
    })
}
