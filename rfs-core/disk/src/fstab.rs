//! fstab 条目
//!
//! 每个受管挂载点至多一行。已有同一挂载点或同一设备标识的行时不再追加。

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;

/// fstab 中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FstabEntry {
    /// 设备标识（`UUID=...` 或 `host:/volume`）
    pub spec: String,
    /// 挂载点
    pub file: String,
    /// 文件系统类型
    pub vfstype: String,
    /// 挂载选项
    pub options: String,
    pub freq: u32,
    pub passno: u32,
}

impl FstabEntry {
    /// 本地磁盘条目（按 UUID）
    pub fn local(uuid: &str, mountpoint: &str, vfstype: &str, options: &str) -> Self {
        Self {
            spec: format!("UUID={}", uuid),
            file: mountpoint.to_string(),
            vfstype: vfstype.to_string(),
            options: options.to_string(),
            freq: 0,
            passno: 2,
        }
    }

    /// 集群客户端条目（按 host:/volume）
    pub fn glusterfs(host: &str, volume: &str, mountpoint: &str) -> Self {
        Self {
            spec: format!("{}:/{}", host, volume),
            file: mountpoint.to_string(),
            vfstype: "glusterfs".to_string(),
            options: "defaults,_netdev".to_string(),
            freq: 0,
            passno: 0,
        }
    }

    /// 解析一行，注释与空行返回 None
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            return None;
        }

        Some(Self {
            spec: fields[0].to_string(),
            file: fields[1].to_string(),
            vfstype: fields.get(2).unwrap_or(&"auto").to_string(),
            options: fields.get(3).unwrap_or(&"defaults").to_string(),
            freq: fields.get(4).and_then(|v| v.parse().ok()).unwrap_or(0),
            passno: fields.get(5).and_then(|v| v.parse().ok()).unwrap_or(0),
        })
    }

    /// 是否与已有条目冲突（同一挂载点或同一设备）
    pub fn conflicts_with(&self, other: &FstabEntry) -> bool {
        normalize(&self.file) == normalize(&other.file) || self.spec == other.spec
    }
}

impl fmt::Display for FstabEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.spec, self.file, self.vfstype, self.options, self.freq, self.passno
        )
    }
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// 读取 fstab 中的所有条目，文件不存在时视为空
pub fn read_entries(path: &Path) -> Result<Vec<FstabEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(content.lines().filter_map(FstabEntry::parse).collect())
}

/// 追加条目（幂等）
///
/// # Returns
/// 本次是否写入了新行
pub fn ensure_entry(path: &Path, entry: &FstabEntry) -> Result<bool> {
    let existing = read_entries(path)?;
    if let Some(found) = existing.iter().find(|e| entry.conflicts_with(e)) {
        debug!("fstab 已有 {} 的条目: {}", entry.file, found);
        return Ok(false);
    }

    let needs_newline = path.exists()
        && fs::read_to_string(path)?
            .chars()
            .last()
            .map_or(false, |c| c != '\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if needs_newline {
        writeln!(file)?;
    }
    writeln!(file, "{}", entry)?;

    info!("写入 fstab: {}", entry);
    Ok(true)
}
