//! 持久化引导状态机
//!
//! 状态保存在 `<state_dir>/state.json`，每进入一个阶段写一个 `<阶段>.done`
//! 标记文件，供外部调用方判断进度。
//!
//! ```text
//! Uninitialized → LocalStorageReady ─┬→ RoleAssigned ─┬→ Peering → QuorumWait ─┐
//!                                    │                └───────────────────────┴→ VolumeWait → Mounted → Done
//!                                    └→ Exported → Done            (NFS)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rfs_common::Role;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{BootstrapError, Result};

const STATE_FILE: &str = "state.json";

/// 引导阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapState {
    Uninitialized,
    LocalStorageReady,
    RoleAssigned,
    Peering,
    QuorumWait,
    VolumeWait,
    Mounted,
    Exported,
    Done,
}

impl BootstrapState {
    /// 是否允许迁移到 `next`
    pub fn can_transition_to(self, next: BootstrapState) -> bool {
        use BootstrapState::*;

        matches!(
            (self, next),
            (Uninitialized, LocalStorageReady)
                | (LocalStorageReady, RoleAssigned)
                | (LocalStorageReady, Exported)
                | (RoleAssigned, Peering)
                | (RoleAssigned, VolumeWait)
                | (Peering, QuorumWait)
                | (QuorumWait, VolumeWait)
                | (VolumeWait, Mounted)
                | (Mounted, Done)
                | (Exported, Done)
        )
    }

    /// 标记文件名（不含 `.done` 后缀）
    pub fn marker_name(self) -> &'static str {
        match self {
            BootstrapState::Uninitialized => "uninitialized",
            BootstrapState::LocalStorageReady => "local-storage-ready",
            BootstrapState::RoleAssigned => "role-assigned",
            BootstrapState::Peering => "peering",
            BootstrapState::QuorumWait => "quorum-wait",
            BootstrapState::VolumeWait => "volume-wait",
            BootstrapState::Mounted => "mounted",
            BootstrapState::Exported => "exported",
            BootstrapState::Done => "done",
        }
    }
}

/// 持久化记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub state: BootstrapState,
    pub role: Option<Role>,
    pub updated_at: DateTime<Utc>,
}

impl Default for StateRecord {
    fn default() -> Self {
        Self {
            state: BootstrapState::Uninitialized,
            role: None,
            updated_at: Utc::now(),
        }
    }
}

/// 状态存储
pub struct StateStore {
    dir: PathBuf,
    record: StateRecord,
}

impl StateStore {
    /// 打开状态目录，加载已有状态
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let path = dir.join(STATE_FILE);
        let record = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| {
                BootstrapError::State(format!("{} 无法解析: {}", path.display(), e))
            })?
        } else {
            StateRecord::default()
        };

        debug!("加载引导状态: {:?}", record.state);
        Ok(Self { dir, record })
    }

    pub fn state(&self) -> BootstrapState {
        self.record.state
    }

    pub fn role(&self) -> Option<Role> {
        self.record.role
    }

    pub fn record(&self) -> &StateRecord {
        &self.record
    }

    pub fn is_done(&self) -> bool {
        self.record.state == BootstrapState::Done
    }

    /// 从头重新核对各阶段
    ///
    /// 上次运行中断时，磁盘上的状态只是进度记录；每个阶段都会重新探测实际状态，
    /// 所以内存中的状态机回到起点，迁移时再逐步覆盖持久化记录。
    pub fn restart(&mut self) {
        if self.record.state != BootstrapState::Uninitialized {
            info!("上次运行停在 {:?}，重新核对所有阶段", self.record.state);
        }
        self.record.state = BootstrapState::Uninitialized;
    }

    /// 记录角色
    pub fn set_role(&mut self, role: Role) -> Result<()> {
        self.record.role = Some(role);
        self.persist()
    }

    /// 迁移到下一阶段并写标记
    pub fn advance(&mut self, next: BootstrapState) -> Result<()> {
        let current = self.record.state;
        if current == next {
            return Ok(());
        }
        if !current.can_transition_to(next) {
            return Err(BootstrapError::IllegalTransition {
                from: current,
                to: next,
            });
        }

        self.record.state = next;
        self.record.updated_at = Utc::now();
        self.persist()?;
        self.write_marker(next.marker_name())?;

        info!("引导阶段: {:?} -> {:?}", current, next);
        Ok(())
    }

    /// 写入 `<name>.done` 标记
    pub fn write_marker(&self, name: &str) -> Result<()> {
        fs::write(self.marker_path(name), Utc::now().to_rfc3339())?;
        Ok(())
    }

    pub fn has_marker(&self, name: &str) -> bool {
        self.marker_path(name).exists()
    }

    pub fn marker_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.done", name))
    }

    fn persist(&self) -> Result<()> {
        let path = self.dir.join(STATE_FILE);
        let tmp = self.dir.join(format!("{}.tmp", STATE_FILE));
        fs::write(&tmp, serde_json::to_string_pretty(&self.record)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
