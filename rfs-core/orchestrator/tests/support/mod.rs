//! 集成测试支撑：内存 Gluster 控制面与模拟主机
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rfs_common::BootstrapConfig;
use rfs_disk::partition_path;
use rfs_executor::{CommandOutput, MockRunner};
use rfs_gluster::{
    CreateOutcome, GlusterBrick, GlusterError, GlusterVolume, HealSummary, PeerInfo,
    VolumeCreateRequest, VolumeDriver,
};
use rfs_orchestrator::NodeContext;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Gluster 控制面
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FakeVolume {
    pub name: String,
    pub type_args: Vec<String>,
    pub bricks: Vec<GlusterBrick>,
    pub started: bool,
    pub options: Vec<(String, String)>,
}

#[derive(Debug, Default)]
pub struct ClusterState {
    /// 可以 ping 通且 glusterd 正在运行的节点
    pub reachable: HashSet<String>,
    /// 可信存储池
    pub pool: HashSet<String>,
    pub volume: Option<FakeVolume>,
    /// 首次创建时要求 force
    pub require_force: bool,
    pub heal_info_ok: bool,
    /// 控制面调用记录
    pub calls: Vec<String>,
    pub created_at: Option<Instant>,
}

/// 多节点共享的内存 Gluster 控制面
#[derive(Debug, Default)]
pub struct FakeCluster {
    state: Mutex<ClusterState>,
}

impl FakeCluster {
    pub fn new(nodes: &[&str]) -> Arc<Self> {
        let cluster = Arc::new(Self::default());
        cluster.with(|s| {
            s.reachable = nodes.iter().map(|n| n.to_string()).collect();
            s.heal_info_ok = true;
        });
        cluster
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut ClusterState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn calls(&self, prefix: &str) -> Vec<String> {
        self.with(|s| {
            s.calls
                .iter()
                .filter(|c| c.starts_with(prefix))
                .cloned()
                .collect()
        })
    }

    pub fn volume(&self) -> Option<FakeVolume> {
        self.with(|s| s.volume.clone())
    }

    pub fn set_reachable(&self, node: &str, reachable: bool) {
        self.with(|s| {
            if reachable {
                s.reachable.insert(node.to_string());
            } else {
                s.reachable.remove(node);
            }
        });
    }

    pub fn driver(self: &Arc<Self>, local: &str) -> Arc<FakeDriver> {
        Arc::new(FakeDriver {
            local: local.to_string(),
            cluster: self.clone(),
        })
    }
}

/// 某个节点视角的卷驱动
pub struct FakeDriver {
    local: String,
    cluster: Arc<FakeCluster>,
}

impl FakeDriver {
    fn record(&self, call: String) {
        self.cluster.with(|s| s.calls.push(call));
    }
}

#[async_trait]
impl VolumeDriver for FakeDriver {
    async fn ping(&self, peer: &str) -> rfs_gluster::Result<bool> {
        Ok(self.cluster.with(|s| s.reachable.contains(peer)))
    }

    async fn probe_peer(&self, peer: &str) -> rfs_gluster::Result<bool> {
        self.record(format!("peer probe {}", peer));
        Ok(self.cluster.with(|s| {
            if !s.reachable.contains(peer) {
                return false;
            }
            s.pool.insert(self.local.clone());
            s.pool.insert(peer.to_string());
            true
        }))
    }

    async fn peer_status(&self) -> rfs_gluster::Result<Vec<PeerInfo>> {
        Ok(self.cluster.with(|s| {
            if !s.pool.contains(&self.local) {
                return Vec::new();
            }
            let mut peers: Vec<PeerInfo> = s
                .pool
                .iter()
                .filter(|p| **p != self.local)
                .map(|p| PeerInfo {
                    hostname: p.clone(),
                    uuid: format!("uuid-{}", p),
                    state: if s.reachable.contains(p) {
                        "Peer in Cluster (Connected)".to_string()
                    } else {
                        "Peer in Cluster (Disconnected)".to_string()
                    },
                })
                .collect();
            peers.sort_by(|a, b| a.hostname.cmp(&b.hostname));
            peers
        }))
    }

    async fn volume_info(&self, name: &str) -> rfs_gluster::Result<Option<GlusterVolume>> {
        Ok(self.cluster.with(|s| {
            let single_node = s.pool.is_empty() && s.reachable.contains(&self.local);
            if !single_node && !s.pool.contains(&self.local) {
                return None;
            }
            s.volume.as_ref().filter(|v| v.name == name).map(|v| {
                let mut volume = GlusterVolume::new(&v.name, "Distribute");
                volume.status = if v.started { "Started" } else { "Created" }.to_string();
                volume.brick_count = v.bricks.len();
                volume.bricks = v.bricks.clone();
                volume.transport = "tcp".to_string();
                volume
            })
        }))
    }

    async fn create_volume(
        &self,
        request: &VolumeCreateRequest,
        force: bool,
    ) -> rfs_gluster::Result<CreateOutcome> {
        self.record(request.to_command(force));
        self.cluster.with(|s| {
            if s.volume.is_some() {
                return Err(GlusterError::CommandError(format!(
                    "volume create: {}: failed: Volume {} already exists",
                    request.name, request.name
                )));
            }
            if s.require_force && !force {
                return Ok(CreateOutcome::NeedsForce(
                    "The brick is being created in the root partition. Use 'force' at the end of the command if you want to override this behavior.".to_string(),
                ));
            }
            s.volume = Some(FakeVolume {
                name: request.name.clone(),
                type_args: request.type_args.clone(),
                bricks: request.bricks.clone(),
                started: false,
                options: Vec::new(),
            });
            s.created_at = Some(Instant::now());
            Ok(CreateOutcome::Created)
        })
    }

    async fn start_volume(&self, name: &str) -> rfs_gluster::Result<()> {
        self.record(format!("volume start {}", name));
        self.cluster.with(|s| match s.volume.as_mut() {
            Some(v) => {
                v.started = true;
                Ok(())
            }
            None => Err(GlusterError::CommandError(format!("卷 {} 不存在", name))),
        })
    }

    async fn set_option(&self, name: &str, key: &str, value: &str) -> rfs_gluster::Result<()> {
        self.record(format!("volume set {} {} {}", name, key, value));
        self.cluster.with(|s| {
            if let Some(v) = s.volume.as_mut() {
                v.options.push((key.to_string(), value.to_string()));
            }
        });
        Ok(())
    }

    async fn add_bricks(
        &self,
        name: &str,
        type_args: &[String],
        bricks: &[GlusterBrick],
    ) -> rfs_gluster::Result<()> {
        let rendered: Vec<String> = bricks.iter().map(|b| b.full_path()).collect();
        let mut parts = vec![format!("volume add-brick {}", name)];
        parts.extend(type_args.iter().cloned());
        parts.extend(rendered);
        self.record(parts.join(" "));

        self.cluster.with(|s| match s.volume.as_mut() {
            Some(v) => {
                v.bricks.extend(bricks.iter().cloned());
                Ok(())
            }
            None => Err(GlusterError::CommandError(format!("卷 {} 不存在", name))),
        })
    }

    async fn heal_info_succeeds(&self, name: &str) -> rfs_gluster::Result<bool> {
        self.record(format!("volume heal {} info", name));
        Ok(self.cluster.with(|s| s.heal_info_ok))
    }

    async fn trigger_heal(&self, name: &str) -> rfs_gluster::Result<()> {
        self.record(format!("volume heal {}", name));
        Ok(())
    }

    async fn heal_summary(&self, _name: &str) -> rfs_gluster::Result<HealSummary> {
        Ok(HealSummary {
            pending: Some(0),
            heal_failed: None,
            split_brain: Some(0),
        })
    }
}

// ---------------------------------------------------------------------------
// 模拟主机
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct HostState {
    pub disks: Vec<String>,
    pub partitions: HashSet<String>,
    /// 设备 → blkid TYPE
    pub fs_types: HashMap<String, String>,
    /// 设备 → 文件系统 UUID
    pub uuids: HashMap<String, String>,
    pub mounted: HashSet<String>,
}

/// 带磁盘、分区、文件系统与挂载状态的模拟主机
pub struct SimHost {
    pub ip: String,
    pub runner: Arc<MockRunner>,
    pub state: Arc<Mutex<HostState>>,
}

fn devices(cmd: &str) -> Vec<String> {
    cmd.split_whitespace()
        .filter(|t| t.starts_with("/dev/"))
        .map(String::from)
        .collect()
}

fn last_token(cmd: &str) -> String {
    cmd.split_whitespace().last().unwrap_or_default().to_string()
}

fn found(value: Option<&String>) -> CommandOutput {
    match value {
        Some(v) => CommandOutput::success(format!("{}\n", v)),
        None => CommandOutput::failure(2, ""),
    }
}

impl SimHost {
    pub fn new(ip: &str, disks: &[&str]) -> Self {
        let state = Arc::new(Mutex::new(HostState {
            disks: disks.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }));
        let runner = Arc::new(MockRunner::new(ip));
        let host = Self {
            ip: ip.to_string(),
            runner,
            state,
        };
        host.install_rules();
        host
    }

    fn rule<F>(&self, prefix: &str, handler: F)
    where
        F: Fn(&mut HostState, &str) -> CommandOutput + Send + Sync + 'static,
    {
        let state = self.state.clone();
        self.runner.add_rule(prefix, move |cmd| {
            let mut state = state.lock().unwrap();
            handler(&mut state, cmd)
        });
    }

    fn install_rules(&self) {
        let ip = self.ip.clone();
        self.runner
            .add_rule("hostname -I", move |_| CommandOutput::success(format!("{} 172.17.0.1\n", ip)));

        self.rule("lsblk", |s, _| {
            let mut out = String::from(
                "NAME=\"/dev/sda\" TYPE=\"disk\" PKNAME=\"\" MOUNTPOINT=\"\"\n\
                 NAME=\"/dev/sda1\" TYPE=\"part\" PKNAME=\"/dev/sda\" MOUNTPOINT=\"/\"\n",
            );
            for disk in &s.disks {
                out.push_str(&format!(
                    "NAME=\"{}\" TYPE=\"disk\" PKNAME=\"\" MOUNTPOINT=\"\"\n",
                    disk
                ));
                let part = partition_path(disk);
                if s.partitions.contains(&part) {
                    out.push_str(&format!(
                        "NAME=\"{}\" TYPE=\"part\" PKNAME=\"{}\" MOUNTPOINT=\"\"\n",
                        part, disk
                    ));
                }
            }
            CommandOutput::success(out)
        });

        self.rule("test -b", |s, cmd| {
            if s.partitions.contains(&last_token(cmd)) {
                CommandOutput::success("")
            } else {
                CommandOutput::failure(1, "")
            }
        });

        self.rule("parted", |s, cmd| {
            for disk in devices(cmd) {
                s.partitions.insert(partition_path(&disk));
            }
            CommandOutput::success("")
        });

        self.rule("blkid -s TYPE -o value", |s, cmd| found(s.fs_types.get(&last_token(cmd))));
        self.rule("blkid -s UUID -o value", |s, cmd| found(s.uuids.get(&last_token(cmd))));

        let ip = self.ip.clone();
        self.rule("mkfs.btrfs", move |s, cmd| {
            let uuid = format!("btrfs-{}", ip);
            for dev in devices(cmd) {
                s.fs_types.insert(dev.clone(), "btrfs".to_string());
                s.uuids.insert(dev, uuid.clone());
            }
            CommandOutput::success("")
        });

        let ip = self.ip.clone();
        self.rule("mkfs.ext", move |s, cmd| {
            for dev in devices(cmd) {
                s.fs_types.insert(dev.clone(), "ext4".to_string());
                s.uuids.insert(dev, format!("ext-{}", ip));
            }
            CommandOutput::success("")
        });

        self.rule("btrfs filesystem show", |s, cmd| {
            if s.fs_types.get(&last_token(cmd)).map(String::as_str) != Some("btrfs") {
                return CommandOutput::failure(1, "ERROR: not a valid btrfs filesystem");
            }
            let total = s.fs_types.values().filter(|t| *t == "btrfs").count();
            CommandOutput::success(format!(
                "Label: none  uuid: pool\n\tTotal devices {} FS bytes used 112.00KiB\n",
                total
            ))
        });

        let ip = self.ip.clone();
        self.rule("btrfs device add", move |s, cmd| {
            for dev in devices(cmd) {
                s.fs_types.insert(dev.clone(), "btrfs".to_string());
                s.uuids.insert(dev, format!("btrfs-{}", ip));
            }
            CommandOutput::success("")
        });

        self.rule("mountpoint -q", |s, cmd| {
            if s.mounted.contains(&last_token(cmd)) {
                CommandOutput::success("")
            } else {
                CommandOutput::failure(1, "")
            }
        });

        self.rule("mount ", |s, cmd| {
            s.mounted.insert(last_token(cmd));
            CommandOutput::success("")
        });

        self.runner
            .add_rule("systemctl is-active", |_| CommandOutput::success("active\n"));
    }

    pub fn add_disk(&self, disk: &str) {
        self.state.lock().unwrap().disks.push(disk.to_string());
    }

    pub fn is_mounted(&self, mountpoint: &str) -> bool {
        self.state.lock().unwrap().mounted.contains(mountpoint)
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.runner.count(prefix)
    }

    pub fn calls(&self, prefix: &str) -> Vec<String> {
        self.runner.calls(prefix)
    }
}

// ---------------------------------------------------------------------------
// 配置
// ---------------------------------------------------------------------------

/// 节点配置，所有持久化文件都放在 `dir` 下
pub fn gluster_config(dir: &Path, peers: &[&str], extra: &str) -> BootstrapConfig {
    let peers: Vec<String> = peers.iter().map(|p| format!("\"{}\"", p)).collect();
    BootstrapConfig::from_toml(&format!(
        r#"
server_type = "glusterfs"
peers = [{peers}]
filesystem = "btrfs"
raid_level = 0
mountpoint = "/data"
{extra}

{paths}
"#,
        peers = peers.join(", "),
        extra = extra,
        paths = paths_section(dir),
    ))
    .unwrap()
}

pub fn nfs_config(dir: &Path, extra: &str) -> BootstrapConfig {
    BootstrapConfig::from_toml(&format!(
        r#"
server_type = "nfs"
filesystem = "btrfs"
raid_level = 0
mountpoint = "/data"
{extra}

{paths}
"#,
        extra = extra,
        paths = paths_section(dir),
    ))
    .unwrap()
}

fn paths_section(dir: &Path) -> String {
    let dir = dir.display();
    format!(
        r#"[paths]
fstab = '{dir}/fstab'
exports = '{dir}/exports'
smb_conf = '{dir}/smb.conf'
sysctl_conf = '{dir}/sysctl.d/60-rfs-tcp.conf'
state_dir = '{dir}/state'
"#,
        dir = dir
    )
}

/// 单个模拟节点：主机、工作目录与上下文构造
pub struct SimNode {
    pub host: SimHost,
    pub dir: tempfile::TempDir,
    pub cluster: Arc<FakeCluster>,
}

impl SimNode {
    pub fn new(ip: &str, disks: &[&str], cluster: &Arc<FakeCluster>) -> Self {
        Self {
            host: SimHost::new(ip, disks),
            dir: tempfile::tempdir().unwrap(),
            cluster: cluster.clone(),
        }
    }

    pub fn ip(&self) -> &str {
        &self.host.ip
    }

    pub fn context(&self, config: BootstrapConfig) -> NodeContext {
        NodeContext::new(
            config,
            self.host.runner.clone(),
            self.cluster.driver(&self.host.ip),
        )
    }

    pub fn gluster_context(&self, peers: &[&str], extra: &str) -> NodeContext {
        self.context(gluster_config(self.dir.path(), peers, extra))
    }

    pub fn fstab(&self) -> String {
        std::fs::read_to_string(self.dir.path().join("fstab")).unwrap_or_default()
    }

    pub fn fstab_lines(&self, needle: &str) -> Vec<String> {
        self.fstab()
            .lines()
            .filter(|l| l.contains(needle))
            .map(String::from)
            .collect()
    }

    pub fn state_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("state")
    }
}
