mod support;

use std::fs;
use std::time::Duration;

use rfs_common::Role;
use rfs_orchestrator::{
    BootstrapError, BootstrapOutcome, BootstrapState, Bootstrapper, StateStore, VolumeAction,
};
use support::{FakeCluster, SimNode};

const PEERS: [&str; 3] = ["10.0.0.4", "10.0.0.5", "10.0.0.6"];
const DISKS: [&str; 2] = ["/dev/sdc", "/dev/sdd"];

fn three_nodes(cluster: &std::sync::Arc<FakeCluster>) -> Vec<SimNode> {
    PEERS
        .iter()
        .map(|ip| SimNode::new(ip, &DISKS, cluster))
        .collect()
}

async fn bootstrap_all(nodes: &[SimNode], extra: &str) -> Vec<rfs_orchestrator::Result<BootstrapOutcome>> {
    let b0 = Bootstrapper::new(nodes[0].gluster_context(&PEERS, extra));
    let b1 = Bootstrapper::new(nodes[1].gluster_context(&PEERS, extra));
    let b2 = Bootstrapper::new(nodes[2].gluster_context(&PEERS, extra));
    let (r0, r1, r2) = tokio::join!(b0.run(), b1.run(), b2.run());
    vec![r0, r1, r2]
}

#[tokio::test(start_paused = true)]
async fn test_three_node_distributed_volume() {
    let cluster = FakeCluster::new(&PEERS);
    let nodes = three_nodes(&cluster);

    let results = bootstrap_all(&nodes, "").await;
    let outcomes: Vec<BootstrapOutcome> = results.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(
        outcomes[0],
        BootstrapOutcome::Joined {
            role: Role::Coordinator,
            volume: Some(VolumeAction::Created { forced: false }),
        }
    );
    for outcome in &outcomes[1..] {
        assert_eq!(
            *outcome,
            BootstrapOutcome::Joined {
                role: Role::Follower,
                volume: None,
            }
        );
    }

    let volume = cluster.volume().unwrap();
    assert_eq!(volume.name, "gv0");
    assert!(volume.started);
    assert!(volume.type_args.is_empty());
    let bricks: Vec<String> = volume.bricks.iter().map(|b| b.full_path()).collect();
    assert_eq!(
        bricks,
        vec![
            "10.0.0.4:/data/brick0",
            "10.0.0.5:/data/brick0",
            "10.0.0.6:/data/brick0"
        ]
    );
    assert_eq!(
        cluster.calls("gluster volume create"),
        vec!["gluster volume create gv0 transport tcp 10.0.0.4:/data/brick0 10.0.0.5:/data/brick0 10.0.0.6:/data/brick0"]
    );

    for node in &nodes {
        // btrfs 原生 RAID 0 池，只建一次
        assert_eq!(
            node.host.calls("mkfs.btrfs"),
            vec!["mkfs.btrfs -d raid0 -m raid0 /dev/sdc1 /dev/sdd1"]
        );
        assert_eq!(node.host.count("parted"), 2);

        assert_eq!(
            node.fstab_lines("/mnt/gluster"),
            vec![format!(
                "{}:/gv0 /mnt/gluster glusterfs defaults,_netdev 0 0",
                node.ip()
            )]
        );
        assert_eq!(
            node.fstab_lines(" /data "),
            vec![format!("UUID=btrfs-{} /data btrfs defaults,discard 0 2", node.ip())]
        );
        assert!(node.host.is_mounted("/data"));
        assert!(node.host.is_mounted("/mnt/gluster"));
        assert_eq!(node.host.calls("chmod"), vec!["chmod 1777 /data/brick0"]);

        let store = StateStore::open(node.state_dir()).unwrap();
        assert_eq!(store.state(), BootstrapState::Done);
        assert!(store.has_marker("done"));
        assert!(store.has_marker("mounted"));
    }

    // 只有协调者经过探测阶段
    let coordinator = StateStore::open(nodes[0].state_dir()).unwrap();
    assert!(coordinator.has_marker("quorum-wait"));
    assert_eq!(coordinator.role(), Some(Role::Coordinator));
    let follower = StateStore::open(nodes[1].state_dir()).unwrap();
    assert!(!follower.has_marker("peering"));
    assert_eq!(follower.role(), Some(Role::Follower));
}

#[tokio::test(start_paused = true)]
async fn test_rerun_on_done_node_changes_nothing() {
    let cluster = FakeCluster::new(&PEERS);
    let nodes = three_nodes(&cluster);
    for result in bootstrap_all(&nodes, "").await {
        result.unwrap();
    }
    let history: Vec<usize> = nodes.iter().map(|n| n.host.runner.history().len()).collect();

    for result in bootstrap_all(&nodes, "").await {
        assert_eq!(result.unwrap(), BootstrapOutcome::AlreadyDone);
    }

    for (node, before) in nodes.iter().zip(history) {
        assert_eq!(node.host.runner.history().len(), before);
    }
    assert_eq!(cluster.calls("gluster volume create").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_run_converges_without_mutation() {
    let cluster = FakeCluster::new(&PEERS);
    let nodes = three_nodes(&cluster);
    for result in bootstrap_all(&nodes, "").await {
        result.unwrap();
    }

    // 模拟完成标记写入前中断
    for node in &nodes {
        fs::remove_dir_all(node.state_dir()).unwrap();
    }

    for result in bootstrap_all(&nodes, "").await {
        assert!(matches!(result.unwrap(), BootstrapOutcome::Joined { .. }));
    }

    assert_eq!(cluster.calls("gluster volume create").len(), 1);
    for node in &nodes {
        assert_eq!(node.host.count("mkfs"), 1);
        assert_eq!(node.host.count("parted"), 2);
        assert_eq!(node.fstab_lines("/mnt/gluster").len(), 1);
        assert_eq!(node.fstab_lines(" /data ").len(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_volume_created_only_after_quorum() {
    let cluster = FakeCluster::new(&PEERS[..2]);
    let nodes = three_nodes(&cluster);

    let start = tokio::time::Instant::now();
    let late = cluster.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(120)).await;
        late.set_reachable("10.0.0.6", true);
    });

    for result in bootstrap_all(&nodes, "").await {
        result.unwrap();
    }

    let created_at = cluster.with(|s| s.created_at).unwrap();
    // 最后一个节点可达之后，还要经过固定的稳定等待
    assert!(created_at - start >= Duration::from_secs(125));
    assert_eq!(cluster.calls("gluster volume create").len(), 1);
    assert!(nodes[2].host.is_mounted("/mnt/gluster"));
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_peer_is_fatal_after_ceiling() {
    let cluster = FakeCluster::new(&PEERS[..2]);
    let node = SimNode::new(PEERS[0], &DISKS, &cluster);

    let extra = "[timeouts]\ncluster_secs = 60\n";
    let result = Bootstrapper::new(node.gluster_context(&PEERS, extra)).run().await;

    match result {
        Err(BootstrapError::Timeout { operation, ceiling }) => {
            assert!(operation.contains("10.0.0.6"));
            assert_eq!(ceiling, Duration::from_secs(60));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(cluster.volume().is_none());

    let store = StateStore::open(node.state_dir()).unwrap();
    assert_eq!(store.state(), BootstrapState::Peering);
}

#[tokio::test(start_paused = true)]
async fn test_forced_replica_create_triggers_heal() {
    let cluster = FakeCluster::new(&PEERS);
    cluster.with(|s| s.require_force = true);
    let nodes = three_nodes(&cluster);

    let extra = "[gluster]\nvolume_type = \"replica\"\noptions = [[\"performance.cache-size\", \"256MB\"]]\n";
    let results = bootstrap_all(&nodes, extra).await;
    assert_eq!(
        results.into_iter().next().unwrap().unwrap(),
        BootstrapOutcome::Joined {
            role: Role::Coordinator,
            volume: Some(VolumeAction::Created { forced: true }),
        }
    );

    let creates = cluster.calls("gluster volume create");
    assert_eq!(creates.len(), 2);
    assert!(!creates[0].ends_with("force"));
    assert!(creates[1].starts_with("gluster volume create gv0 replica 3 transport tcp"));
    assert!(creates[1].ends_with(" force"));

    assert_eq!(
        cluster.calls("volume set"),
        vec!["volume set gv0 performance.cache-size 256MB"]
    );
    assert_eq!(cluster.calls("volume heal gv0 info").len(), 1);
    assert_eq!(
        cluster.with(|s| s.calls.iter().filter(|c| *c == "volume heal gv0").count()),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_local_ip_not_in_peers_is_rejected() {
    let cluster = FakeCluster::new(&PEERS);
    let node = SimNode::new("10.9.9.9", &DISKS, &cluster);

    let result = Bootstrapper::new(node.gluster_context(&PEERS, "")).run().await;
    assert!(matches!(result, Err(BootstrapError::Config(_))));
    assert!(cluster.calls("peer probe").is_empty());
}
