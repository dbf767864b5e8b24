mod support;

use std::fs;

use rfs_orchestrator::{
    BootstrapError, BootstrapOutcome, Bootstrapper, ClusterResize, ResizeCoordinator, StateStore,
};
use support::{nfs_config, FakeCluster, SimNode};

const ALL: [&str; 4] = ["10.0.0.4", "10.0.0.5", "10.0.0.6", "10.0.0.7"];
const DISKS: [&str; 2] = ["/dev/sdc", "/dev/sdd"];

#[tokio::test(start_paused = true)]
async fn test_two_to_four_nodes() {
    let cluster = FakeCluster::new(&ALL);
    let nodes: Vec<SimNode> = ALL.iter().map(|ip| SimNode::new(ip, &DISKS, &cluster)).collect();

    // 原有两节点集群
    let old = &ALL[..2];
    let b0 = Bootstrapper::new(nodes[0].gluster_context(old, ""));
    let b1 = Bootstrapper::new(nodes[1].gluster_context(old, ""));
    let (r0, r1) = tokio::join!(b0.run(), b1.run());
    r0.unwrap();
    r1.unwrap();
    assert_eq!(cluster.volume().unwrap().bricks.len(), 2);

    let probes_before = cluster.calls("peer probe").len();
    let old_mounts: Vec<usize> = nodes[..2]
        .iter()
        .map(|n| n.host.count("mount /mnt/gluster"))
        .collect();

    let coordinators: Vec<ResizeCoordinator> = nodes
        .iter()
        .map(|n| ResizeCoordinator::new(n.gluster_context(&ALL, "")))
        .collect();
    let (r0, r1, r2, r3) = tokio::join!(
        coordinators[0].resize_cluster(2),
        coordinators[1].resize_cluster(2),
        coordinators[2].resize_cluster(2),
        coordinators[3].resize_cluster(2),
    );
    let results = [r0.unwrap(), r1.unwrap(), r2.unwrap(), r3.unwrap()];

    assert_eq!(
        results[0],
        ClusterResize {
            node_count: 4,
            is_new_node: false,
            added_bricks: true,
        }
    );
    assert!(!results[1].is_new_node && !results[1].added_bricks);
    assert!(results[2].is_new_node && results[3].is_new_node);

    // 一次 add-brick，只包含新 brick
    assert_eq!(
        cluster.calls("volume add-brick"),
        vec!["volume add-brick gv0 10.0.0.6:/data/brick0 10.0.0.7:/data/brick0"]
    );
    // 只探测新节点
    assert_eq!(
        cluster.calls("peer probe")[probes_before..].to_vec(),
        vec!["peer probe 10.0.0.6", "peer probe 10.0.0.7"]
    );

    let volume = cluster.volume().unwrap();
    let bricks: Vec<String> = volume.bricks.iter().map(|b| b.full_path()).collect();
    assert_eq!(
        bricks,
        vec![
            "10.0.0.4:/data/brick0",
            "10.0.0.5:/data/brick0",
            "10.0.0.6:/data/brick0",
            "10.0.0.7:/data/brick0"
        ]
    );

    // 原有节点不重复挂载，新节点挂载一次
    for (node, before) in nodes[..2].iter().zip(old_mounts) {
        assert_eq!(node.host.count("mount /mnt/gluster"), before);
        assert_eq!(node.fstab_lines("/mnt/gluster").len(), 1);
        assert_eq!(node.host.count("mkfs"), 1);
    }
    for node in &nodes[2..] {
        assert_eq!(node.fstab_lines("/mnt/gluster").len(), 1);
        assert!(node.host.is_mounted("/mnt/gluster"));
        assert!(node.host.is_mounted("/data"));
        assert_eq!(node.host.count("mkfs.btrfs"), 1);
        assert!(StateStore::open(node.state_dir())
            .unwrap()
            .has_marker("resize-cluster"));
    }
}

#[tokio::test(start_paused = true)]
async fn test_resize_cluster_is_idempotent() {
    let cluster = FakeCluster::new(&ALL[..3]);
    let nodes: Vec<SimNode> = ALL[..3]
        .iter()
        .map(|ip| SimNode::new(ip, &DISKS, &cluster))
        .collect();

    let old = &ALL[..2];
    let b0 = Bootstrapper::new(nodes[0].gluster_context(old, ""));
    let b1 = Bootstrapper::new(nodes[1].gluster_context(old, ""));
    let (r0, r1) = tokio::join!(b0.run(), b1.run());
    r0.unwrap();
    r1.unwrap();

    let peers = &ALL[..3];
    for _ in 0..2 {
        let c0 = ResizeCoordinator::new(nodes[0].gluster_context(peers, ""));
        let c1 = ResizeCoordinator::new(nodes[1].gluster_context(peers, ""));
        let c2 = ResizeCoordinator::new(nodes[2].gluster_context(peers, ""));
        let (r0, r1, r2) = tokio::join!(
            c0.resize_cluster(2),
            c1.resize_cluster(2),
            c2.resize_cluster(2)
        );
        r0.unwrap();
        r1.unwrap();
        r2.unwrap();
    }

    assert_eq!(cluster.calls("volume add-brick").len(), 1);
    assert_eq!(cluster.volume().unwrap().bricks.len(), 3);
    assert_eq!(nodes[2].fstab_lines("/mnt/gluster").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_resize_cluster_rejects_bad_old_count() {
    let cluster = FakeCluster::new(&ALL);
    let node = SimNode::new(ALL[0], &DISKS, &cluster);
    let coordinator = ResizeCoordinator::new(node.gluster_context(&ALL, ""));

    assert!(matches!(
        coordinator.resize_cluster(4).await,
        Err(BootstrapError::Config(_))
    ));
    assert!(matches!(
        coordinator.resize_cluster(0).await,
        Err(BootstrapError::Config(_))
    ));
    assert!(cluster.calls("").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_resize_disks_grows_btrfs_pool() {
    let cluster = FakeCluster::new(&[]);
    let node = SimNode::new("10.0.0.4", &DISKS, &cluster);
    let config = nfs_config(node.dir.path(), "");

    let outcome = Bootstrapper::new(node.context(config.clone())).run().await.unwrap();
    assert_eq!(outcome, BootstrapOutcome::Exported);
    assert_eq!(
        fs::read_to_string(node.dir.path().join("exports")).unwrap(),
        "/data *(rw,sync,root_squash,no_subtree_check)\n"
    );

    node.host.add_disk("/dev/sde");
    node.host.add_disk("/dev/sdf");

    let resize = ResizeCoordinator::new(node.context(config.clone()));
    assert!(resize.resize_disks().await.unwrap());
    assert_eq!(
        node.host.calls("btrfs device add"),
        vec!["btrfs device add /dev/sde1 /dev/sdf1 /data"]
    );
    assert_eq!(
        node.host.calls("btrfs filesystem resize"),
        vec!["btrfs filesystem resize max /data"]
    );
    assert_eq!(node.host.count("btrfs filesystem balance"), 0);
    assert_eq!(node.host.count("mkfs"), 1);

    // 再次执行不再修改
    assert!(!resize.resize_disks().await.unwrap());
    assert_eq!(node.host.count("btrfs device add"), 1);
    assert_eq!(node.fstab_lines(" /data ").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_resize_disks_rebalance_when_requested() {
    let cluster = FakeCluster::new(&[]);
    let node = SimNode::new("10.0.0.4", &DISKS, &cluster);
    let config = nfs_config(node.dir.path(), "rebalance = true");

    Bootstrapper::new(node.context(config.clone())).run().await.unwrap();
    node.host.add_disk("/dev/sde");

    assert!(ResizeCoordinator::new(node.context(config))
        .resize_disks()
        .await
        .unwrap());
    assert_eq!(
        node.host.calls("btrfs filesystem balance"),
        vec!["btrfs filesystem balance /data"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_resize_disks_keeps_pool_when_new_disk_sorts_first() {
    let cluster = FakeCluster::new(&[]);
    let node = SimNode::new("10.0.0.4", &DISKS, &cluster);
    let config = nfs_config(node.dir.path(), "");

    Bootstrapper::new(node.context(config.clone())).run().await.unwrap();
    node.host.add_disk("/dev/sdb");

    assert!(ResizeCoordinator::new(node.context(config))
        .resize_disks()
        .await
        .unwrap());

    // 新盘只加入池，不单独格式化
    assert_eq!(
        node.host.calls("mkfs"),
        vec!["mkfs.btrfs -d raid0 -m raid0 /dev/sdc1 /dev/sdd1"]
    );
    assert_eq!(
        node.host.calls("btrfs device add"),
        vec!["btrfs device add /dev/sdb1 /data"]
    );
    assert_eq!(node.fstab_lines(" /data ").len(), 1);
}
