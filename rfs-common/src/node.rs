//! 节点角色推断
//!
//! 协调者由外部提供的有序对等列表决定：位置 0 的节点为协调者，其余为跟随者。
//! 列表本身必须无重复，且本机 IP 恰好出现一次，以保证全局只有一个协调者。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{ConfigError, Result};

/// 节点角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 负责对等探测与卷级操作
    Coordinator,
    /// 只等待卷就绪并挂载
    Follower,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Coordinator => f.write_str("coordinator"),
            Role::Follower => f.write_str("follower"),
        }
    }
}

/// 集群中的一个节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// 节点 IP
    pub ip: String,
    /// 在对等列表中的位置
    pub position: usize,
    /// 推断出的角色
    pub role: Role,
}

/// 本机视角下的集群成员关系
#[derive(Debug, Clone)]
pub struct ClusterView {
    peers: Vec<String>,
    local: Node,
}

impl ClusterView {
    /// 根据有序对等列表和本机 IP 构建视图
    pub fn new(peers: &[String], local_ip: &str) -> Result<Self> {
        if peers.is_empty() {
            return Err(ConfigError::Invalid("对等节点列表为空".to_string()));
        }

        let mut seen = HashSet::new();
        for peer in peers {
            if !seen.insert(peer.as_str()) {
                return Err(ConfigError::Invalid(format!("对等节点重复: {}", peer)));
            }
        }

        let position = peers
            .iter()
            .position(|p| p == local_ip)
            .ok_or_else(|| {
                ConfigError::Invalid(format!("本机 IP {} 不在对等节点列表中", local_ip))
            })?;

        let role = if position == 0 {
            Role::Coordinator
        } else {
            Role::Follower
        };

        Ok(Self {
            peers: peers.to_vec(),
            local: Node {
                ip: local_ip.to_string(),
                position,
                role,
            },
        })
    }

    pub fn local(&self) -> &Node {
        &self.local
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    pub fn coordinator_ip(&self) -> &str {
        &self.peers[0]
    }

    pub fn is_coordinator(&self) -> bool {
        self.local.role == Role::Coordinator
    }

    pub fn node_count(&self) -> usize {
        self.peers.len()
    }

    /// 除本机外的所有节点
    pub fn others(&self) -> Vec<&str> {
        self.peers
            .iter()
            .filter(|p| **p != self.local.ip)
            .map(|p| p.as_str())
            .collect()
    }

    /// 卷操作前需要处于已连接状态的对等节点数
    pub fn required_quorum(&self) -> usize {
        self.peers.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peers(ips: &[&str]) -> Vec<String> {
        ips.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_peer_is_coordinator() {
        let list = peers(&["10.0.0.4", "10.0.0.5", "10.0.0.6"]);
        let view = ClusterView::new(&list, "10.0.0.4").unwrap();
        assert!(view.is_coordinator());
        assert_eq!(view.local().position, 0);
        assert_eq!(view.others(), vec!["10.0.0.5", "10.0.0.6"]);
        assert_eq!(view.required_quorum(), 2);
    }

    #[test]
    fn test_follower_role() {
        let list = peers(&["10.0.0.4", "10.0.0.5"]);
        let view = ClusterView::new(&list, "10.0.0.5").unwrap();
        assert_eq!(view.local().role, Role::Follower);
        assert_eq!(view.coordinator_ip(), "10.0.0.4");
    }

    #[test]
    fn test_exactly_one_coordinator() {
        let list = peers(&["a", "b", "c", "d"]);
        let coordinators = list
            .iter()
            .filter(|ip| ClusterView::new(&list, ip).unwrap().is_coordinator())
            .count();
        assert_eq!(coordinators, 1);
    }

    #[test]
    fn test_rejects_missing_local_ip() {
        let list = peers(&["10.0.0.4"]);
        assert!(ClusterView::new(&list, "10.0.0.9").is_err());
    }

    #[test]
    fn test_rejects_duplicates() {
        let list = peers(&["10.0.0.4", "10.0.0.4"]);
        assert!(ClusterView::new(&list, "10.0.0.4").is_err());
    }
}
