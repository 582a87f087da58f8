use std::collections::{BTreeMap, HashMap};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::models::channel::{rate_to_ppm, Channel, ChannelId, FeePolicy, NodeId};
use crate::models::error::NetworkError;

// Represent a payment channel network node. Capital lives in channels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
}

impl Node {
    pub fn new(id: &str) -> Self {
        Node { id: id.to_string() }
    }
}

// Mutable per-channel state captured by a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelState {
    pub balance_a: u64,
    pub policy: FeePolicy,
    pub fee_earned: u64,
}

/// Balances, fee policies and fee counters of every channel at one point
/// in time. Topology is not captured; it never changes during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    channels: Vec<ChannelState>,
}

/// Owns every node and channel of the simulated network.
///
/// Nodes and channels live in flat maps keyed by id; the adjacency list maps
/// a node to the ids of its incident channels. Nodes never hold references
/// to channels.
#[derive(Debug, Clone, Default)]
pub struct Network {
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    pub(crate) channels: Vec<Channel>,
    pub(crate) adjacency_list: BTreeMap<NodeId, Vec<ChannelId>>,
    channel_index: HashMap<(NodeId, NodeId), ChannelId>,
}

fn pair_key(a: &str, b: &str) -> (NodeId, NodeId) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: &str) -> Result<&Node, NetworkError> {
        if self.nodes.contains_key(id) {
            return Err(NetworkError::DuplicateNode(id.to_string()));
        }
        self.adjacency_list.insert(id.to_string(), Vec::new());
        Ok(self.nodes.entry(id.to_string()).or_insert_with(|| Node::new(id)))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_channel(&mut self,
                       node_a: &str,
                       node_b: &str,
                       capacity: u64,
                       balance_a: u64,
                       balance_b: u64,
                       base_fee: u64,
                       fee_rate: f64) -> Result<ChannelId, NetworkError> {
        for node in [node_a, node_b] {
            if !self.nodes.contains_key(node) {
                return Err(NetworkError::UnknownNode(node.to_string()));
            }
        }

        let invalid = |reason: String| NetworkError::InvalidChannel {
            node_a: node_a.to_string(),
            node_b: node_b.to_string(),
            reason,
        };

        if node_a == node_b {
            return Err(invalid("a channel needs two distinct endpoints".to_string()));
        }
        if balance_a.checked_add(balance_b) != Some(capacity) {
            return Err(invalid(format!("balances {} + {} do not sum to capacity {}",
                                       balance_a, balance_b, capacity)));
        }
        let fee_rate_ppm = rate_to_ppm(fee_rate)
            .ok_or_else(|| invalid(format!("fee rate {} must be finite and non-negative", fee_rate)))?;

        let key = pair_key(node_a, node_b);
        if self.channel_index.contains_key(&key) {
            return Err(NetworkError::DuplicateChannel {
                node_a: node_a.to_string(),
                node_b: node_b.to_string(),
            });
        }

        let id = ChannelId(self.channels.len());
        let policy = FeePolicy { base_fee, fee_rate_ppm };
        let channel = Channel::new(id, node_a, node_b, balance_a, balance_b, policy);
        debug!("Opened {}", channel);

        self.channels.push(channel);
        self.channel_index.insert(key, id);

        // Update adjacency list
        self.adjacency_list.entry(node_a.to_string()).or_default().push(id);
        self.adjacency_list.entry(node_b.to_string()).or_default().push(id);

        Ok(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    // Node ids in ascending order
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().cloned().collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(id.0)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel_between(&self, a: &str, b: &str) -> Option<ChannelId> {
        self.channel_index.get(&pair_key(a, b)).copied()
    }

    pub fn incident_channels(&self, node: &str) -> &[ChannelId] {
        self.adjacency_list.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    // Get all neighbors of a node
    pub fn neighbors(&self, node: &str) -> Vec<&str> {
        self.incident_channels(node)
            .iter()
            .filter_map(|id| self.channels[id.0].other_node(node))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn total_capacity(&self) -> u64 {
        self.channels.iter().map(Channel::capacity).sum()
    }

    pub fn set_fee_policy(&mut self, id: ChannelId, policy: FeePolicy) -> Result<(), NetworkError> {
        let channel = self.channels.get_mut(id.0).ok_or(NetworkError::UnknownChannel(id))?;
        debug!("Fee policy of {} set to base_fee={} fee_rate_ppm={}",
               id, policy.base_fee, policy.fee_rate_ppm);
        channel.set_policy(policy);
        Ok(())
    }

    pub fn set_fee_rate(&mut self, id: ChannelId, fee_rate: f64) -> Result<(), NetworkError> {
        let current = self.channel(id).ok_or(NetworkError::UnknownChannel(id))?.fee_policy();
        let fee_rate_ppm = rate_to_ppm(fee_rate).ok_or_else(|| {
            NetworkError::InvalidFeePolicy(format!("fee rate {} must be finite and non-negative", fee_rate))
        })?;
        self.set_fee_policy(id, FeePolicy { fee_rate_ppm, ..current })
    }

    pub fn set_base_fee(&mut self, id: ChannelId, base_fee: u64) -> Result<(), NetworkError> {
        let current = self.channel(id).ok_or(NetworkError::UnknownChannel(id))?.fee_policy();
        self.set_fee_policy(id, FeePolicy { base_fee, ..current })
    }

    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            channels: self.channels.iter()
                .map(|c| ChannelState {
                    balance_a: c.balance_a(),
                    policy: c.fee_policy(),
                    fee_earned: c.fee_earned(),
                })
                .collect(),
        }
    }

    pub fn restore(&mut self, snapshot: &NetworkSnapshot) -> Result<(), NetworkError> {
        if snapshot.channels.len() != self.channels.len() {
            return Err(NetworkError::SnapshotMismatch {
                expected: snapshot.channels.len(),
                actual: self.channels.len(),
            });
        }
        if let Some((i, _)) = snapshot.channels.iter().enumerate()
            .find(|(i, state)| state.balance_a > self.channels[*i].capacity()) {
            return Err(NetworkError::InvalidChannel {
                node_a: self.channels[i].node_a.clone(),
                node_b: self.channels[i].node_b.clone(),
                reason: "snapshot balance exceeds capacity".to_string(),
            });
        }

        for (channel, state) in self.channels.iter_mut().zip(&snapshot.channels) {
            channel.restore_state(state.balance_a, state.policy, state.fee_earned);
        }
        debug!("Restored snapshot of {} channels", self.channels.len());
        Ok(())
    }

    // Log a summary of all channels in the network
    pub fn log_channels(&self) {
        debug!("Channels:");
        for channel in &self.channels {
            debug!("  {}", channel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_node_network() -> Network {
        let mut network = Network::new();
        network.add_node("alice").unwrap();
        network.add_node("bob").unwrap();
        network
    }

    #[test]
    fn test_add_node() {
        let mut network = Network::new();
        let node = network.add_node("test_key").unwrap();
        assert_eq!(node.id, "test_key");

        assert_eq!(network.node_count(), 1);
        assert!(network.contains_node("test_key"));
        assert_eq!(network.add_node("test_key").unwrap_err(),
                   NetworkError::DuplicateNode("test_key".to_string()));
        assert_eq!(network.node_count(), 1);
    }

    #[test]
    fn test_add_channel() {
        let mut network = two_node_network();
        let id = network.add_channel("alice", "bob", 1_000_000, 700_000, 300_000, 10, 0.001).unwrap();

        assert_eq!(network.channel_count(), 1);
        assert_eq!(network.channel_between("bob", "alice"), Some(id));
        assert_eq!(network.neighbors("alice"), vec!["bob"]);
        assert_eq!(network.neighbors("bob"), vec!["alice"]);

        let channel = network.channel(id).unwrap();
        assert_eq!(channel.balance_a(), 700_000);
        assert_eq!(channel.fee_policy().fee_rate_ppm, 1_000);
    }

    #[test]
    fn test_add_channel_rejects_bad_topology() {
        let mut network = two_node_network();

        assert_eq!(network.add_channel("alice", "carol", 100, 50, 50, 0, 0.0).unwrap_err(),
                   NetworkError::UnknownNode("carol".to_string()));

        assert!(matches!(network.add_channel("alice", "bob", 100, 60, 50, 0, 0.0),
                         Err(NetworkError::InvalidChannel { .. })));
        assert!(matches!(network.add_channel("alice", "alice", 100, 50, 50, 0, 0.0),
                         Err(NetworkError::InvalidChannel { .. })));
        assert!(matches!(network.add_channel("alice", "bob", 100, 50, 50, 0, -0.5),
                         Err(NetworkError::InvalidChannel { .. })));
        assert!(matches!(network.add_channel("alice", "bob", u64::MAX, u64::MAX, 1, 0, 0.0),
                         Err(NetworkError::InvalidChannel { .. })));

        network.add_channel("alice", "bob", 100, 50, 50, 0, 0.0).unwrap();
        assert!(matches!(network.add_channel("bob", "alice", 100, 50, 50, 0, 0.0),
                         Err(NetworkError::DuplicateChannel { .. })));

        // Nothing but the valid channel was inserted
        assert_eq!(network.channel_count(), 1);
        assert_eq!(network.incident_channels("alice").len(), 1);
    }

    #[test]
    fn test_fee_mutation_leaves_balances() {
        let mut network = two_node_network();
        let id = network.add_channel("alice", "bob", 1_000, 400, 600, 10, 0.01).unwrap();

        network.set_fee_rate(id, 0.25).unwrap();
        network.set_base_fee(id, 3).unwrap();

        let channel = network.channel(id).unwrap();
        assert_eq!(channel.fee_policy(), FeePolicy { base_fee: 3, fee_rate_ppm: 250_000 });
        assert_eq!(channel.balance_a(), 400);
        assert_eq!(channel.balance_b(), 600);

        assert!(matches!(network.set_fee_rate(id, f64::NAN), Err(NetworkError::InvalidFeePolicy(_))));
        assert_eq!(network.set_base_fee(ChannelId(9), 1).unwrap_err(),
                   NetworkError::UnknownChannel(ChannelId(9)));
    }

    #[test]
    fn test_snapshot_restore() {
        let mut network = two_node_network();
        let id = network.add_channel("alice", "bob", 1_000, 400, 600, 10, 0.01).unwrap();
        let snapshot = network.snapshot();

        network.channels[id.0].transfer(crate::models::channel::Side::A, 150);
        network.channels[id.0].credit_fee(7);
        network.set_fee_rate(id, 0.5).unwrap();

        network.restore(&snapshot).unwrap();
        let channel = network.channel(id).unwrap();
        assert_eq!(channel.balance_a(), 400);
        assert_eq!(channel.balance_b(), 600);
        assert_eq!(channel.fee_earned(), 0);
        assert_eq!(channel.fee_policy().fee_rate_ppm, 10_000);
        assert_eq!(network.snapshot(), snapshot);
    }

    #[test]
    fn test_restore_rejects_foreign_snapshot() {
        let empty = Network::new().snapshot();
        let mut network = two_node_network();
        network.add_channel("alice", "bob", 1_000, 400, 600, 10, 0.01).unwrap();

        assert_eq!(network.restore(&empty).unwrap_err(),
                   NetworkError::SnapshotMismatch { expected: 0, actual: 1 });
    }
}
