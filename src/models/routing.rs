// Fee-aware cheapest route search

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::models::channel::{ChannelId, NodeId};
use crate::models::error::RouteError;
use crate::models::network::Network;

// One channel traversal on a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    pub channel: ChannelId,
    pub from: NodeId,
    pub to: NodeId,
    // Amount moved from `from`'s side to `to`'s side on settlement
    pub amount: u64,
    // Fee charged by this channel
    pub fee: u64,
}

/// An ordered source-to-destination route together with what every hop
/// has to carry for `amount` to arrive at the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub source: NodeId,
    pub destination: NodeId,
    pub amount: u64,
    pub hops: Vec<Hop>,
}

impl Route {
    pub fn total_fee(&self) -> u64 {
        self.hops.iter().map(|hop| hop.fee).sum()
    }

    // Amount leaving the source: payment amount plus every fee on the route
    pub fn sent_amount(&self) -> u64 {
        self.hops.first().map_or(self.amount, |hop| hop.amount)
    }

    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    pub fn node_path(&self) -> Vec<&str> {
        let mut path = vec![self.source.as_str()];
        path.extend(self.hops.iter().map(|hop| hop.to.as_str()));
        path
    }
}

// Search label for a node: the amount that must be delivered to it so that
// the payment reaches the destination, plus the tie-breaking keys. Field
// order gives the comparison order: cost, then hops, then node sequence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Label {
    required: u64,
    hops: usize,
    // Forward node sequence from this node to the destination
    path: Vec<NodeId>,
}

impl Network {
    /// Find the cheapest route that can deliver `amount` from `source` to
    /// `destination` given current channel balances.
    ///
    /// The search runs Dijkstra backward from the destination. A node's label
    /// is the amount that must reach it; stepping back over a channel adds
    /// that channel's fee computed on the label, so fees compound from the
    /// destination towards the source. Because the fee is non-decreasing in
    /// the carried amount, extending a smaller label never yields a larger
    /// one and the first label settled for the source is optimal.
    ///
    /// A channel is usable only when the sending side can carry its hop
    /// amount: intermediaries forward the downstream amount, while the
    /// source's own channel also carries its own fee. Ties on total fee are
    /// broken by hop count, then by the lexicographic node-id sequence.
    pub fn find_path(&self, source: &str, destination: &str, amount: u64) -> Result<Route, RouteError> {
        if amount == 0 {
            return Err(RouteError::InvalidAmount);
        }
        for node in [source, destination] {
            if !self.contains_node(node) {
                return Err(RouteError::UnknownNode(node.to_string()));
            }
        }

        let no_route = || RouteError::NoRoute {
            source_node: source.to_string(),
            destination: destination.to_string(),
            amount,
        };

        if source == destination {
            return Err(no_route());
        }

        let mut best: BTreeMap<&str, Label> = BTreeMap::new();
        let mut settled: HashSet<&str> = HashSet::new();
        let mut queue = BinaryHeap::new();

        let start = Label { required: amount, hops: 0, path: vec![destination.to_string()] };
        best.insert(destination, start.clone());
        queue.push(Reverse(start));

        let mut found = None;

        while let Some(Reverse(label)) = queue.pop() {
            let node = match self.nodes.get_key_value(label.path[0].as_str()) {
                Some((id, _)) => id.as_str(),
                None => continue,
            };
            if !settled.insert(node) {
                continue;
            }
            if node == source {
                found = Some(label);
                break;
            }

            for &channel_id in self.incident_channels(node) {
                let channel = &self.channels[channel_id.0];
                let prev = match channel.other_node(node) {
                    Some(prev) => prev,
                    None => continue,
                };
                if settled.contains(prev) {
                    continue;
                }

                let fee = channel.forwarding_fee(label.required);
                let required = match label.required.checked_add(fee) {
                    Some(required) => required,
                    None => continue,
                };
                let carried = if prev == source { required } else { label.required };
                if !channel.can_forward(prev, carried) {
                    continue;
                }

                let mut path = Vec::with_capacity(label.path.len() + 1);
                path.push(prev.to_string());
                path.extend(label.path.iter().cloned());
                let candidate = Label { required, hops: label.hops + 1, path };

                let improves = best.get(prev).map_or(true, |current| candidate < *current);
                if improves {
                    best.insert(prev, candidate.clone());
                    queue.push(Reverse(candidate));
                }
            }
        }

        let label = match found {
            Some(label) => label,
            None => {
                debug!("No route {} -> {} for {} sat", source, destination, amount);
                return Err(no_route());
            }
        };

        let route = self.build_route(&label.path, amount).ok_or_else(no_route)?;
        debug!("Route {} for {} sat: {} hops, total fee {}",
               route.node_path().join(" -> "), amount, route.hop_count(), route.total_fee());
        Ok(route)
    }

    // Turn a node sequence into hops, walking back from the destination
    fn build_route(&self, path: &[NodeId], amount: u64) -> Option<Route> {
        let mut hops = Vec::with_capacity(path.len().saturating_sub(1));
        let mut delivered = amount;

        for i in (0..path.len() - 1).rev() {
            let channel_id = self.channel_between(&path[i], &path[i + 1])?;
            let fee = self.channels[channel_id.0].forwarding_fee(delivered);
            let with_fee = delivered.checked_add(fee)?;
            hops.push(Hop {
                channel: channel_id,
                from: path[i].clone(),
                to: path[i + 1].clone(),
                amount: if i == 0 { with_fee } else { delivered },
                fee,
            });
            delivered = with_fee;
        }
        hops.reverse();

        Some(Route {
            source: path.first()?.clone(),
            destination: path.last()?.clone(),
            amount,
            hops,
        })
    }
}
