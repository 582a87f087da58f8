// Error types for network construction, routing and settlement

use thiserror::Error;

use crate::models::channel::ChannelId;

// Topology errors. These indicate a setup bug and abort construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("Node {0} already exists in the network")]
    DuplicateNode(String),

    #[error("Node {0} is not part of the network")]
    UnknownNode(String),

    #[error("Invalid channel {node_a} <-> {node_b}: {reason}")]
    InvalidChannel {
        node_a: String,
        node_b: String,
        reason: String,
    },

    #[error("A channel between {node_a} and {node_b} already exists")]
    DuplicateChannel { node_a: String, node_b: String },

    #[error("Channel {0} does not exist")]
    UnknownChannel(ChannelId),

    #[error("Invalid fee policy: {0}")]
    InvalidFeePolicy(String),

    #[error("Snapshot covers {expected} channels but the network has {actual}")]
    SnapshotMismatch { expected: usize, actual: usize },
}

// Routing failures. Expected outcomes of normal operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("No route from {source_node} to {destination} can carry {amount} sat")]
    NoRoute {
        source_node: String,
        destination: String,
        amount: u64,
    },

    #[error("Node {0} is not part of the network")]
    UnknownNode(String),

    #[error("Payment amount must be strictly positive")]
    InvalidAmount,
}

// Settlement failures. A failed payment never mutates any channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("Insufficient liquidity on channel {channel}: {required} sat required, {available} sat available")]
    InsufficientLiquidity {
        channel: ChannelId,
        required: u64,
        available: u64,
    },

    #[error("Invalid route: {0}")]
    InvalidRoute(String),
}
