// Payment channels: split balances and forwarding fee policy

use std::fmt;

use serde::{Deserialize, Serialize};

pub type NodeId = String;

pub const PPM_SCALE: u64 = 1_000_000;

// Index of a channel inside the owning Network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub usize);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chan{}", self.0)
    }
}

// Which end of a channel a node sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

/// Forwarding fee charged for moving an amount across a channel.
///
/// The proportional part is stored as parts-per-million so that fee
/// computation is exact integer arithmetic and simulations replay
/// identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    pub base_fee: u64,
    pub fee_rate_ppm: u64,
}

impl FeePolicy {
    /// Build a policy from a proportional rate such as `0.001`.
    /// Returns `None` for negative, NaN or infinite rates.
    pub fn from_rate(base_fee: u64, fee_rate: f64) -> Option<Self> {
        let fee_rate_ppm = rate_to_ppm(fee_rate)?;
        Some(FeePolicy { base_fee, fee_rate_ppm })
    }

    pub fn fee_rate(&self) -> f64 {
        self.fee_rate_ppm as f64 / PPM_SCALE as f64
    }

    // base_fee + floor(amount * rate), saturating at u64::MAX
    pub fn fee(&self, amount: u64) -> u64 {
        let proportional = (amount as u128 * self.fee_rate_ppm as u128) / PPM_SCALE as u128;
        let total = self.base_fee as u128 + proportional;
        u64::try_from(total).unwrap_or(u64::MAX)
    }
}

pub(crate) fn rate_to_ppm(fee_rate: f64) -> Option<u64> {
    if !fee_rate.is_finite() || fee_rate < 0.0 {
        return None;
    }
    let ppm = (fee_rate * PPM_SCALE as f64).round();
    if ppm > u64::MAX as f64 {
        return None;
    }
    Some(ppm as u64)
}

// Represent a channel between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub node_a: NodeId,
    pub node_b: NodeId,
    capacity: u64,
    balance_a: u64,
    balance_b: u64,
    policy: FeePolicy,
    fee_earned: u64,
}

impl Channel {
    // Callers must have checked balance_a + balance_b == capacity
    pub(crate) fn new(id: ChannelId,
                      node_a: &str,
                      node_b: &str,
                      balance_a: u64,
                      balance_b: u64,
                      policy: FeePolicy) -> Self {
        Channel {
            id,
            node_a: node_a.to_string(),
            node_b: node_b.to_string(),
            capacity: balance_a + balance_b,
            balance_a,
            balance_b,
            policy,
            fee_earned: 0,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn balance_a(&self) -> u64 {
        self.balance_a
    }

    pub fn balance_b(&self) -> u64 {
        self.balance_b
    }

    pub fn fee_policy(&self) -> FeePolicy {
        self.policy
    }

    /// Total fees credited to this channel by settled payments.
    pub fn fee_earned(&self) -> u64 {
        self.fee_earned
    }

    pub fn side_of(&self, node: &str) -> Option<Side> {
        if node == self.node_a {
            Some(Side::A)
        } else if node == self.node_b {
            Some(Side::B)
        } else {
            None
        }
    }

    pub fn node_on(&self, side: Side) -> &str {
        match side {
            Side::A => &self.node_a,
            Side::B => &self.node_b,
        }
    }

    pub fn other_node(&self, node: &str) -> Option<&str> {
        self.side_of(node).map(|side| self.node_on(side.opposite()))
    }

    pub fn balance_on(&self, side: Side) -> u64 {
        match side {
            Side::A => self.balance_a,
            Side::B => self.balance_b,
        }
    }

    pub fn balance_of(&self, node: &str) -> Option<u64> {
        self.side_of(node).map(|side| self.balance_on(side))
    }

    pub fn forwarding_fee(&self, amount: u64) -> u64 {
        self.policy.fee(amount)
    }

    // Only the sending side's balance bounds what can move in a direction
    pub fn can_forward(&self, from: &str, amount: u64) -> bool {
        self.balance_of(from).is_some_and(|balance| balance >= amount)
    }

    pub(crate) fn set_policy(&mut self, policy: FeePolicy) {
        self.policy = policy;
    }

    // Settlement validates liquidity before calling this
    pub(crate) fn transfer(&mut self, from: Side, amount: u64) {
        debug_assert!(self.balance_on(from) >= amount);
        match from {
            Side::A => {
                self.balance_a -= amount;
                self.balance_b += amount;
            }
            Side::B => {
                self.balance_b -= amount;
                self.balance_a += amount;
            }
        }
        debug_assert_eq!(self.balance_a + self.balance_b, self.capacity);
    }

    pub(crate) fn credit_fee(&mut self, fee: u64) {
        self.fee_earned = self.fee_earned.saturating_add(fee);
    }

    pub(crate) fn restore_state(&mut self, balance_a: u64, policy: FeePolicy, fee_earned: u64) {
        self.balance_a = balance_a;
        self.balance_b = self.capacity - balance_a;
        self.policy = policy;
        self.fee_earned = fee_earned;
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} <-> {}, capacity={}, balance_a={}, balance_b={}, base_fee={}, fee_rate={}, fee_earned={})",
               self.id, self.node_a, self.node_b, self.capacity, self.balance_a, self.balance_b,
               self.policy.base_fee, self.policy.fee_rate(), self.fee_earned)
    }
}
