// Queue of payment intents replayed against a network

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Network, NodeId};

// A payment intent. Immutable once queued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub source: NodeId,
    pub destination: NodeId,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("Transaction amount must be strictly positive")]
    InvalidAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NoRoute,
    InsufficientLiquidity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success { fee: u64, hops: usize },
    Failure { reason: FailureReason },
}

// What happened to one intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    pub transaction: Transaction,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl TransactionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success { .. })
    }

    // Realized fee, zero for failed payments
    pub fn fee(&self) -> u64 {
        match self.status {
            OutcomeStatus::Success { fee, .. } => fee,
            OutcomeStatus::Failure { .. } => 0,
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self.status {
            OutcomeStatus::Success { .. } => None,
            OutcomeStatus::Failure { reason } => Some(reason),
        }
    }
}

// Aggregate view of an outcome log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    pub no_route: usize,
    pub insufficient_liquidity: usize,
    pub total_fees: u64,
    pub average_fee: f64,
}

impl SimulationSummary {
    pub fn from_outcomes(outcomes: &[TransactionOutcome]) -> Self {
        let mut summary = SimulationSummary { total: outcomes.len(), ..Default::default() };

        for outcome in outcomes {
            match outcome.status {
                OutcomeStatus::Success { fee, .. } => {
                    summary.successes += 1;
                    summary.total_fees += fee;
                }
                OutcomeStatus::Failure { reason } => {
                    summary.failures += 1;
                    match reason {
                        FailureReason::NoRoute => summary.no_route += 1,
                        FailureReason::InsufficientLiquidity => summary.insufficient_liquidity += 1,
                    }
                }
            }
        }

        if summary.successes > 0 {
            summary.average_fee = summary.total_fees as f64 / summary.successes as f64;
        }
        summary
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successes as f64 / self.total as f64
        }
    }
}

/// Holds an ordered queue of payment intents and replays them against the
/// network it owns. Owning the network makes the manager its only writer,
/// so settlements are applied strictly one after another.
#[derive(Debug, Clone)]
pub struct TransactionManager {
    network: Network,
    queue: Vec<Transaction>,
    log: Vec<TransactionOutcome>,
    next_id: u64,
}

impl TransactionManager {
    pub fn new(network: Network) -> Self {
        TransactionManager {
            network,
            queue: Vec::new(),
            log: Vec::new(),
            next_id: 0,
        }
    }

    // Queue a payment. Liquidity is not checked here.
    pub fn add_transaction(&mut self, source: &str, destination: &str, amount: u64) -> Result<u64, TransactionError> {
        if amount == 0 {
            warn!("Rejected zero-amount transaction {} -> {}", source, destination);
            return Err(TransactionError::InvalidAmount);
        }

        let id = self.next_id;
        self.next_id += 1;
        self.queue.push(Transaction {
            id,
            source: source.to_string(),
            destination: destination.to_string(),
            amount,
        });
        Ok(id)
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.queue
    }

    // Outcome log of the last simulate() call
    pub fn outcomes(&self) -> &[TransactionOutcome] {
        &self.log
    }

    pub fn summary(&self) -> SimulationSummary {
        SimulationSummary::from_outcomes(&self.log)
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    /// Drain the queue in FIFO order, routing and settling each intent.
    ///
    /// Earlier payments change the liquidity seen by later ones, so the order
    /// is part of the result. Routing and settlement failures only fail their
    /// own intent; the log always has one entry per drained intent, in queue
    /// order.
    pub fn simulate(&mut self) -> &[TransactionOutcome] {
        self.log.clear();
        let queue = std::mem::take(&mut self.queue);
        info!("Simulating {} transactions", queue.len());

        for transaction in queue {
            let status = self.process(&transaction);
            self.log.push(TransactionOutcome { transaction, status });
        }

        let summary = self.summary();
        info!("Simulation complete: {}/{} succeeded, {} sat in fees",
              summary.successes, summary.total, summary.total_fees);
        &self.log
    }

    fn process(&mut self, transaction: &Transaction) -> OutcomeStatus {
        let route = match self.network.find_path(&transaction.source, &transaction.destination, transaction.amount) {
            Ok(route) => route,
            Err(err) => {
                debug!("Transaction {} failed: {}", transaction.id, err);
                return OutcomeStatus::Failure { reason: FailureReason::NoRoute };
            }
        };

        // Unreachable while routing and settlement run back to back; kept for
        // routes that go stale between the two
        match self.network.execute(&route) {
            Ok(settlement) => OutcomeStatus::Success { fee: settlement.total_fee, hops: settlement.hops },
            Err(err) => {
                debug!("Transaction {} failed: {}", transaction.id, err);
                OutcomeStatus::Failure { reason: FailureReason::InsufficientLiquidity }
            }
        }
    }
}
