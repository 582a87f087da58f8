// Sweep one channel's fee rate and replay the same transactions each time

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ChannelId, Network, NetworkError, NodeId};
use crate::simulation::{SimulationSummary, TransactionError, TransactionManager};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SweepError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Invalid transaction #{index}: {source}")]
    Transaction {
        index: usize,
        #[source]
        source: TransactionError,
    },
}

/// How balances carry between sweep iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    /// Every iteration starts from a copy of the base network.
    Fresh,
    /// One network is reused; only the target's fee rate changes between
    /// iterations and balances left by earlier iterations carry over.
    Cumulative,
}

// One row of sweep output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub iteration: usize,
    pub fee_rate: f64,
    pub successes: usize,
    pub failures: usize,
    pub total_fees: u64,
    pub average_fee: f64,
    // Fees credited to the target channel during this iteration
    pub channel_fee_earned: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeSweep {
    pub target: ChannelId,
    pub rates: Vec<f64>,
    pub mode: SweepMode,
}

impl FeeSweep {
    // Evenly spaced rates from 0 to max_rate inclusive, rounded to 6 decimals
    pub fn linear(target: ChannelId, iterations: usize, max_rate: f64, mode: SweepMode) -> Self {
        let rates = match iterations {
            0 => Vec::new(),
            1 => vec![0.0],
            n => (0..n)
                .map(|i| ((i as f64 / (n - 1) as f64) * max_rate * 1e6).round() / 1e6)
                .collect(),
        };
        FeeSweep { target, rates, mode }
    }

    pub fn run(&self, base: &Network, transactions: &[(NodeId, NodeId, u64)]) -> Result<Vec<SweepRow>, SweepError> {
        if base.channel(self.target).is_none() {
            return Err(NetworkError::UnknownChannel(self.target).into());
        }
        info!("Sweeping fee rate of {} over {} values ({:?} mode, {} transactions)",
              self.target, self.rates.len(), self.mode, transactions.len());

        match self.mode {
            SweepMode::Fresh => self.rates
                .par_iter()
                .enumerate()
                .map(|(i, &rate)| {
                    run_iteration(base.clone(), self.target, i + 1, rate, transactions).map(|(row, _)| row)
                })
                .collect(),
            SweepMode::Cumulative => {
                let mut network = base.clone();
                let mut rows = Vec::with_capacity(self.rates.len());
                for (i, &rate) in self.rates.iter().enumerate() {
                    let (row, next) = run_iteration(network, self.target, i + 1, rate, transactions)?;
                    rows.push(row);
                    network = next;
                }
                Ok(rows)
            }
        }
    }
}

fn run_iteration(mut network: Network,
                 target: ChannelId,
                 iteration: usize,
                 fee_rate: f64,
                 transactions: &[(NodeId, NodeId, u64)]) -> Result<(SweepRow, Network), SweepError> {
    network.set_fee_rate(target, fee_rate)?;
    let earned_before = network.channel(target).map_or(0, |c| c.fee_earned());

    let mut manager = TransactionManager::new(network);
    for (index, (from, to, amount)) in transactions.iter().enumerate() {
        manager.add_transaction(from, to, *amount)
            .map_err(|source| SweepError::Transaction { index, source })?;
    }
    manager.simulate();

    let summary = SimulationSummary::from_outcomes(manager.outcomes());
    let network = manager.into_network();
    let earned_after = network.channel(target).map_or(0, |c| c.fee_earned());

    let row = SweepRow {
        iteration,
        fee_rate,
        successes: summary.successes,
        failures: summary.failures,
        total_fees: summary.total_fees,
        average_fee: summary.average_fee,
        channel_fee_earned: earned_after - earned_before,
    };
    info!("Iteration {} | fee_rate={} | successes={} | failures={} | fee_earned={}",
          iteration, fee_rate, row.successes, row.failures, row.channel_fee_earned);

    Ok((row, network))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_network() -> (Network, ChannelId) {
        let mut network = Network::new();
        for id in ["A", "B", "C"] {
            network.add_node(id).unwrap();
        }
        let target = network.add_channel("A", "B", 100_000, 50_000, 50_000, 0, 0.0).unwrap();
        network.add_channel("B", "C", 100_000, 50_000, 50_000, 0, 0.0).unwrap();
        (network, target)
    }

    fn payments(n: usize, amount: u64) -> Vec<(NodeId, NodeId, u64)> {
        (0..n).map(|_| ("A".to_string(), "C".to_string(), amount)).collect()
    }

    #[test]
    fn test_linear_rates() {
        let sweep = FeeSweep::linear(ChannelId(0), 5, 0.5, SweepMode::Fresh);
        assert_eq!(sweep.rates, vec![0.0, 0.125, 0.25, 0.375, 0.5]);
        assert_eq!(FeeSweep::linear(ChannelId(0), 1, 0.5, SweepMode::Fresh).rates, vec![0.0]);
        assert!(FeeSweep::linear(ChannelId(0), 0, 0.5, SweepMode::Fresh).rates.is_empty());
    }

    #[test]
    fn test_fresh_iterations_are_independent() {
        let (network, target) = line_network();
        let sweep = FeeSweep { target, rates: vec![0.01, 0.01, 0.01], mode: SweepMode::Fresh };

        let rows = sweep.run(&network, &payments(2, 10_000)).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().map(|r| r.iteration).collect::<Vec<_>>(), vec![1, 2, 3]);
        // Same starting balances every time, so identical results
        assert_eq!(rows[0].successes, 2);
        assert!(rows.iter().all(|r| r.successes == rows[0].successes
            && r.channel_fee_earned == rows[0].channel_fee_earned));
        assert_eq!(rows[0].channel_fee_earned, 200);

        // Base network is untouched
        assert_eq!(network.channel(target).unwrap().balance_a(), 50_000);
    }

    #[test]
    fn test_cumulative_iterations_share_balances() {
        let (network, target) = line_network();
        let sweep = FeeSweep { target, rates: vec![0.0, 0.0, 0.0], mode: SweepMode::Cumulative };

        // Two 20_000 payments per iteration drain A's 50_000 after the second one
        let rows = sweep.run(&network, &payments(2, 20_000)).unwrap();
        assert_eq!(rows[0].successes, 2);
        assert_eq!(rows[1].successes, 0);
        assert_eq!(rows[2].successes, 0);
        assert_eq!(rows[1].failures, 2);
    }

    #[test]
    fn test_unknown_target() {
        let (network, _) = line_network();
        let sweep = FeeSweep::linear(ChannelId(99), 3, 0.1, SweepMode::Fresh);
        assert_eq!(sweep.run(&network, &[]).unwrap_err(),
                   SweepError::Network(NetworkError::UnknownChannel(ChannelId(99))));
    }

    #[test]
    fn test_invalid_transaction_aborts_sweep() {
        let (network, target) = line_network();
        let sweep = FeeSweep::linear(target, 2, 0.1, SweepMode::Cumulative);
        let transactions = vec![("A".to_string(), "C".to_string(), 0)];
        assert!(matches!(sweep.run(&network, &transactions), Err(SweepError::Transaction { index: 0, .. })));
    }
}
