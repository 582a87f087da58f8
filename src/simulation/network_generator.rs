// Helper for generating random channel networks

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::models::{Network, NetworkError};

pub const MIN_CAPACITY: u64 = 1_000_000;
pub const MAX_CAPACITY: u64 = 1_000_000_000;
pub const MAX_BASE_FEE: u64 = 2_000;
pub const MAX_FEE_RATE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeneratorError {
    #[error("Edge probability must be in (0, 1], got {0}")]
    InvalidEdgeProbability(f64),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

// Network generator for simulations
pub struct NetworkGenerator {
    pub rng: StdRng,
}

impl NetworkGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        NetworkGenerator { rng }
    }

    /// Create a random topology over nodes "0".."n-1" where each pair of
    /// nodes gets a channel with probability `edge_probability`.
    ///
    /// Capacities are uniform in [MIN_CAPACITY, MAX_CAPACITY] with a random
    /// split between the two sides, base fees uniform up to MAX_BASE_FEE and
    /// fee rates Beta(3, 3) scaled to MAX_FEE_RATE.
    pub fn random_network(&mut self, node_count: usize, edge_probability: f64) -> Result<Network, GeneratorError> {
        if !(edge_probability > 0.0 && edge_probability <= 1.0) {
            return Err(GeneratorError::InvalidEdgeProbability(edge_probability));
        }

        let mut network = Network::new();
        for i in 0..node_count {
            network.add_node(&i.to_string())?;
        }

        for i in 0..node_count {
            for j in (i + 1)..node_count {
                if self.rng.random::<f64>() < edge_probability {
                    let capacity = self.rng.random_range(MIN_CAPACITY..=MAX_CAPACITY);
                    let balance_a = self.rng.random_range(0..=capacity);
                    let base_fee = self.rng.random_range(0..=MAX_BASE_FEE);
                    let fee_rate = self.beta_3_3() * MAX_FEE_RATE;

                    network.add_channel(&i.to_string(), &j.to_string(), capacity,
                                        balance_a, capacity - balance_a, base_fee, fee_rate)?;
                }
            }
        }

        info!("Created network: {} nodes, {} channels", network.node_count(), network.channel_count());

        Ok(network)
    }

    // The median of five uniforms is Beta(3, 3) distributed
    fn beta_3_3(&mut self) -> f64 {
        let mut samples = [0.0f64; 5];
        for sample in samples.iter_mut() {
            *sample = self.rng.random::<f64>();
        }
        samples.sort_by(f64::total_cmp);
        samples[2]
    }
}
