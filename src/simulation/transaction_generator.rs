// Random payment intents for simulation runs

use rand::Rng;

use crate::models::NodeId;

pub const DEFAULT_MIN_AMOUNT: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionGenerator {
    pub max_amount: u64,
    pub count: usize,
    pub min_amount: u64,
}

impl TransactionGenerator {
    pub fn new(max_amount: u64, count: usize) -> Self {
        TransactionGenerator {
            max_amount,
            count,
            min_amount: DEFAULT_MIN_AMOUNT,
        }
    }

    pub fn with_min_amount(mut self, min_amount: u64) -> Self {
        self.min_amount = min_amount;
        self
    }

    /// Produce `count` `(source, destination, amount)` triples with distinct
    /// endpoints and an amount uniform in `[min_amount, max_amount]`.
    ///
    /// Fewer than two node ids or a zero `max_amount` yield no intents.
    /// A `min_amount` above `max_amount` is clamped down to it.
    pub fn generate<R: Rng>(&self, rng: &mut R, node_ids: &[NodeId]) -> Vec<(NodeId, NodeId, u64)> {
        if node_ids.len() < 2 || self.max_amount == 0 {
            return Vec::new();
        }

        let low = self.min_amount.clamp(1, self.max_amount);
        let mut transactions = Vec::with_capacity(self.count);

        for _ in 0..self.count {
            let from = rng.random_range(0..node_ids.len());
            // Pick from the remaining ids so the endpoints always differ
            let mut to = rng.random_range(0..node_ids.len() - 1);
            if to >= from {
                to += 1;
            }
            let amount = rng.random_range(low..=self.max_amount);
            transactions.push((node_ids[from].clone(), node_ids[to].clone(), amount));
        }

        transactions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ids(n: usize) -> Vec<NodeId> {
        (0..n).map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_generated_transactions_are_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        let generator = TransactionGenerator::new(100_000, 500);
        let node_ids = ids(10);

        let transactions = generator.generate(&mut rng, &node_ids);
        assert_eq!(transactions.len(), 500);

        for (from, to, amount) in &transactions {
            assert_ne!(from, to);
            assert!(node_ids.contains(from) && node_ids.contains(to));
            assert!((DEFAULT_MIN_AMOUNT..=100_000).contains(amount));
        }
    }

    #[test]
    fn test_same_seed_same_transactions() {
        let generator = TransactionGenerator::new(50_000, 100);
        let node_ids = ids(5);

        let first = generator.generate(&mut StdRng::seed_from_u64(42), &node_ids);
        let second = generator.generate(&mut StdRng::seed_from_u64(42), &node_ids);
        assert_eq!(first, second);
    }

    #[test]
    fn test_degenerate_inputs() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(TransactionGenerator::new(1_000, 10).generate(&mut rng, &ids(1)).is_empty());
        assert!(TransactionGenerator::new(0, 10).generate(&mut rng, &ids(3)).is_empty());

        // Small maximum clamps the lower bound
        let transactions = TransactionGenerator::new(10, 20).generate(&mut rng, &ids(2));
        assert!(transactions.iter().all(|(_, _, amount)| (1..=10).contains(amount)));
    }
}
