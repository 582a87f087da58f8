pub mod fee_sweep;
pub mod reporter;

pub use fee_sweep::{FeeSweep, SweepError, SweepMode, SweepRow};
pub use reporter::SweepReporter;
