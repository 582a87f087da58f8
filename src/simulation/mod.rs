pub mod network_generator;
pub mod transaction_generator;
pub mod transaction_manager;

pub use network_generator::{GeneratorError, NetworkGenerator};
pub use transaction_generator::TransactionGenerator;
pub use transaction_manager::{
    FailureReason, OutcomeStatus, SimulationSummary, Transaction, TransactionError, TransactionManager,
    TransactionOutcome,
};
