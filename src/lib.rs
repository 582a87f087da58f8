pub mod config;
pub mod experiment;
pub mod models;
pub mod simulation;

pub use models::{Network, Route};
pub use simulation::TransactionManager;
