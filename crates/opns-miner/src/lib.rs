//! Runtime for the OpNS domain miner.
//!
//! This crate provides:
//! - Parallel proof-of-work search
//! - The funding queue and the funding and fee engine
//! - Indexer access for ancestors, broadcast and unspent outputs
//! - The domain mining state machine and balance reconciliation

pub mod api;
pub mod balance;
pub mod config;
pub mod error;
pub mod funding;
pub mod miner;
pub mod pending;
pub mod pow;
pub mod queue;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{AncestorOutput, HttpIndexer, Indexer, Txo};
pub use balance::refresh_balance;
pub use error::{Error, MineDomainError, Result};
pub use funding::{FundingContext, FundingEngine};
pub use miner::DomainMiner;
pub use pending::{CovenantUnlocker, PendingTransaction};
pub use pow::{PowEngine, PowResult};
pub use queue::{FileQueue, FundingEntry, FundingQueue, MemoryQueue};
pub use state::{MiningStats, PowReport};

/// Get the library version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
