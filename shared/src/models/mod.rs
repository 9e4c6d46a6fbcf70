//! Data models
//!
//! Shared between umbra-edge and its API clients.
//! Persisted rows are stored as JSON values in redb tables.

pub mod delivery;
pub mod eod;
pub mod ledger;
pub mod store;

// Re-exports
pub use delivery::*;
pub use eod::*;
pub use ledger::*;
pub use store::*;
