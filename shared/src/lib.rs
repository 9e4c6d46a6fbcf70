//! Shared types for the Umbra POS edge node
//!
//! Domain models of the accreditation report pipeline (EOD snapshot,
//! sequence ledger, delivery log), the unified error system and small
//! utilities used by `umbra-edge` and its API clients.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use serde::{Deserialize, Serialize};
