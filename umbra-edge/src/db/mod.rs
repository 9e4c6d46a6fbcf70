//! Database Module
//!
//! redb-backed storage for the accreditation pipeline: EOD snapshots,
//! transaction history, the sequence ledger, the delivery log,
//! contribution markers and the drain lease.
//!
//! Values are JSON encoded; keys are tuples so per-store scans are range
//! queries.

mod delivery;
mod lease;
mod ledger;
mod snapshot;

pub use delivery::ContributionLocation;
pub use lease::DrainLease;

use redb::{Database, TableDefinition, WriteTransaction};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// EOD snapshots: (store_code, date) -> JSON
pub(crate) const EOD_SNAPSHOTS_TABLE: TableDefinition<(&str, &str), &[u8]> =
    TableDefinition::new("eod_snapshots");

/// Transaction history: (store_code, si_number) -> JSON
pub(crate) const TRANSACTIONS_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("transactions");

/// Hour ranges: (store_code, date, hour) -> JSON
pub(crate) const HOUR_RANGES_TABLE: TableDefinition<(&str, &str, u8), &[u8]> =
    TableDefinition::new("hour_ranges");

/// Batch logs: (store_code, date) -> JSON
pub(crate) const BATCH_LOGS_TABLE: TableDefinition<(&str, &str), &[u8]> =
    TableDefinition::new("batch_logs");

/// Delivery records: id -> JSON
pub(crate) const DELIVERIES_TABLE: TableDefinition<i64, &[u8]> =
    TableDefinition::new("deliveries");

/// Index: unsent delivery ids
pub(crate) const UNSENT_DELIVERIES_TABLE: TableDefinition<i64, ()> =
    TableDefinition::new("deliveries_unsent");

/// Contribution markers: (artifact, location, terminal) -> recorded_at millis
pub(crate) const CONTRIBUTIONS_TABLE: TableDefinition<(&str, &str, u16), i64> =
    TableDefinition::new("contributions");

/// Counters: name -> last value
pub(crate) const COUNTERS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("counters");

/// Leases: name -> JSON
pub(crate) const LEASES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("leases");

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for shared::error::AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Duplicate(what) => shared::error::AppError::already_exists(what),
            StorageError::NotFound(what) => shared::error::AppError::not_found(what),
            other => shared::error::AppError::database(other.to_string()),
        }
    }
}

/// Report pipeline storage
#[derive(Clone)]
pub struct ReportStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for ReportStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportStorage").finish_non_exhaustive()
    }
}

impl ReportStorage {
    /// Open or create database
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db =
            Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Initialize tables
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(EOD_SNAPSHOTS_TABLE)?;
            let _ = write_txn.open_table(TRANSACTIONS_TABLE)?;
            let _ = write_txn.open_table(HOUR_RANGES_TABLE)?;
            let _ = write_txn.open_table(BATCH_LOGS_TABLE)?;
            let _ = write_txn.open_table(DELIVERIES_TABLE)?;
            let _ = write_txn.open_table(UNSENT_DELIVERIES_TABLE)?;
            let _ = write_txn.open_table(CONTRIBUTIONS_TABLE)?;
            let _ = write_txn.open_table(COUNTERS_TABLE)?;
            let _ = write_txn.open_table(LEASES_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }
}

/// ISO date key (`YYYY-MM-DD`), sorts chronologically
pub(crate) fn date_key(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
