//! Sequence ledger models (序号账本)

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transaction-number range allocated to one clock hour of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourRange {
    pub date: NaiveDate,
    pub hour: u8,
    pub start: u64,
    pub end: u64,
}

impl HourRange {
    /// Number of transaction numbers in the range
    pub fn len(&self) -> u64 {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

/// Reprint kind recorded against a batch log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReprintKind {
    Receipt,
    Refund,
    Void,
    ZRead,
}

/// Append-only reprint event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReprintEvent {
    pub kind: ReprintKind,
    pub si_number: u64,
    pub amount: Decimal,
}

/// Batch log of one (store_code, date)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchLog {
    pub store_code: String,
    pub date: NaiveDate,
    /// Number used by the next generation
    pub batch_number: u32,
    #[serde(default)]
    pub reprints: Vec<ReprintEvent>,
}

impl BatchLog {
    pub fn new(store_code: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            store_code: store_code.into(),
            date,
            batch_number: 1,
            reprints: Vec::new(),
        }
    }
}
