//! Report Builders (报表构建)
//!
//! Pure functions turning an [`EodSnapshot`] plus static [`StoreSettings`]
//! into the fixed-schema records each mall requires. Nothing here touches
//! disk or network; the artifact layer decides how records land in files.

pub mod daily;
pub mod hourly;
pub mod money;
pub mod naming;
pub mod robinson;
pub mod sheet;
pub mod zread;

use chrono::NaiveDate;
use shared::error::{AppError, ErrorCode};
use shared::models::EodSnapshot;
use thiserror::Error;

pub use money::{format_money, round_money};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("EOD snapshot not found for {store_code} on {date}")]
    DataNotReady { store_code: String, date: NaiveDate },

    #[error("Field {field:02} value '{value}' exceeds {width} characters")]
    FieldOverflow {
        field: u8,
        value: String,
        width: usize,
    },
}

pub type ReportResult<T> = Result<T, ReportError>;

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::DataNotReady { store_code, date } => {
                AppError::data_not_ready(store_code, date.to_string())
            }
            ReportError::FieldOverflow { field, .. } => {
                AppError::with_message(ErrorCode::ReportFormatError, err.to_string())
                    .with_detail("field", field)
            }
        }
    }
}

/// Gate every builder on snapshot existence
pub fn require_snapshot(
    snapshot: Option<EodSnapshot>,
    store_code: &str,
    date: NaiveDate,
) -> ReportResult<EodSnapshot> {
    snapshot.ok_or_else(|| ReportError::DataNotReady {
        store_code: store_code.to_string(),
        date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_snapshot_is_data_not_ready() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let err = require_snapshot(None, "STORE01", date).unwrap_err();
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::DataNotReady);
        assert!(!app.is_retryable());
    }
}
