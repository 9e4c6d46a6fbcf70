//! Artifact 报表文件层
//!
//! ```text
//! Contribution ──► merge (纯函数, 结构化判断是否已包含)
//!                    │
//!        ┌───────────┴────────────┐
//!        ▼                        ▼
//! LocalArtifactStore        remote::merge_remote
//! (本地磁盘 + 贡献标记)      (远程读-合并-写, 加锁)
//! ```

pub mod merge;
pub mod remote;
mod store;

pub use merge::{MergeOutcome, extract_contribution, merge};
pub use remote::{RemoteLock, merge_remote};
pub use store::LocalArtifactStore;

use shared::error::AppError;
use shared::models::ArtifactKind;
use thiserror::Error;

use crate::db::StorageError;
use crate::report::{daily, hourly, sheet};

/// How one terminal's contribution lands in a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDiscipline {
    /// Rows keyed by their last column (terminal number)
    RowAppend,
    /// One value column per terminal, keyed by the `TER_NO` row
    ColumnInsert,
    /// Whole-file replace; file is per terminal and batch
    Replace,
}

/// File layout of an artifact kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactSchema {
    pub discipline: WriteDiscipline,
    /// CSV header for row-append, row labels for column-insert
    pub header: &'static [&'static str],
    /// Prefix new files with a UTF-8 byte-order mark
    pub bom: bool,
}

impl ArtifactSchema {
    pub fn for_kind(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::AyalaHourly => Self {
                discipline: WriteDiscipline::RowAppend,
                header: &hourly::HOURLY_HEADER,
                bom: true,
            },
            ArtifactKind::AyalaDaily => Self {
                discipline: WriteDiscipline::RowAppend,
                header: &daily::DAILY_HEADER,
                bom: true,
            },
            ArtifactKind::AyalaSheet => Self {
                discipline: WriteDiscipline::ColumnInsert,
                header: &sheet::SHEET_LABELS,
                bom: true,
            },
            ArtifactKind::AyalaZRead | ArtifactKind::RobinsonBatch => Self {
                discipline: WriteDiscipline::Replace,
                header: &[],
                bom: false,
            },
        }
    }
}

/// One terminal's share of an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contribution {
    Rows { key: String, rows: Vec<Vec<String>> },
    Column { key: String, values: Vec<String> },
    Whole { key: String, bytes: Vec<u8> },
}

impl Contribution {
    /// Idempotency key: the rendered terminal number
    pub fn key(&self) -> &str {
        match self {
            Contribution::Rows { key, .. }
            | Contribution::Column { key, .. }
            | Contribution::Whole { key, .. } => key,
        }
    }

    pub fn discipline(&self) -> WriteDiscipline {
        match self {
            Contribution::Rows { .. } => WriteDiscipline::RowAppend,
            Contribution::Column { .. } => WriteDiscipline::ColumnInsert,
            Contribution::Whole { .. } => WriteDiscipline::Replace,
        }
    }
}

/// What a write did
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    Created,
    Merged,
    /// Contribution already present; nothing written
    Skipped,
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed artifact: {0}")]
    Malformed(String),

    #[error("Contribution does not match {0:?} schema")]
    SchemaMismatch(WriteDiscipline),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ArtifactResult<T> = Result<T, ArtifactError>;

impl ArtifactError {
    pub fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
}

impl From<ArtifactError> for AppError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::Storage(e) => e.into(),
            ArtifactError::Io { .. } => AppError::file_storage(err.to_string()),
            _ => AppError::report_format(err.to_string()),
        }
    }
}
