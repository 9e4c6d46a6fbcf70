//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Report generation errors
//! - 5xxx: Remote delivery errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,

    // ==================== 4xxx: Report ====================
    /// No EOD snapshot for the requested store/date (closing not run)
    DataNotReady = 4001,
    /// Snapshot values cannot be rendered into the fixed format
    ReportFormatError = 4002,
    /// Batch log not found for the requested store/date
    BatchNotFound = 4003,

    // ==================== 5xxx: Delivery ====================
    /// Remote share / SFTP server unreachable (ECANCELED / ETIMEDOUT)
    RemoteUnreachable = 5001,
    /// Remote artifact claimed by a sibling terminal
    RemoteBusy = 5002,
    /// Remote transfer failed (auth, path, protocol)
    RemoteTransferFailed = 5003,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9005,
    /// Local artifact could not be written
    FileStorageFailed = 9401,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// 是否可由后台重试 (瞬时远程错误)
    #[inline]
    pub const fn is_transient(&self) -> bool {
        matches!(self, ErrorCode::RemoteUnreachable | ErrorCode::RemoteBusy)
    }

    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",

            // Report
            ErrorCode::DataNotReady => "No EOD data yet, please run closing first",
            ErrorCode::ReportFormatError => "Report data cannot be formatted",
            ErrorCode::BatchNotFound => "Batch log not found",

            // Delivery
            ErrorCode::RemoteUnreachable => "Remote server is unreachable",
            ErrorCode::RemoteBusy => "Remote file is being updated by another terminal",
            ErrorCode::RemoteTransferFailed => "Remote transfer failed",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::FileStorageFailed => "Failed to write report file",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when a u16 does not map to a known [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),

            // Report
            4001 => Ok(ErrorCode::DataNotReady),
            4002 => Ok(ErrorCode::ReportFormatError),
            4003 => Ok(ErrorCode::BatchNotFound),

            // Delivery
            5001 => Ok(ErrorCode::RemoteUnreachable),
            5002 => Ok(ErrorCode::RemoteBusy),
            5003 => Ok(ErrorCode::RemoteTransferFailed),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9005 => Ok(ErrorCode::ConfigError),
            9401 => Ok(ErrorCode::FileStorageFailed),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}
