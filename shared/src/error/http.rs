//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound | Self::BatchNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict (closing must run first; not retryable by the client)
            Self::AlreadyExists | Self::DataNotReady => StatusCode::CONFLICT,

            // 503 Service Unavailable (transient, retried in background)
            Self::RemoteUnreachable | Self::RemoteBusy => StatusCode::SERVICE_UNAVAILABLE,

            // 502 Bad Gateway
            Self::RemoteTransferFailed => StatusCode::BAD_GATEWAY,

            // 500 Internal Server Error
            Self::Unknown
            | Self::ReportFormatError
            | Self::InternalError
            | Self::DatabaseError
            | Self::ConfigError
            | Self::FileStorageFailed => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request
            Self::ValidationFailed | Self::InvalidRequest | Self::InvalidFormat => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}
