//! Transport 远程同步传输层
//!
//! 所有商场投递都经过同一个 trait：
//! ```text
//!          ┌──────────────────────────┐
//!          │  RemoteSyncClient Trait  │  ◄── 可插拔接口
//!          └────────────┬─────────────┘
//!                       │
//!      ┌────────────────┼────────────────┐
//!      ▼                ▼                ▼
//!  SmbClient        SftpClient      MemoryClient
//!  (Ayala 共享目录)  (Robinson)      (测试 / 本地模式)
//! ```
//!
//! Paths are segment lists relative to the client's root; each adapter
//! joins them the way its protocol expects.

mod memory;
mod sftp;
mod smb;

pub use memory::{MemoryClient, MemoryRemote};
pub use sftp::SftpClient;
pub use smb::SmbClient;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::models::Mall;
use thiserror::Error;

use crate::core::config::{SftpConfig, SmbConfig};

/// Errno-style code carried by an unreachable failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreachableCode {
    /// Connection refused, reset or aborted
    Canceled,
    /// Connect or handshake exceeded the connect timeout
    TimedOut,
}

impl UnreachableCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnreachableCode::Canceled => "ECANCELED",
            UnreachableCode::TimedOut => "ETIMEDOUT",
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// Remote not reachable; transient
    #[error("Remote unreachable ({}): {message}", code.as_str())]
    Unreachable {
        code: UnreachableCode,
        message: String,
    },

    /// Artifact claimed by another terminal; transient
    #[error("Remote artifact busy: {0}")]
    Busy(String),

    /// Exclusive create lost the race
    #[error("Remote path already exists: {0}")]
    AlreadyExists(String),

    #[error("Remote path not found: {0}")]
    NotFound(String),

    #[error("Not connected")]
    NotConnected,

    /// Anything else for this attempt
    #[error("Remote transfer failed: {0}")]
    Fatal(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

impl TransportError {
    pub fn unreachable(code: UnreachableCode, message: impl Into<String>) -> Self {
        Self::Unreachable {
            code,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl ToString) -> Self {
        Self::Fatal(message.to_string())
    }

    /// Unreachable and Busy clear up on their own
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Busy(_))
    }

    /// Classify a local I/O failure against a mounted share
    pub fn from_io(err: std::io::Error, path: &str) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(path.to_string()),
            ErrorKind::AlreadyExists => Self::AlreadyExists(path.to_string()),
            ErrorKind::TimedOut => Self::unreachable(UnreachableCode::TimedOut, err.to_string()),
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::HostUnreachable
            | ErrorKind::NetworkUnreachable
            | ErrorKind::NetworkDown => {
                Self::unreachable(UnreachableCode::Canceled, err.to_string())
            }
            _ => Self::Fatal(format!("{path}: {err}")),
        }
    }
}

impl From<TransportError> for AppError {
    fn from(err: TransportError) -> Self {
        let code = match &err {
            TransportError::Unreachable { .. } | TransportError::NotConnected => {
                ErrorCode::RemoteUnreachable
            }
            TransportError::Busy(_) => ErrorCode::RemoteBusy,
            _ => ErrorCode::RemoteTransferFailed,
        };
        AppError::with_message(code, err.to_string())
    }
}

/// Remote file store of one mall
///
/// 所有实现都以 `&self` 操作，连接后可被多个并发投递共享。
#[async_trait]
pub trait RemoteSyncClient: Send + Sync + std::fmt::Debug {
    /// 协议名称 (日志用)
    fn protocol(&self) -> &'static str;

    /// 建立连接并探测根目录可达
    async fn connect(&self) -> TransportResult<()>;

    /// 逐级创建目录，已存在的忽略
    async fn ensure_path(&self, segments: &[String]) -> TransportResult<()>;

    async fn exists(&self, path: &[String]) -> TransportResult<bool>;

    async fn read_file(&self, path: &[String]) -> TransportResult<Vec<u8>>;

    /// 覆盖写入
    async fn write_file(&self, path: &[String], bytes: &[u8]) -> TransportResult<()>;

    /// 仅当不存在时创建；已存在返回 `AlreadyExists`
    async fn create_exclusive(&self, path: &[String], bytes: &[u8]) -> TransportResult<()>;

    async fn remove_file(&self, path: &[String]) -> TransportResult<()>;

    /// 最后修改时间 (毫秒)；后端不提供时为 `None`
    async fn modified_at(&self, _path: &[String]) -> TransportResult<Option<i64>> {
        Ok(None)
    }

    async fn close(&self) -> TransportResult<()>;
}

/// Connect bounded by `timeout`; elapsed maps to `ETIMEDOUT`
pub async fn connect_with_timeout(
    client: &dyn RemoteSyncClient,
    timeout: Duration,
) -> TransportResult<()> {
    match tokio::time::timeout(timeout, client.connect()).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::unreachable(
            UnreachableCode::TimedOut,
            format!("{} connect exceeded {}ms", client.protocol(), timeout.as_millis()),
        )),
    }
}

/// Hands out a fresh client per mall
pub trait TransportProvider: Send + Sync + std::fmt::Debug {
    fn client_for(&self, mall: Mall) -> Arc<dyn RemoteSyncClient>;
}

/// Provider backed by the configured SMB share and SFTP server
#[derive(Debug, Clone)]
pub struct ConfiguredTransports {
    smb: SmbConfig,
    sftp: SftpConfig,
}

impl ConfiguredTransports {
    pub fn new(smb: SmbConfig, sftp: SftpConfig) -> Self {
        Self { smb, sftp }
    }
}

impl TransportProvider for ConfiguredTransports {
    fn client_for(&self, mall: Mall) -> Arc<dyn RemoteSyncClient> {
        match mall {
            Mall::Ayala => Arc::new(SmbClient::new(self.smb.clone())),
            Mall::Robinson => Arc::new(SftpClient::new(self.sftp.clone())),
        }
    }
}

/// Provider handing out in-memory clients over shared remotes
#[derive(Debug, Clone, Default)]
pub struct MemoryTransports {
    pub ayala: MemoryRemote,
    pub robinson: MemoryRemote,
}

impl TransportProvider for MemoryTransports {
    fn client_for(&self, mall: Mall) -> Arc<dyn RemoteSyncClient> {
        match mall {
            Mall::Ayala => Arc::new(MemoryClient::new(self.ayala.clone())),
            Mall::Robinson => Arc::new(MemoryClient::new(self.robinson.clone())),
        }
    }
}
