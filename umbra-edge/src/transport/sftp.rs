//! SFTP 适配器 (Robinson)
//!
//! Mall servers run old SSH stacks, so the session offers a broad legacy
//! KEX/cipher/MAC list. Password authentication only.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::{Disconnect, Preferred, cipher, kex, mac};
use russh_sftp::client::SftpSession;
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::protocol::{OpenFlags, StatusCode};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

use super::{RemoteSyncClient, TransportError, TransportResult, UnreachableCode};
use crate::core::config::SftpConfig;

const LEGACY_KEX: &[kex::Name] = &[
    kex::CURVE25519,
    kex::DH_G14_SHA256,
    kex::DH_G14_SHA1,
    kex::DH_G1_SHA1,
];

const LEGACY_CIPHERS: &[cipher::Name] = &[
    cipher::CHACHA20_POLY1305,
    cipher::AES_256_GCM,
    cipher::AES_256_CTR,
    cipher::AES_192_CTR,
    cipher::AES_128_CTR,
    cipher::AES_256_CBC,
    cipher::AES_192_CBC,
    cipher::AES_128_CBC,
    cipher::TRIPLE_DES_CBC,
];

const LEGACY_MACS: &[mac::Name] = &[
    mac::HMAC_SHA256,
    mac::HMAC_SHA512,
    mac::HMAC_SHA1,
    mac::HMAC_SHA256_ETM,
];

/// Algorithm preferences accepted by legacy mall servers
fn legacy_preferred() -> Preferred {
    Preferred {
        kex: Cow::Borrowed(LEGACY_KEX),
        cipher: Cow::Borrowed(LEGACY_CIPHERS),
        mac: Cow::Borrowed(LEGACY_MACS),
        ..Preferred::default()
    }
}

/// Host keys of mall servers are not pinned
struct AcceptingHandler;

#[async_trait]
impl client::Handler for AcceptingHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh_keys::key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

fn ssh_error(err: russh::Error) -> TransportError {
    match err {
        russh::Error::ConnectionTimeout => {
            TransportError::unreachable(UnreachableCode::TimedOut, "ssh connection timed out")
        }
        russh::Error::IO(io) => match TransportError::from_io(io, "ssh") {
            unreachable @ TransportError::Unreachable { .. } => unreachable,
            other => TransportError::unreachable(UnreachableCode::Canceled, other.to_string()),
        },
        russh::Error::Disconnect | russh::Error::HUP => {
            TransportError::unreachable(UnreachableCode::Canceled, err.to_string())
        }
        other => TransportError::fatal(other),
    }
}

fn sftp_error(err: SftpError, path: &str) -> TransportError {
    match &err {
        SftpError::Status(status) if status.status_code == StatusCode::NoSuchFile => {
            TransportError::NotFound(path.to_string())
        }
        SftpError::Timeout => {
            TransportError::unreachable(UnreachableCode::TimedOut, format!("{path}: {err}"))
        }
        _ => TransportError::Fatal(format!("{path}: {err}")),
    }
}

pub struct SftpClient {
    config: SftpConfig,
    handle: Mutex<Option<Handle<AcceptingHandler>>>,
    session: RwLock<Option<Arc<SftpSession>>>,
}

impl std::fmt::Debug for SftpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpClient")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("root_path", &self.config.root_path)
            .finish_non_exhaustive()
    }
}

impl SftpClient {
    pub fn new(config: SftpConfig) -> Self {
        Self {
            config,
            handle: Mutex::new(None),
            session: RwLock::new(None),
        }
    }

    /// Absolute remote path under the configured root
    pub fn full_path(&self, path: &[String]) -> String {
        let root = self.config.root_path.trim_end_matches('/');
        if path.is_empty() {
            return if root.is_empty() { "/".to_string() } else { root.to_string() };
        }
        format!("{}/{}", root, path.join("/"))
    }

    async fn session(&self) -> TransportResult<Arc<SftpSession>> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(TransportError::NotConnected)
    }
}

#[async_trait]
impl RemoteSyncClient for SftpClient {
    fn protocol(&self) -> &'static str {
        "sftp"
    }

    async fn connect(&self) -> TransportResult<()> {
        let config = Arc::new(client::Config {
            preferred: legacy_preferred(),
            ..Default::default()
        });

        tracing::debug!(host = %self.config.host, port = self.config.port, "Opening SFTP session");
        let mut handle = client::connect(
            config,
            (self.config.host.as_str(), self.config.port),
            AcceptingHandler,
        )
        .await
        .map_err(ssh_error)?;

        let accepted = handle
            .authenticate_password(&self.config.username, &self.config.password)
            .await
            .map_err(ssh_error)?;
        if !accepted {
            return Err(TransportError::Fatal(format!(
                "password rejected for {}@{}",
                self.config.username, self.config.host
            )));
        }

        let channel = handle.channel_open_session().await.map_err(ssh_error)?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(ssh_error)?;
        let session = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| sftp_error(e, "sftp subsystem"))?;

        *self.session.write().await = Some(Arc::new(session));
        *self.handle.lock().await = Some(handle);
        Ok(())
    }

    async fn ensure_path(&self, segments: &[String]) -> TransportResult<()> {
        let session = self.session().await?;
        for depth in 1..=segments.len() {
            let dir = self.full_path(&segments[..depth]);
            if session
                .try_exists(dir.as_str())
                .await
                .map_err(|e| sftp_error(e, &dir))?
            {
                continue;
            }
            session
                .create_dir(dir.as_str())
                .await
                .map_err(|e| sftp_error(e, &dir))?;
        }
        Ok(())
    }

    async fn exists(&self, path: &[String]) -> TransportResult<bool> {
        let full = self.full_path(path);
        self.session()
            .await?
            .try_exists(full.as_str())
            .await
            .map_err(|e| sftp_error(e, &full))
    }

    async fn read_file(&self, path: &[String]) -> TransportResult<Vec<u8>> {
        let full = self.full_path(path);
        self.session()
            .await?
            .read(full.as_str())
            .await
            .map_err(|e| sftp_error(e, &full))
    }

    async fn write_file(&self, path: &[String], bytes: &[u8]) -> TransportResult<()> {
        let full = self.full_path(path);
        let session = self.session().await?;
        let mut file = session
            .open_with_flags(
                full.as_str(),
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await
            .map_err(|e| sftp_error(e, &full))?;
        file.write_all(bytes)
            .await
            .map_err(|e| TransportError::Fatal(format!("{full}: {e}")))?;
        file.shutdown()
            .await
            .map_err(|e| TransportError::Fatal(format!("{full}: {e}")))
    }

    async fn create_exclusive(&self, path: &[String], bytes: &[u8]) -> TransportResult<()> {
        let full = self.full_path(path);
        let session = self.session().await?;
        let mut file = session
            .open_with_flags(
                full.as_str(),
                OpenFlags::CREATE | OpenFlags::EXCLUDE | OpenFlags::WRITE,
            )
            .await
            .map_err(|e| match e {
                SftpError::Status(status) if status.status_code == StatusCode::Failure => {
                    TransportError::AlreadyExists(full.clone())
                }
                other => sftp_error(other, &full),
            })?;
        file.write_all(bytes)
            .await
            .map_err(|e| TransportError::Fatal(format!("{full}: {e}")))?;
        file.shutdown()
            .await
            .map_err(|e| TransportError::Fatal(format!("{full}: {e}")))
    }

    async fn remove_file(&self, path: &[String]) -> TransportResult<()> {
        let full = self.full_path(path);
        self.session()
            .await?
            .remove_file(full.as_str())
            .await
            .map_err(|e| sftp_error(e, &full))
    }

    async fn modified_at(&self, path: &[String]) -> TransportResult<Option<i64>> {
        let full = self.full_path(path);
        let attrs = self
            .session()
            .await?
            .metadata(full.as_str())
            .await
            .map_err(|e| sftp_error(e, &full))?;
        Ok(attrs.mtime.map(|secs| i64::from(secs) * 1000))
    }

    async fn close(&self) -> TransportResult<()> {
        if let Some(session) = self.session.write().await.take() {
            if let Err(e) = session.close().await {
                tracing::debug!(error = %e, "SFTP session close failed");
            }
        }
        if let Some(handle) = self.handle.lock().await.take() {
            handle
                .disconnect(Disconnect::ByApplication, "", "en")
                .await
                .map_err(ssh_error)?;
        }
        Ok(())
    }
}
