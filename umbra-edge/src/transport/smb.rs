//! SMB 共享目录适配器 (Ayala)
//!
//! The share is addressed through the OS: a UNC root `\\host\share` on
//! Windows, or a configured mount point elsewhere. Credentials belong to
//! the session that mounted the share; without a usable root every connect
//! fails as unreachable.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{RemoteSyncClient, TransportError, TransportResult, UnreachableCode};
use crate::core::config::SmbConfig;

#[derive(Debug)]
pub struct SmbClient {
    config: SmbConfig,
    connected: AtomicBool,
}

impl SmbClient {
    pub fn new(config: SmbConfig) -> Self {
        Self {
            config,
            connected: AtomicBool::new(false),
        }
    }

    /// Share root: the mount point if configured, else the UNC path (Windows)
    pub fn root(&self) -> TransportResult<PathBuf> {
        self.config.share_root().ok_or_else(|| {
            TransportError::unreachable(
                UnreachableCode::Canceled,
                "SMB share has no usable root; set SMB_MOUNT_ROOT",
            )
        })
    }

    fn resolve(&self, path: &[String]) -> TransportResult<PathBuf> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(TransportError::NotConnected);
        }
        let mut full = self.root()?;
        full.extend(path);
        Ok(full)
    }
}

#[async_trait]
impl RemoteSyncClient for SmbClient {
    fn protocol(&self) -> &'static str {
        "smb"
    }

    async fn connect(&self) -> TransportResult<()> {
        let root = self.root()?;
        tracing::debug!(root = %root.display(), "Probing SMB share");
        // ROOT probe: failure means the share is unreachable, not a missing file
        match tokio::fs::try_exists(&root).await {
            Ok(true) => {
                self.connected.store(true, Ordering::Release);
                Ok(())
            }
            Ok(false) => Err(TransportError::unreachable(
                UnreachableCode::Canceled,
                format!("share root {} not available", root.display()),
            )),
            Err(e) => Err(match TransportError::from_io(e, &root.display().to_string()) {
                err @ TransportError::Unreachable { .. } => err,
                other => TransportError::unreachable(UnreachableCode::Canceled, other.to_string()),
            }),
        }
    }

    async fn ensure_path(&self, segments: &[String]) -> TransportResult<()> {
        let mut dir = self.resolve(&[])?;
        for segment in segments {
            dir.push(segment);
            match tokio::fs::create_dir(&dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(TransportError::from_io(e, &dir.display().to_string())),
            }
        }
        Ok(())
    }

    async fn exists(&self, path: &[String]) -> TransportResult<bool> {
        let full = self.resolve(path)?;
        tokio::fs::try_exists(&full)
            .await
            .map_err(|e| TransportError::from_io(e, &full.display().to_string()))
    }

    async fn read_file(&self, path: &[String]) -> TransportResult<Vec<u8>> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full)
            .await
            .map_err(|e| TransportError::from_io(e, &full.display().to_string()))
    }

    async fn write_file(&self, path: &[String], bytes: &[u8]) -> TransportResult<()> {
        let full = self.resolve(path)?;
        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| TransportError::from_io(e, &full.display().to_string()))
    }

    async fn create_exclusive(&self, path: &[String], bytes: &[u8]) -> TransportResult<()> {
        let full = self.resolve(path)?;
        let display = full.display().to_string();
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
            .map_err(|e| TransportError::from_io(e, &display))?;
        file.write_all(bytes)
            .await
            .map_err(|e| TransportError::from_io(e, &display))?;
        file.flush()
            .await
            .map_err(|e| TransportError::from_io(e, &display))
    }

    async fn remove_file(&self, path: &[String]) -> TransportResult<()> {
        let full = self.resolve(path)?;
        tokio::fs::remove_file(&full)
            .await
            .map_err(|e| TransportError::from_io(e, &full.display().to_string()))
    }

    async fn modified_at(&self, path: &[String]) -> TransportResult<Option<i64>> {
        let full = self.resolve(path)?;
        let metadata = tokio::fs::metadata(&full)
            .await
            .map_err(|e| TransportError::from_io(e, &full.display().to_string()))?;
        Ok(metadata
            .modified()
            .ok()
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).timestamp_millis()))
    }

    async fn close(&self) -> TransportResult<()> {
        self.connected.store(false, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mount: Option<PathBuf>) -> SmbConfig {
        SmbConfig {
            host: "10.0.0.5".into(),
            share: "EOD".into(),
            mount_root: mount,
        }
    }

    fn p(s: &str) -> Vec<String> {
        s.split('/').map(str::to_string).collect()
    }

    #[cfg(windows)]
    #[test]
    fn test_unc_root_without_mount() {
        let client = SmbClient::new(config(None));
        assert_eq!(client.root().unwrap(), PathBuf::from(r"\\10.0.0.5\EOD"));
    }

    #[cfg(not(windows))]
    #[tokio::test]
    async fn test_no_mount_root_is_unreachable() {
        let client = SmbClient::new(config(None));
        assert!(client.root().is_err());
        let err = client.connect().await.unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("SMB_MOUNT_ROOT"));
    }

    #[tokio::test]
    async fn test_missing_root_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let client = SmbClient::new(config(Some(dir.path().join("not-mounted"))));
        let err = client.connect().await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_mounted_share_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let client = SmbClient::new(config(Some(dir.path().to_path_buf())));
        client.connect().await.unwrap();

        let folder = p("AYALA/2024/existing/EOD001");
        client.ensure_path(&folder).await.unwrap();
        // second walk swallows "already exists"
        client.ensure_path(&folder).await.unwrap();

        let mut file = folder.clone();
        file.push("C1230501.txt".into());
        client.write_file(&file, b"row\n").await.unwrap();
        assert!(client.exists(&file).await.unwrap());
        assert_eq!(client.read_file(&file).await.unwrap(), b"row\n");

        let mut lock = folder.clone();
        lock.push("C1230501.txt.lock".into());
        client.create_exclusive(&lock, b"me").await.unwrap();
        assert!(matches!(
            client.create_exclusive(&lock, b"you").await,
            Err(TransportError::AlreadyExists(_))
        ));
        client.remove_file(&lock).await.unwrap();
        assert!(!client.exists(&lock).await.unwrap());
    }
}
