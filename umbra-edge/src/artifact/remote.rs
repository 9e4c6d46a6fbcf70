//! Remote read-merge-write (远程合并)
//!
//! Shared artifacts on the mall server are guarded by a best-effort claim
//! file `<artifact>.lock`, created exclusively and considered abandoned
//! after `stale_after`. A live claim held by another terminal surfaces as
//! `TransportError::Busy`, which the resend queue retries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::merge::{MergeOutcome, merge};
use super::{ArtifactSchema, Contribution, WriteDiscipline, WriteOutcome};
use crate::db::{ContributionLocation, ReportStorage};
use crate::report::naming::ArtifactPath;
use crate::transport::{RemoteSyncClient, TransportError, TransportResult};

/// Claim-lock settings for one writer
#[derive(Debug, Clone)]
pub struct RemoteLock {
    /// Identity written into the claim file
    pub owner: String,
    pub stale_after: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
struct LockBody {
    owner: String,
    acquired_at: i64,
}

fn lock_path(path: &[String]) -> Vec<String> {
    let mut lock = path.to_vec();
    if let Some(name) = lock.last_mut() {
        name.push_str(".lock");
    }
    lock
}

async fn acquire(
    client: &dyn RemoteSyncClient,
    lock: &[String],
    settings: &RemoteLock,
) -> TransportResult<()> {
    let body = serde_json::to_vec(&LockBody {
        owner: settings.owner.clone(),
        acquired_at: shared::util::now_millis(),
    })
    .map_err(TransportError::fatal)?;

    match client.create_exclusive(lock, &body).await {
        Ok(()) => return Ok(()),
        Err(TransportError::AlreadyExists(_)) => {}
        Err(e) => return Err(e),
    }

    // Held: take it over only when abandoned
    let now = shared::util::now_millis();
    let (owner, age_ms) = match client.read_file(lock).await {
        Ok(bytes) => match serde_json::from_slice::<LockBody>(&bytes) {
            Ok(holder) => (holder.owner, Some(now - holder.acquired_at)),
            // Claim still being written; only its mtime tells its age
            Err(_) => {
                let modified = client.modified_at(lock).await.ok().flatten();
                (String::from("unknown"), modified.map(|m| now - m))
            }
        },
        Err(TransportError::NotFound(_)) => {
            // Released between our create and read
            return match client.create_exclusive(lock, &body).await {
                Ok(()) => Ok(()),
                Err(TransportError::AlreadyExists(path)) => Err(TransportError::Busy(path)),
                Err(e) => Err(e),
            };
        }
        Err(e) => {
            return Err(TransportError::Busy(format!(
                "{} unreadable: {e}",
                lock.join("/")
            )));
        }
    };

    let stale_ms = i64::try_from(settings.stale_after.as_millis()).unwrap_or(i64::MAX);
    let Some(age_ms) = age_ms.filter(|age| *age >= stale_ms) else {
        return Err(TransportError::Busy(format!("{} held by {owner}", lock.join("/"))));
    };

    tracing::warn!(lock = %lock.join("/"), age_ms, "Breaking stale remote lock");
    match client.remove_file(lock).await {
        Ok(()) | Err(TransportError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }
    match client.create_exclusive(lock, &body).await {
        Ok(()) => Ok(()),
        Err(TransportError::AlreadyExists(path)) => Err(TransportError::Busy(path)),
        Err(e) => Err(e),
    }
}

async fn merge_and_write(
    client: &dyn RemoteSyncClient,
    path: &ArtifactPath,
    schema: &ArtifactSchema,
    contribution: &Contribution,
) -> TransportResult<WriteOutcome> {
    let existing = if client.exists(&path.remote).await? {
        Some(client.read_file(&path.remote).await?)
    } else {
        None
    };

    match merge(existing.as_deref(), schema, contribution).map_err(TransportError::fatal)? {
        MergeOutcome::AlreadyPresent => Ok(WriteOutcome::Skipped),
        MergeOutcome::Write { bytes, created } => {
            client.write_file(&path.remote, &bytes).await?;
            Ok(if created {
                WriteOutcome::Created
            } else {
                WriteOutcome::Merged
            })
        }
    }
}

/// Merge one terminal's contribution into the remote artifact
///
/// `client` must be connected. Per-terminal files skip the claim lock.
pub async fn merge_remote(
    client: &dyn RemoteSyncClient,
    storage: &ReportStorage,
    path: &ArtifactPath,
    terminal: u16,
    contribution: &Contribution,
    lock: &RemoteLock,
) -> TransportResult<WriteOutcome> {
    let schema = ArtifactSchema::for_kind(path.kind);
    client.ensure_path(path.remote_dir()).await?;

    let outcome = if schema.discipline == WriteDiscipline::Replace {
        merge_and_write(client, path, &schema, contribution).await?
    } else {
        let lock_file = lock_path(&path.remote);
        acquire(client, &lock_file, lock).await?;
        let result = merge_and_write(client, path, &schema, contribution).await;
        if let Err(e) = client.remove_file(&lock_file).await {
            tracing::warn!(lock = %lock_file.join("/"), error = %e, "Failed to release remote lock");
        }
        result?
    };

    if let Err(e) =
        storage.record_contribution(&path.relative(), ContributionLocation::Remote, terminal)
    {
        tracing::warn!(artifact = %path.relative(), error = %e, "Failed to record remote marker");
    }

    tracing::info!(
        protocol = client.protocol(),
        artifact = %path.remote.join("/"),
        terminal,
        ?outcome,
        "Remote artifact synced"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::naming;
    use crate::test_support::sample_settings;
    use crate::transport::{MemoryClient, MemoryRemote};
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn lock(owner: &str) -> RemoteLock {
        RemoteLock {
            owner: owner.into(),
            stale_after: Duration::from_secs(60),
        }
    }

    fn rows(key: &str) -> Contribution {
        Contribution::Rows {
            key: key.into(),
            rows: vec![vec!["C123".into(), "10.00".into(), key.into()]],
        }
    }

    async fn connected(remote: &MemoryRemote) -> MemoryClient {
        let client = MemoryClient::new(remote.clone());
        client.connect().await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_remote_merge_is_idempotent_and_releases_lock() {
        let remote = MemoryRemote::default();
        let client = connected(&remote).await;
        let storage = ReportStorage::open_in_memory().unwrap();
        let path = naming::ayala_hourly(&sample_settings(), date());

        let first = merge_remote(&client, &storage, &path, 1, &rows("001"), &lock("t1"))
            .await
            .unwrap();
        let second = merge_remote(&client, &storage, &path, 1, &rows("001"), &lock("t1"))
            .await
            .unwrap();
        assert_eq!(first, WriteOutcome::Created);
        assert_eq!(second, WriteOutcome::Skipped);
        assert_eq!(remote.files(), vec![path.relative()]);
        assert!(
            storage
                .has_contribution(&path.relative(), ContributionLocation::Remote, 1)
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_live_lock_is_busy() {
        let remote = MemoryRemote::default();
        let client = connected(&remote).await;
        let storage = ReportStorage::open_in_memory().unwrap();
        let path = naming::ayala_hourly(&sample_settings(), date());

        let body = serde_json::to_vec(&LockBody {
            owner: "terminal-2".into(),
            acquired_at: shared::util::now_millis(),
        })
        .unwrap();
        remote.put_file(&format!("{}.lock", path.relative()), &body);

        let err = merge_remote(&client, &storage, &path, 1, &rows("001"), &lock("t1"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Busy(ref m) if m.contains("terminal-2")));
        assert!(err.is_transient());
        assert!(remote.file(&path.relative()).is_none());
    }

    #[tokio::test]
    async fn test_stale_lock_is_broken() {
        let remote = MemoryRemote::default();
        let client = connected(&remote).await;
        let storage = ReportStorage::open_in_memory().unwrap();
        let path = naming::ayala_hourly(&sample_settings(), date());

        let body = serde_json::to_vec(&LockBody {
            owner: "terminal-2".into(),
            acquired_at: shared::util::now_millis() - 120_000,
        })
        .unwrap();
        remote.put_file(&format!("{}.lock", path.relative()), &body);

        let outcome = merge_remote(&client, &storage, &path, 1, &rows("001"), &lock("t1"))
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Created);
        assert_eq!(remote.files(), vec![path.relative()]);
    }

    #[tokio::test]
    async fn test_half_written_claim_is_busy() {
        let remote = MemoryRemote::default();
        let client = connected(&remote).await;
        let storage = ReportStorage::open_in_memory().unwrap();
        let path = naming::ayala_hourly(&sample_settings(), date());
        // Sibling created the claim but has not written its body yet
        remote.put_file(&format!("{}.lock", path.relative()), b"");

        let err = merge_remote(&client, &storage, &path, 1, &rows("001"), &lock("t1"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Busy(_)));
        assert!(remote.file(&path.relative()).is_none());
        assert_eq!(
            remote.file(&format!("{}.lock", path.relative())).unwrap(),
            b""
        );
    }

    #[tokio::test]
    async fn test_empty_claim_ages_by_mtime() {
        use crate::core::config::SmbConfig;
        use crate::transport::SmbClient;

        let dir = tempfile::tempdir().unwrap();
        let client = SmbClient::new(SmbConfig {
            host: "10.0.0.5".into(),
            share: "EOD".into(),
            mount_root: Some(dir.path().to_path_buf()),
        });
        client.connect().await.unwrap();
        let storage = ReportStorage::open_in_memory().unwrap();
        let path = naming::ayala_hourly(&sample_settings(), date());
        client.ensure_path(path.remote_dir()).await.unwrap();

        let mut lock_file = dir.path().to_path_buf();
        lock_file.extend(&path.remote);
        lock_file.set_file_name(format!(
            "{}.lock",
            lock_file.file_name().unwrap().to_string_lossy()
        ));
        let claim = std::fs::File::create(&lock_file).unwrap();

        // Fresh empty claim: someone is mid-write
        let err = merge_remote(&client, &storage, &path, 1, &rows("001"), &lock("t1"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Busy(_)));

        // Abandoned for ten minutes: taken over
        claim
            .set_modified(std::time::SystemTime::now() - Duration::from_secs(600))
            .unwrap();
        drop(claim);
        let outcome = merge_remote(&client, &storage, &path, 1, &rows("001"), &lock("t1"))
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Created);
        assert!(!lock_file.exists());
    }

    #[tokio::test]
    async fn test_replace_skips_lock() {
        let remote = MemoryRemote::default();
        let client = connected(&remote).await;
        let storage = ReportStorage::open_in_memory().unwrap();
        let path = naming::robinson_batch(&sample_settings(), date(), 1);
        let c = Contribution::Whole {
            key: "01".into(),
            bytes: b"01data\n".to_vec(),
        };

        merge_remote(&client, &storage, &path, 1, &c, &lock("t1"))
            .await
            .unwrap();
        assert_eq!(remote.file("23450501.011").unwrap(), b"01data\n");
    }
}
