//! Local artifact store (本地报表文件)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use super::merge::{MergeOutcome, extract_contribution, merge};
use super::{ArtifactError, ArtifactResult, ArtifactSchema, Contribution, WriteDiscipline, WriteOutcome};
use crate::db::{ContributionLocation, ReportStorage};
use crate::report::naming::ArtifactPath;

/// On-disk artifacts under `<root>/<MALL>/...`
///
/// Writes are serialized through one async mutex; markers in the datastore
/// short-circuit the structural check for files this terminal already wrote.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
    storage: ReportStorage,
    write_lock: Arc<Mutex<()>>,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>, storage: ReportStorage) -> Self {
        Self {
            root: root.into(),
            storage,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute local path of an artifact
    pub fn resolve(&self, path: &ArtifactPath) -> PathBuf {
        let mut full = self.root.clone();
        full.extend(&path.local);
        full
    }

    /// Recursive create; no-op if present
    pub async fn ensure_directory(&self, path: &Path) -> ArtifactResult<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| ArtifactError::io(path.display(), e))
    }

    pub async fn read(&self, path: &ArtifactPath) -> ArtifactResult<Option<Vec<u8>>> {
        let full = self.resolve(path);
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ArtifactError::io(full.display(), e)),
        }
    }

    /// Write or merge one terminal's contribution
    pub async fn write_or_append(
        &self,
        path: &ArtifactPath,
        terminal: u16,
        contribution: &Contribution,
    ) -> ArtifactResult<WriteOutcome> {
        let schema = ArtifactSchema::for_kind(path.kind);
        let relative = path.relative();
        let full = self.resolve(path);
        let _guard = self.write_lock.lock().await;

        let existing = self.read(path).await?;
        let keyed = schema.discipline != WriteDiscipline::Replace;

        if keyed
            && self
                .storage
                .has_contribution(&relative, ContributionLocation::Local, terminal)?
        {
            if existing.is_some() {
                tracing::debug!(artifact = %relative, terminal, "Contribution marker present, skipping");
                return Ok(WriteOutcome::Skipped);
            }
            // File removed behind our back
            self.storage
                .clear_contribution(&relative, ContributionLocation::Local, terminal)?;
        }

        let outcome = match merge(existing.as_deref(), &schema, contribution)? {
            MergeOutcome::AlreadyPresent => WriteOutcome::Skipped,
            MergeOutcome::Write { bytes, created } => {
                if let Some(parent) = full.parent() {
                    self.ensure_directory(parent).await?;
                }
                write_atomic(&full, &bytes).await?;
                if created {
                    WriteOutcome::Created
                } else {
                    WriteOutcome::Merged
                }
            }
        };

        if keyed {
            self.storage
                .record_contribution(&relative, ContributionLocation::Local, terminal)?;
        }

        tracing::info!(artifact = %relative, terminal, ?outcome, "Local artifact written");
        Ok(outcome)
    }

    /// Recover one terminal's contribution from the local file
    pub async fn load_contribution(
        &self,
        path: &ArtifactPath,
        key: &str,
    ) -> ArtifactResult<Option<Contribution>> {
        let schema = ArtifactSchema::for_kind(path.kind);
        match self.read(path).await? {
            Some(bytes) => extract_contribution(&bytes, &schema, key),
            None => Ok(None),
        }
    }
}

/// Write through a sibling temp file, then rename over the target
async fn write_atomic(path: &Path, bytes: &[u8]) -> ArtifactResult<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| ArtifactError::io(tmp.display(), e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| ArtifactError::io(path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::merge::UTF8_BOM;
    use crate::report::{daily, naming, sheet};
    use crate::test_support::{sample_settings, sample_snapshot};
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn store(dir: &Path) -> LocalArtifactStore {
        LocalArtifactStore::new(dir, ReportStorage::open_in_memory().unwrap())
    }

    fn daily_contribution(terminal: &str) -> Contribution {
        let mut settings = sample_settings();
        settings.terminal = terminal.parse().unwrap();
        let row = daily::daily_record(&sample_snapshot("STORE01", date()), &settings);
        Contribution::Rows {
            key: settings.ayala_terminal(),
            rows: vec![row],
        }
    }

    #[tokio::test]
    async fn test_repeated_writes_converge_to_one_contribution() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let path = naming::ayala_daily(&sample_settings(), date());
        let contribution = daily_contribution("1");

        let first = store.write_or_append(&path, 1, &contribution).await.unwrap();
        let second = store.write_or_append(&path, 1, &contribution).await.unwrap();
        assert_eq!(first, WriteOutcome::Created);
        assert_eq!(second, WriteOutcome::Skipped);

        let bytes = store.read(&path).await.unwrap().unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8_lossy(&bytes[UTF8_BOM.len()..]).to_string();
        assert_eq!(text.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_sibling_line_without_marker_is_detected_structurally() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let path = naming::ayala_daily(&sample_settings(), date());

        // Terminal 2's file copied in by hand: no marker in our datastore
        let other = LocalArtifactStore::new(dir.path(), ReportStorage::open_in_memory().unwrap());
        other
            .write_or_append(&path, 2, &daily_contribution("2"))
            .await
            .unwrap();

        let outcome = store
            .write_or_append(&path, 2, &daily_contribution("2"))
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Skipped);

        let outcome = store
            .write_or_append(&path, 1, &daily_contribution("1"))
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Merged);
    }

    #[tokio::test]
    async fn test_marker_cleared_when_file_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let path = naming::ayala_daily(&sample_settings(), date());
        let contribution = daily_contribution("1");

        store.write_or_append(&path, 1, &contribution).await.unwrap();
        tokio::fs::remove_file(store.resolve(&path)).await.unwrap();

        let outcome = store.write_or_append(&path, 1, &contribution).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Created);
    }

    #[tokio::test]
    async fn test_sheet_second_terminal_and_extract() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let settings = sample_settings();
        let path = naming::ayala_sheet(&settings, date());
        let snapshot = sample_snapshot("STORE01", date());

        for terminal in [1u16, 2] {
            let mut s = settings.clone();
            s.terminal = terminal;
            let c = Contribution::Column {
                key: s.ayala_terminal(),
                values: sheet::sheet_column(&snapshot, &s),
            };
            store.write_or_append(&path, terminal, &c).await.unwrap();
        }

        let bytes = store.read(&path).await.unwrap().unwrap();
        let text = String::from_utf8_lossy(&bytes[UTF8_BOM.len()..]).to_string();
        assert!(text.starts_with("TER_NO,001,002\n"));

        let extracted = store.load_contribution(&path, "002").await.unwrap();
        assert!(matches!(extracted, Some(Contribution::Column { ref key, .. }) if key == "002"));
    }
}
