use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use shared::error::{AppError, AppResult};
use shared::models::{
    ArtifactKind, DeliveryRecord, EodSnapshot, HourRange, Mall, StoreSettings, TransactionMark,
};
use tokio::sync::Mutex;

use crate::artifact::{Contribution, LocalArtifactStore, RemoteLock, WriteOutcome, merge_remote};
use crate::db::ReportStorage;
use crate::report::naming::{self, ArtifactPath};
use crate::report::{daily, hourly, require_snapshot, robinson, sheet, zread};
use crate::resend::ResendCoordinator;
use crate::sequence::SequenceAllocator;
use crate::transport::{TransportProvider, connect_with_timeout};

/// One file touched by a generation
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedFile {
    pub kind: ArtifactKind,
    /// Path relative to the reports root
    pub path: String,
    pub local: WriteOutcome,
    /// None when the remote attempt failed
    pub remote: Option<WriteOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a generation or resend request
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub store_code: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<u32>,
    pub files: Vec<GeneratedFile>,
    /// Every file reached the remote
    pub remote_synced: bool,
    /// Failed deliveries handed to the resend queue
    pub queued: usize,
}

/// Accreditation report service
#[derive(Debug)]
pub struct AccreditationService {
    storage: ReportStorage,
    sequence: SequenceAllocator,
    artifacts: LocalArtifactStore,
    transports: Arc<dyn TransportProvider>,
    coordinator: ResendCoordinator,
    settings: StoreSettings,
    connect_timeout: Duration,
    remote_lock: RemoteLock,
    /// Serializes generations of this terminal
    generation_lock: Mutex<()>,
}

impl AccreditationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        storage: ReportStorage,
        sequence: SequenceAllocator,
        artifacts: LocalArtifactStore,
        transports: Arc<dyn TransportProvider>,
        coordinator: ResendCoordinator,
        settings: StoreSettings,
        connect_timeout: Duration,
        remote_lock: RemoteLock,
    ) -> Self {
        Self {
            storage,
            sequence,
            artifacts,
            transports,
            coordinator,
            settings,
            connect_timeout,
            remote_lock,
            generation_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    // ========== Ingestion ==========

    /// Persist a closing snapshot (write-once per store/date)
    pub fn ingest_snapshot(&self, snapshot: &EodSnapshot) -> AppResult<()> {
        if snapshot.store_code.trim().is_empty() {
            return Err(AppError::validation("store_code is required"));
        }
        if let Some(bucket) = snapshot.hourly.iter().find(|b| b.hour > 23) {
            return Err(AppError::validation(format!("Invalid hour: {}", bucket.hour)));
        }
        self.storage.insert_snapshot(snapshot)?;
        tracing::info!(
            store_code = %snapshot.store_code,
            date = %snapshot.date,
            terminal = snapshot.terminal,
            "EOD snapshot ingested"
        );
        Ok(())
    }

    pub fn ingest_transactions(&self, marks: &[TransactionMark]) -> AppResult<usize> {
        Ok(self.storage.record_transactions(marks)?)
    }

    pub fn snapshot(&self, store_code: &str, date: NaiveDate) -> AppResult<Option<EodSnapshot>> {
        Ok(self.storage.get_snapshot(store_code, date)?)
    }

    fn load_snapshot(&self, date: NaiveDate) -> AppResult<EodSnapshot> {
        let store_code = &self.settings.store_code;
        let snapshot = self.storage.get_snapshot(store_code, date)?;
        Ok(require_snapshot(snapshot, store_code, date)?)
    }

    /// Allocate ranges for every hour with sales; returns the trading day's ranges
    fn number_trading_day(&self, snapshot: &EodSnapshot) -> AppResult<Vec<HourRange>> {
        let slots = hourly::hourly_slots(snapshot.date);
        let mut ranges = Vec::new();
        for (date, hour) in slots {
            let Some(bucket) = snapshot.hour_bucket(date, hour) else {
                continue;
            };
            if bucket.transaction_count == 0 {
                continue;
            }
            ranges.push(self.sequence.allocate_hour_range(
                &snapshot.store_code,
                date,
                hour,
                u64::from(bucket.transaction_count),
            )?);
        }
        Ok(ranges)
    }

    // ========== Generation ==========

    /// Build, write and push the four Ayala files of a trading date
    pub async fn generate_ayala(&self, date: NaiveDate) -> AppResult<GenerationReport> {
        let _guard = self.generation_lock.lock().await;
        let snapshot = self.load_snapshot(date)?;
        let settings = &self.settings;
        let key = settings.ayala_terminal();

        let ranges = self.number_trading_day(&snapshot)?;
        let items = vec![
            (
                naming::ayala_zread(settings, date),
                Contribution::Whole {
                    key: key.clone(),
                    bytes: zread::build_zread(&snapshot, settings, &ranges).into_bytes(),
                },
            ),
            (
                naming::ayala_hourly(settings, date),
                Contribution::Rows {
                    key: key.clone(),
                    rows: hourly::hourly_records(&snapshot, settings),
                },
            ),
            (
                naming::ayala_daily(settings, date),
                Contribution::Rows {
                    key: key.clone(),
                    rows: vec![daily::daily_record(&snapshot, settings)],
                },
            ),
            (
                naming::ayala_sheet(settings, date),
                Contribution::Column {
                    key,
                    values: sheet::sheet_column(&snapshot, settings),
                },
            ),
        ];

        let files = self.write_local(&items).await?;
        let (files, queued) = self.push_remote(Mall::Ayala, date, &items, files).await;
        Ok(self.report(date, None, files, queued))
    }

    /// Build, write and push the Robinson batch file; the batch advances
    /// once the local file exists, whatever the remote outcome
    pub async fn generate_robinson(&self, date: NaiveDate) -> AppResult<GenerationReport> {
        let _guard = self.generation_lock.lock().await;
        let snapshot = self.load_snapshot(date)?;
        let store_code = &self.settings.store_code;

        let batch = self.sequence.allocate_batch_number(store_code, date)?;
        let items = vec![self.robinson_item(&snapshot, date, batch)?];
        let files = self.write_local(&items).await?;
        let next = self.sequence.commit_generation(store_code, date)?;
        tracing::info!(%store_code, %date, batch, next, "Robinson batch generated");

        let (files, queued) = self.push_remote(Mall::Robinson, date, &items, files).await;
        Ok(self.report(date, Some(batch), files, queued))
    }

    /// Regenerate and push a Robinson batch; `batch` defaults to the current one
    pub async fn resend_robinson(
        &self,
        date: NaiveDate,
        batch: Option<u32>,
    ) -> AppResult<GenerationReport> {
        let _guard = self.generation_lock.lock().await;
        let snapshot = self.load_snapshot(date)?;
        let store_code = &self.settings.store_code;

        let current = self.sequence.allocate_batch_number(store_code, date)?;
        let batch = batch.unwrap_or(current);
        if batch == 0 || batch > current {
            return Err(AppError::with_message(
                shared::error::ErrorCode::BatchNotFound,
                format!("Batch {batch} not generated yet (current {current})"),
            ));
        }

        let items = vec![self.robinson_item(&snapshot, date, batch)?];
        let files = self.write_local(&items).await?;
        let advanced = self.sequence.commit_resend(store_code, date, batch)?;
        tracing::info!(%store_code, %date, batch, advanced, "Robinson batch resent");

        let (files, queued) = self.push_remote(Mall::Robinson, date, &items, files).await;
        Ok(self.report(date, Some(batch), files, queued))
    }

    /// Ask the resend coordinator to drain now
    pub fn request_resend(&self) -> bool {
        self.coordinator.trigger()
    }

    fn robinson_item(
        &self,
        snapshot: &EodSnapshot,
        date: NaiveDate,
        batch: u32,
    ) -> AppResult<(ArtifactPath, Contribution)> {
        let text = robinson::build_robinson(snapshot, &self.settings)?;
        Ok((
            naming::robinson_batch(&self.settings, date, batch),
            Contribution::Whole {
                key: self.settings.robinson_terminal(),
                bytes: text.into_bytes(),
            },
        ))
    }

    async fn write_local(&self, items: &[(ArtifactPath, Contribution)]) -> AppResult<Vec<GeneratedFile>> {
        let mut files = Vec::with_capacity(items.len());
        for (path, contribution) in items {
            let local = self
                .artifacts
                .write_or_append(path, self.settings.terminal, contribution)
                .await?;
            files.push(GeneratedFile {
                kind: path.kind,
                path: path.relative(),
                local,
                remote: None,
                error: None,
            });
        }
        Ok(files)
    }

    /// Push every item through one connection; failures become queued records
    async fn push_remote(
        &self,
        mall: Mall,
        date: NaiveDate,
        items: &[(ArtifactPath, Contribution)],
        mut files: Vec<GeneratedFile>,
    ) -> (Vec<GeneratedFile>, usize) {
        let client = self.transports.client_for(mall);
        let connected = connect_with_timeout(client.as_ref(), self.connect_timeout).await;
        if let Err(e) = &connected {
            tracing::warn!(%mall, error = %e, "Remote unreachable, queueing deliveries");
        }

        let mut queued = 0;
        for ((path, contribution), file) in items.iter().zip(files.iter_mut()) {
            let result = match &connected {
                Ok(()) => merge_remote(
                    client.as_ref(),
                    &self.storage,
                    path,
                    self.settings.terminal,
                    contribution,
                    &self.remote_lock,
                )
                .await
                .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            let (sent, error) = match result {
                Ok(outcome) => {
                    file.remote = Some(outcome);
                    (true, None)
                }
                Err(e) => {
                    file.error = Some(e.clone());
                    queued += 1;
                    (false, Some(e))
                }
            };

            let record = DeliveryRecord {
                // assigned by the delivery log
                id: 0,
                file_name: path.relative(),
                kind: path.kind,
                sent,
                transaction_date: date,
                store_code: self.settings.store_code.clone(),
                terminal: self.settings.terminal,
                attempted_at: shared::util::now_millis(),
                error,
            };
            let file_name = record.file_name.clone();
            if let Err(e) = self.storage.append_delivery(record) {
                tracing::error!(file = %file_name, error = %e, "Failed to log delivery");
            }
        }

        if connected.is_ok()
            && let Err(e) = client.close().await
        {
            tracing::debug!(%mall, error = %e, "Remote close failed");
        }

        // Every new record kicks the drain; older leftovers ride along
        if !items.is_empty() {
            self.coordinator.trigger();
        }
        (files, queued)
    }

    fn report(
        &self,
        date: NaiveDate,
        batch_number: Option<u32>,
        files: Vec<GeneratedFile>,
        queued: usize,
    ) -> GenerationReport {
        GenerationReport {
            store_code: self.settings.store_code.clone(),
            date,
            batch_number,
            remote_synced: queued == 0,
            files,
            queued,
        }
    }
}
