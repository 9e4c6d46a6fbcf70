//! ResendWorker: drains unsent delivery records until the queue is empty

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::future::join_all;
use shared::models::{DeliveryRecord, DrainReport, DrainState, Mall};

use super::coordinator::WorkerGuard;
use crate::artifact::merge_remote;
use crate::report::naming::ArtifactPath;
use crate::transport::{RemoteSyncClient, TransportError, connect_with_timeout};

/// Idempotency key of a record's contribution
fn contribution_key(record: &DeliveryRecord) -> String {
    match record.mall() {
        Mall::Ayala => format!("{:03}", record.terminal),
        Mall::Robinson => format!("{:02}", record.terminal),
    }
}

pub(super) struct ResendWorker {
    guard: WorkerGuard,
}

impl ResendWorker {
    pub(super) fn new(guard: WorkerGuard) -> Self {
        Self { guard }
    }

    /// Drain loop
    ///
    /// 1. Query unsent records; empty ⇒ report and exit
    /// 2. Connect once per mall, push every distinct file in parallel
    /// 3. Partial failure ⇒ wait the retry delay and go again
    pub(super) async fn run(self) {
        let inner = &self.guard.inner;
        tracing::info!(owner = %inner.settings.owner, "ResendWorker started");

        loop {
            if inner.shutdown.is_cancelled() {
                break;
            }

            match inner.storage.try_acquire_lease(
                super::DRAIN_LEASE,
                &inner.settings.owner,
                inner.settings.lease_ttl_ms,
                shared::util::now_millis(),
            ) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!("Drain lease lost, stopping");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Drain lease renewal failed, stopping");
                    break;
                }
            }

            inner.set_state(DrainState::Draining);
            let report = self.drain_cycle().await;
            tracing::info!(
                empty = report.empty,
                resent = report.resent,
                full_sent = report.full_sent,
                "Drain cycle finished"
            );
            // No subscribers is fine
            let _ = inner.reports_tx.send(report.clone());

            if report.empty {
                inner.set_state(DrainState::Empty);
                break;
            }
            if report.full_sent {
                // Next pass confirms the queue is empty
                continue;
            }

            inner.set_state(DrainState::PartialFailure);
            tokio::select! {
                _ = inner.shutdown.cancelled() => {
                    tracing::info!("ResendWorker shutting down");
                    break;
                }
                _ = tokio::time::sleep(inner.settings.retry_delay) => {}
            }
        }

        tracing::info!("ResendWorker stopped");
    }

    async fn drain_cycle(&self) -> DrainReport {
        let inner = &self.guard.inner;
        let unsent = match inner.storage.unsent_deliveries() {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read delivery queue");
                return DrainReport {
                    error: Some(e.to_string()),
                    ..Default::default()
                };
            }
        };
        if unsent.is_empty() {
            return DrainReport::empty();
        }

        // Distinct files; every record of a file flips together
        let mut files: BTreeMap<String, Vec<DeliveryRecord>> = BTreeMap::new();
        for record in unsent {
            files.entry(record.file_name.clone()).or_default().push(record);
        }

        let mut clients: HashMap<Mall, Result<Arc<dyn RemoteSyncClient>, String>> = HashMap::new();
        for records in files.values() {
            let mall = records[0].mall();
            if clients.contains_key(&mall) {
                continue;
            }
            let client = inner.transports.client_for(mall);
            let connected = match connect_with_timeout(client.as_ref(), inner.settings.connect_timeout).await {
                Ok(()) => Ok(client),
                Err(e) => {
                    tracing::warn!(%mall, error = %e, "Remote connect failed");
                    Err(e.to_string())
                }
            };
            clients.insert(mall, connected);
        }

        let attempts = files.values().map(|records| {
            let record = &records[0];
            let client = clients.get(&record.mall());
            async move {
                let client = match client {
                    Some(Ok(client)) => client,
                    Some(Err(e)) => return Err(e.clone()),
                    None => return Err("no client".to_string()),
                };
                self.push_file(client.as_ref(), record).await.map_err(|e| e.to_string())
            }
        });
        let results = join_all(attempts).await;

        let mut delivered = Vec::new();
        let mut first_error = None;
        for (records, result) in files.values().zip(results) {
            match result {
                Ok(()) => delivered.extend(records.iter().map(|r| r.id)),
                Err(e) => {
                    tracing::warn!(file = %records[0].file_name, error = %e, "Resend failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        if !delivered.is_empty()
            && let Err(e) = inner.storage.mark_delivered(&delivered)
        {
            tracing::error!(error = %e, "Failed to mark deliveries as sent");
            first_error.get_or_insert(e.to_string());
        }

        for client in clients.values().flatten() {
            if let Err(e) = client.close().await {
                tracing::debug!(protocol = client.protocol(), error = %e, "Close failed");
            }
        }

        DrainReport {
            empty: false,
            resent: true,
            full_sent: first_error.is_none(),
            error: first_error,
        }
    }

    /// Rebuild the contribution from the local file and merge it remotely
    async fn push_file(
        &self,
        client: &dyn RemoteSyncClient,
        record: &DeliveryRecord,
    ) -> Result<(), TransportError> {
        let inner = &self.guard.inner;
        let path = ArtifactPath::from_relative(record.kind, &record.file_name);
        let key = contribution_key(record);

        let contribution = inner
            .artifacts
            .load_contribution(&path, &key)
            .await
            .map_err(TransportError::fatal)?
            .ok_or_else(|| {
                TransportError::Fatal(format!("local artifact {} has no contribution {key}", record.file_name))
            })?;

        merge_remote(
            client,
            &inner.storage,
            &path,
            record.terminal,
            &contribution,
            &inner.settings.remote_lock,
        )
        .await
        .map(|_| ())
    }
}
