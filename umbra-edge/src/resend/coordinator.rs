use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shared::models::{DrainReport, DrainState};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::worker::ResendWorker;
use crate::artifact::{LocalArtifactStore, RemoteLock};
use crate::core::tasks::{TaskKind, spawn_supervised};
use crate::db::ReportStorage;
use crate::transport::TransportProvider;

/// Lease name guarding the drain
pub const DRAIN_LEASE: &str = "resend_drain";

/// Broadcast buffer for drain reports
const REPORT_CHANNEL_CAPACITY: usize = 64;

/// Everything a drain worker needs, handed over in one value
#[derive(Debug, Clone)]
pub struct DrainSettings {
    /// Lease owner / lock owner identity
    pub owner: String,
    pub retry_delay: Duration,
    pub connect_timeout: Duration,
    pub lease_ttl_ms: u64,
    pub remote_lock: RemoteLock,
}

pub(super) struct Inner {
    pub(super) storage: ReportStorage,
    pub(super) artifacts: LocalArtifactStore,
    pub(super) transports: Arc<dyn TransportProvider>,
    pub(super) settings: DrainSettings,
    active: AtomicBool,
    rerun: AtomicBool,
    state_tx: watch::Sender<DrainState>,
    pub(super) reports_tx: broadcast::Sender<DrainReport>,
    pub(super) shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    pub(super) fn set_state(&self, state: DrainState) {
        self.state_tx.send_replace(state);
    }
}

/// Resend coordinator: single-flight supervisor of the drain worker
#[derive(Clone)]
pub struct ResendCoordinator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ResendCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendCoordinator")
            .field("owner", &self.inner.settings.owner)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl ResendCoordinator {
    pub fn new(
        storage: ReportStorage,
        artifacts: LocalArtifactStore,
        transports: Arc<dyn TransportProvider>,
        settings: DrainSettings,
    ) -> Self {
        let (state_tx, _) = watch::channel(DrainState::Idle);
        let (reports_tx, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                storage,
                artifacts,
                transports,
                settings,
                active: AtomicBool::new(false),
                rerun: AtomicBool::new(false),
                state_tx,
                reports_tx,
                shutdown: CancellationToken::new(),
                worker: Mutex::new(None),
            }),
        }
    }

    /// Start a drain unless one is already running
    ///
    /// Returns true when this call spawned the worker. A trigger that finds
    /// a live worker is folded into one more pass after it finishes.
    pub fn trigger(&self) -> bool {
        let inner = &self.inner;
        if inner.shutdown.is_cancelled() {
            return false;
        }

        if inner
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            inner.rerun.store(true, Ordering::Release);
            tracing::debug!("Drain already running, rerun scheduled");
            return false;
        }

        let owner = &inner.settings.owner;
        match inner.storage.try_acquire_lease(
            DRAIN_LEASE,
            owner,
            inner.settings.lease_ttl_ms,
            shared::util::now_millis(),
        ) {
            Ok(true) => {}
            Ok(false) => {
                inner.active.store(false, Ordering::Release);
                tracing::info!(owner = %owner, "Drain lease held by another instance");
                return false;
            }
            Err(e) => {
                inner.active.store(false, Ordering::Release);
                tracing::error!(error = %e, "Failed to acquire drain lease");
                return false;
            }
        }

        inner.rerun.store(false, Ordering::Release);
        inner.set_state(DrainState::Draining);

        let worker = ResendWorker::new(WorkerGuard {
            inner: self.inner.clone(),
        });
        let mut slot = inner.worker.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(spawn_supervised(
            "resend_worker",
            TaskKind::Oneshot,
            worker.run(),
        ));
        true
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    pub fn state(&self) -> DrainState {
        *self.inner.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<DrainState> {
        self.inner.state_tx.subscribe()
    }

    /// Drain reports, one per cycle
    pub fn subscribe(&self) -> broadcast::Receiver<DrainReport> {
        self.inner.reports_tx.subscribe()
    }

    /// Cancel the worker and wait for it
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let handle = self
            .inner
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::error!(error = ?e, "Resend worker join failed");
        }
        tracing::info!("Resend coordinator stopped");
    }
}

/// Owned by the running worker; dropping it ends the drain
///
/// Runs on normal exit and on panic alike: releases the lease, clears the
/// active flag and honours a rerun requested in the meantime.
pub(super) struct WorkerGuard {
    pub(super) inner: Arc<Inner>,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let inner = &self.inner;
        if let Err(e) = inner.storage.release_lease(DRAIN_LEASE, &inner.settings.owner) {
            tracing::warn!(error = %e, "Failed to release drain lease");
        }
        inner.active.store(false, Ordering::Release);
        inner.set_state(DrainState::Idle);

        if inner.rerun.swap(false, Ordering::AcqRel) && !inner.shutdown.is_cancelled() {
            let coordinator = ResendCoordinator {
                inner: inner.clone(),
            };
            coordinator.trigger();
        }
    }
}
