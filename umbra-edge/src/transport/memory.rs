//! Memory 传输层实现 (同进程，带故障注入)

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::{RemoteSyncClient, TransportError, TransportResult, UnreachableCode};

#[derive(Debug, Default)]
struct RemoteState {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    unreachable: bool,
    fail_connects: usize,
    fail_writes: usize,
    connect_delay: Duration,
    connects: usize,
}

/// Shared in-memory remote; clones see the same files
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl MemoryRemote {
    fn lock(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every connect fails with `ECANCELED` while set
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// The next `n` connects fail with `ECANCELED`
    pub fn fail_next_connects(&self, n: usize) {
        self.lock().fail_connects = n;
    }

    /// The next `n` writes fail fatally
    pub fn fail_next_writes(&self, n: usize) {
        self.lock().fail_writes = n;
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        self.lock().connect_delay = delay;
    }

    pub fn connect_count(&self) -> usize {
        self.lock().connects
    }

    /// File content by `/`-joined path
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(path).cloned()
    }

    /// Seed a file (and its parent directories)
    pub fn put_file(&self, path: &str, bytes: &[u8]) {
        let mut state = self.lock();
        let segments: Vec<&str> = path.split('/').collect();
        for depth in 1..segments.len() {
            state.dirs.insert(segments[..depth].join("/"));
        }
        state.files.insert(path.to_string(), bytes.to_vec());
    }

    pub fn files(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }
}

/// Client over a [`MemoryRemote`]
#[derive(Debug)]
pub struct MemoryClient {
    remote: MemoryRemote,
    connected: AtomicBool,
}

impl MemoryClient {
    pub fn new(remote: MemoryRemote) -> Self {
        Self {
            remote,
            connected: AtomicBool::new(false),
        }
    }

    fn guard(&self) -> TransportResult<MutexGuard<'_, RemoteState>> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(TransportError::NotConnected);
        }
        Ok(self.remote.lock())
    }

    fn parent_exists(state: &RemoteState, path: &[String]) -> bool {
        path.len() <= 1 || state.dirs.contains(&path[..path.len() - 1].join("/"))
    }
}

#[async_trait]
impl RemoteSyncClient for MemoryClient {
    fn protocol(&self) -> &'static str {
        "memory"
    }

    async fn connect(&self) -> TransportResult<()> {
        let delay = self.remote.lock().connect_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.remote.lock();
        state.connects += 1;
        if state.unreachable {
            return Err(TransportError::unreachable(UnreachableCode::Canceled, "remote offline"));
        }
        if state.fail_connects > 0 {
            state.fail_connects -= 1;
            return Err(TransportError::unreachable(UnreachableCode::Canceled, "connection refused"));
        }
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn ensure_path(&self, segments: &[String]) -> TransportResult<()> {
        let mut state = self.guard()?;
        for depth in 1..=segments.len() {
            state.dirs.insert(segments[..depth].join("/"));
        }
        Ok(())
    }

    async fn exists(&self, path: &[String]) -> TransportResult<bool> {
        let state = self.guard()?;
        let key = path.join("/");
        Ok(key.is_empty() || state.files.contains_key(&key) || state.dirs.contains(&key))
    }

    async fn read_file(&self, path: &[String]) -> TransportResult<Vec<u8>> {
        let key = path.join("/");
        self.guard()?
            .files
            .get(&key)
            .cloned()
            .ok_or(TransportError::NotFound(key))
    }

    async fn write_file(&self, path: &[String], bytes: &[u8]) -> TransportResult<()> {
        let mut state = self.guard()?;
        let key = path.join("/");
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(TransportError::Fatal(format!("{key}: injected write failure")));
        }
        if !Self::parent_exists(&state, path) {
            return Err(TransportError::NotFound(key));
        }
        state.files.insert(key, bytes.to_vec());
        Ok(())
    }

    async fn create_exclusive(&self, path: &[String], bytes: &[u8]) -> TransportResult<()> {
        let mut state = self.guard()?;
        let key = path.join("/");
        if state.files.contains_key(&key) {
            return Err(TransportError::AlreadyExists(key));
        }
        if !Self::parent_exists(&state, path) {
            return Err(TransportError::NotFound(key));
        }
        state.files.insert(key, bytes.to_vec());
        Ok(())
    }

    async fn remove_file(&self, path: &[String]) -> TransportResult<()> {
        let key = path.join("/");
        match self.guard()?.files.remove(&key) {
            Some(_) => Ok(()),
            None => Err(TransportError::NotFound(key)),
        }
    }

    async fn close(&self) -> TransportResult<()> {
        self.connected.store(false, Ordering::Release);
        Ok(())
    }
}
