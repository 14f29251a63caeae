//! Persisted credential token and cross-context change notification

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::AbortHandle;

use crate::error::StoreError;

pub type Listener = Arc<dyn Fn() + Send + Sync>;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Where the credential token lives between runs.
///
/// Only login/logout flows and the session guard's cleanup write to it.
/// `subscribe` delivers a notification whenever another execution context
/// changes the stored value.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str) -> Result<(), StoreError>;
    fn delete(&self) -> Result<(), StoreError>;
    fn subscribe(&self, listener: Listener) -> Subscription;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registered change listeners of one store.
#[derive(Default)]
pub struct ListenerSet {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
    watcher: Mutex<Option<AbortHandle>>,
}

impl ListenerSet {
    pub fn add(self: &Arc<Self>, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).push((id, listener));
        Subscription {
            id,
            listeners: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) {
        let now_empty = {
            let mut listeners = lock(&self.listeners);
            listeners.retain(|(existing, _)| *existing != id);
            listeners.is_empty()
        };
        if now_empty {
            let mut watcher = lock(&self.watcher);
            // A subscriber may have arrived since the check above
            if self.is_empty() {
                if let Some(handle) = watcher.take() {
                    tracing::debug!("Stopping credential watcher, no listeners left");
                    handle.abort();
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.listeners).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify(&self) {
        // Listeners may subscribe or unsubscribe while running
        let snapshot: Vec<Listener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener();
        }
    }

    /// Run `spawn` unless a watcher is already running. The check and the
    /// spawn happen under one lock, so concurrent subscribers start at most
    /// one watcher. Returns whether `spawn` was called.
    fn ensure_watcher(&self, spawn: impl FnOnce() -> Option<AbortHandle>) -> bool {
        let mut watcher = lock(&self.watcher);
        if watcher.is_some() {
            return false;
        }
        *watcher = spawn();
        true
    }

    fn is_watching(&self) -> bool {
        lock(&self.watcher).is_some()
    }
}

/// Scoped registration of a change listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    listeners: Weak<ListenerSet>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// In-process store. Writes through `set`/`delete` do not notify, just like
/// a browser tab does not receive its own storage events; use
/// `simulate_external_change` to play the part of another context.
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
    listeners: Arc<ListenerSet>,
    deletes: AtomicUsize,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::default();
        *lock(&store.token) = Some(token.into());
        store
    }

    pub fn simulate_external_change(&self, token: Option<&str>) {
        *lock(&self.token) = token.map(str::to_string);
        self.listeners.notify();
    }

    /// How many times `delete` has been called
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        lock(&self.token).clone()
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        *lock(&self.token) = Some(token.to_string());
        Ok(())
    }

    fn delete(&self) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        *lock(&self.token) = None;
        Ok(())
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.listeners.add(listener)
    }
}

/// Token kept in a file so that every process on the machine shares it.
///
/// Changes made by other processes are picked up by a polling task that
/// runs while at least one listener is subscribed. Writes made through this
/// handle are recorded first so they are not reported back as external.
pub struct FileCredentialStore {
    path: PathBuf,
    poll_interval: Duration,
    last_seen: Arc<Mutex<Option<String>>>,
    listeners: Arc<ListenerSet>,
}

impl FileCredentialStore {
    /// `poll_interval` is raised to at least one millisecond.
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        let path = path.into();
        let poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        let initial = read_token(&path);
        Self {
            path,
            poll_interval,
            last_seen: Arc::new(Mutex::new(initial)),
            listeners: Arc::new(ListenerSet::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a polling task is currently following the file
    pub fn is_watching(&self) -> bool {
        self.listeners.is_watching()
    }

    fn start_watcher(&self) -> Option<AbortHandle> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("No async runtime, external credential changes will not be observed");
                return None;
            }
        };

        let path = self.path.clone();
        let interval = self.poll_interval;
        let last_seen = self.last_seen.clone();
        let listeners = self.listeners.clone();

        let task = handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let changed = {
                    // Read under the lock so our own writes are never seen half-done
                    let mut last = lock(&last_seen);
                    let current = read_token(&path);
                    if *last != current {
                        *last = current;
                        true
                    } else {
                        false
                    }
                };
                if changed {
                    tracing::debug!("Credential file {} changed externally", path.display());
                    listeners.notify();
                }
            }
        });
        Some(task.abort_handle())
    }
}

fn read_token(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let trimmed = content.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!("Failed to read credential file {}: {}", path.display(), e);
            None
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<String> {
        read_token(&self.path)
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut last = lock(&self.last_seen);
        fs::write(&self.path, token)?;
        *last = Some(token.to_string());
        Ok(())
    }

    fn delete(&self) -> Result<(), StoreError> {
        let mut last = lock(&self.last_seen);
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *last = None;
        Ok(())
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        let subscription = self.listeners.add(listener);
        self.listeners.ensure_watcher(|| self.start_watcher());
        subscription
    }
}
