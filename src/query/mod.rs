//! Query cache with explicit invalidation, plus the version-gated poller on top of it

pub mod fetch;
pub mod versioned;

use chrono::{DateTime, Local};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub use fetch::{FetchError, HttpFetcher, JsonFetcher};
pub use versioned::{VersionCursor, VersionGate, VersionedQuery, VersionedQueryOptions};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryPart {
    Version,
    Data,
}

/// `[name, part]`, e.g. `events/data`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub name: String,
    pub part: QueryPart,
}

impl QueryKey {
    pub fn version(name: &str) -> Self {
        Self {
            name: name.to_string(),
            part: QueryPart::Version,
        }
    }

    pub fn data(name: &str) -> Self {
        Self {
            name: name.to_string(),
            part: QueryPart::Data,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = match self.part {
            QueryPart::Version => "version",
            QueryPart::Data => "data",
        };
        write!(f, "{}/{}", self.name, part)
    }
}

/// Control messages for a polling loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Refetch,
    Stop,
}

/// Marks cached queries stale so their owners fetch again
pub trait Cache: Send + 'static {
    fn invalidate(&self, key: &QueryKey);
}

/// Client-wide query defaults
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryDefaults {
    /// Extra attempts after a failed fetch
    pub retry: u32,
    pub retry_delay: Duration,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            retry: 1,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// What a caller sees of a query
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuerySnapshot {
    pub data: Option<Value>,
    pub is_loading: bool,
    pub is_stale: bool,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Local>>,
    pub failure_count: u32,
}

#[derive(Default)]
struct Entry {
    state: QuerySnapshot,
    subscribers: Vec<Sender<Signal>>,
}

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Inner {
    entries: HashMap<QueryKey, Entry>,
    listener: Option<Listener>,
}

/// Shared query cache, cheap to clone
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Mutex<Inner>>,
    defaults: QueryDefaults,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(QueryDefaults::default())
    }
}

impl QueryClient {
    pub fn new(defaults: QueryDefaults) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            defaults,
        }
    }

    pub fn defaults(&self) -> QueryDefaults {
        self.defaults
    }

    /// Called after every state change, e.g. to request a repaint
    pub fn set_listener(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.lock().listener = Some(Arc::new(listener));
    }

    /// Register a loop to be woken with [`Signal::Refetch`] when `key` is invalidated.
    pub fn subscribe(&self, key: &QueryKey, tx: Sender<Signal>) {
        self.lock()
            .entries
            .entry(key.clone())
            .or_default()
            .subscribers
            .push(tx);
    }

    pub fn snapshot(&self, key: &QueryKey) -> QuerySnapshot {
        self.lock()
            .entries
            .get(key)
            .map(|e| e.state.clone())
            .unwrap_or_default()
    }

    pub fn begin_fetch(&self, key: &QueryKey) {
        self.update(key, |state| state.is_loading = true);
    }

    pub fn set_data(&self, key: &QueryKey, data: Value) {
        self.update(key, |state| {
            state.data = Some(data);
            state.error = None;
            state.is_loading = false;
            state.is_stale = false;
            state.failure_count = 0;
            state.updated_at = Some(Local::now());
        });
    }

    /// Keeps the previous data, only the error state changes
    pub fn set_error(&self, key: &QueryKey, error: &FetchError) {
        let message = error.to_string();
        self.update(key, |state| {
            state.error = Some(message);
            state.is_loading = false;
            state.failure_count += 1;
        });
    }

    /// Forget a query and its subscribers
    pub fn remove(&self, key: &QueryKey) {
        self.lock().entries.remove(key);
    }

    fn update(&self, key: &QueryKey, f: impl FnOnce(&mut QuerySnapshot)) {
        let listener = {
            let mut inner = self.lock();
            f(&mut inner.entries.entry(key.clone()).or_default().state);
            inner.listener.clone()
        };
        if let Some(listener) = listener {
            listener();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Cache for QueryClient {
    fn invalidate(&self, key: &QueryKey) {
        let mut inner = self.lock();
        let entry = inner.entries.entry(key.clone()).or_default();
        entry.state.is_stale = true;
        entry
            .subscribers
            .retain(|tx| tx.send(Signal::Refetch).is_ok());
        tracing::debug!(%key, subscribers = entry.subscribers.len(), "query invalidated");
    }
}
