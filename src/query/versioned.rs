//! Version-gated polling
//!
//! A cheap version endpoint is polled on a fixed interval. The data endpoint
//! is fetched once on mount and afterwards only when the version changes.

use super::{Cache, FetchError, JsonFetcher, QueryClient, QueryKey, QuerySnapshot, Signal};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_REFETCH_INTERVAL: Duration = Duration::from_secs(10);

pub type Select = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Version tokens are equal if they are the same JSON value, or both numbers
/// with the same numeric value (`1` and `1.0`).
pub fn same_version(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Last seen version token
#[derive(Clone, Debug, Default)]
pub struct VersionCursor {
    last: Option<Value>,
}

impl VersionCursor {
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Store `token`; true only if an earlier token existed and differs.
    pub fn observe(&mut self, token: Value) -> bool {
        let changed = matches!(&self.last, Some(prev) if !same_version(prev, &token));
        self.last = Some(token);
        changed
    }

    pub fn last(&self) -> Option<&Value> {
        self.last.as_ref()
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Cursor bound to the cache entry it invalidates
pub struct VersionGate<C: Cache> {
    cursor: VersionCursor,
    cache: C,
    data_key: QueryKey,
}

impl<C: Cache> VersionGate<C> {
    pub fn new(cache: C, data_key: QueryKey) -> Self {
        Self {
            cursor: VersionCursor::new(),
            cache,
            data_key,
        }
    }

    /// Feed a freshly polled version. Returns true if the data was invalidated.
    pub fn on_version(&mut self, version: Value) -> bool {
        let changed = self.cursor.observe(version);
        if changed {
            tracing::info!(key = %self.data_key, version = ?self.cursor.last(), "version changed, reloading data");
            self.cache.invalidate(&self.data_key);
        }
        changed
    }

    /// Errors leave the cursor untouched.
    pub fn on_error(&self, error: &FetchError) {
        tracing::error!(key = %self.data_key, error = %error, "version query failed");
    }

    pub fn cursor(&self) -> &VersionCursor {
        &self.cursor
    }

    fn reset(&mut self) {
        self.cursor.reset();
    }
}

#[derive(Clone)]
pub struct VersionedQueryOptions {
    pub key: String,
    pub version_url: String,
    pub data_url: String,
    pub select: Option<Select>,
    pub refetch_interval: Duration,
}

impl VersionedQueryOptions {
    pub fn new(key: &str, version_url: &str, data_url: &str) -> Self {
        Self {
            key: key.to_string(),
            version_url: version_url.to_string(),
            data_url: data_url.to_string(),
            select: None,
            refetch_interval: DEFAULT_REFETCH_INTERVAL,
        }
    }

    pub fn with_select(mut self, select: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.select = Some(Arc::new(select));
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = interval;
        self
    }
}

/// A running version poller and its data loop.
///
/// Stopping never waits for a request in flight: the loops are told to quit
/// and whatever they fetch afterwards is discarded.
pub struct VersionedQuery {
    client: QueryClient,
    data_key: QueryKey,
    version_tx: Sender<Signal>,
    data_tx: Sender<Signal>,
    cancelled: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl VersionedQuery {
    pub fn spawn(
        options: VersionedQueryOptions,
        client: QueryClient,
        fetcher: Arc<dyn JsonFetcher>,
    ) -> Self {
        let data_key = QueryKey::data(&options.key);
        let version_key = QueryKey::version(&options.key);
        let cancelled = Arc::new(AtomicBool::new(false));

        let (version_tx, version_rx) = mpsc::channel();
        let (data_tx, data_rx) = mpsc::channel();
        client.subscribe(&data_key, data_tx.clone());

        let mut handles = Vec::with_capacity(2);

        let data_loop = DataLoop {
            key: data_key.clone(),
            url: options.data_url.clone(),
            select: options.select.clone(),
            client: client.clone(),
            fetcher: Arc::clone(&fetcher),
            cancelled: Arc::clone(&cancelled),
        };
        match thread::Builder::new()
            .name(format!("{}-data", options.key))
            .spawn(move || data_loop.run(data_rx))
        {
            Ok(h) => handles.push(h),
            Err(e) => tracing::error!(key = %data_key, error = %e, "failed to spawn data loop"),
        }

        let version_loop = VersionLoop {
            key: version_key,
            url: options.version_url.clone(),
            interval: options.refetch_interval,
            gate: VersionGate::new(client.clone(), data_key.clone()),
            client: client.clone(),
            fetcher,
            cancelled: Arc::clone(&cancelled),
        };
        match thread::Builder::new()
            .name(format!("{}-version", options.key))
            .spawn(move || version_loop.run(version_rx))
        {
            Ok(h) => handles.push(h),
            Err(e) => tracing::error!(key = %data_key, error = %e, "failed to spawn version loop"),
        }

        Self {
            client,
            data_key,
            version_tx,
            data_tx,
            cancelled,
            handles,
        }
    }

    /// Current data, loading and error state
    pub fn snapshot(&self) -> QuerySnapshot {
        self.client.snapshot(&self.data_key)
    }

    pub fn key(&self) -> &QueryKey {
        &self.data_key
    }

    /// Force a data reload without waiting for a version change
    pub fn refetch(&self) {
        let _ = self.data_tx.send(Signal::Refetch);
    }

    /// Tell both loops to finish. Returns immediately.
    pub fn stop(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.version_tx.send(Signal::Stop);
        let _ = self.data_tx.send(Signal::Stop);
        tracing::debug!(key = %self.data_key, "query stopped");
    }

    /// Stop and wait until both loops have exited
    pub fn join(mut self) {
        self.stop();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for VersionedQuery {
    fn drop(&mut self) {
        // Loops still finishing a request detach and exit on their own
        self.stop();
    }
}

struct VersionLoop {
    key: QueryKey,
    url: String,
    interval: Duration,
    gate: VersionGate<QueryClient>,
    client: QueryClient,
    fetcher: Arc<dyn JsonFetcher>,
    cancelled: Arc<AtomicBool>,
}

impl VersionLoop {
    fn run(mut self, rx: Receiver<Signal>) {
        tracing::debug!(key = %self.key, interval_ms = self.interval.as_millis() as u64, "version loop started");
        loop {
            if !self.poll(&rx) {
                break;
            }
            match rx.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) | Ok(Signal::Refetch) => continue,
                Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.gate.reset();
        tracing::debug!(key = %self.key, "version loop stopped");
    }

    /// False once the loop was told to stop while polling
    fn poll(&mut self, rx: &Receiver<Signal>) -> bool {
        self.client.begin_fetch(&self.key);
        let result = fetch_with_retry(&self.client, rx, || {
            let body = self.fetcher.get_json(&self.url)?;
            body.get("version")
                .cloned()
                .ok_or_else(|| FetchError::MissingField {
                    url: self.url.clone(),
                    field: "version",
                })
        });
        if self.cancelled.load(Ordering::SeqCst) {
            return false;
        }
        match result {
            Some(Ok(version)) => {
                self.client.set_data(&self.key, version.clone());
                self.gate.on_version(version);
                true
            }
            Some(Err(e)) => {
                self.client.set_error(&self.key, &e);
                self.gate.on_error(&e);
                true
            }
            None => false,
        }
    }
}

struct DataLoop {
    key: QueryKey,
    url: String,
    select: Option<Select>,
    client: QueryClient,
    fetcher: Arc<dyn JsonFetcher>,
    cancelled: Arc<AtomicBool>,
}

impl DataLoop {
    fn run(self, rx: Receiver<Signal>) {
        // Initial load on mount
        if !self.fetch(&rx) {
            return;
        }
        while let Ok(signal) = rx.recv() {
            if signal == Signal::Stop {
                break;
            }
            // Several invalidations queued up behind one fetch collapse into it
            let mut stop = false;
            while let Ok(queued) = rx.try_recv() {
                if queued == Signal::Stop {
                    stop = true;
                }
            }
            if stop || !self.fetch(&rx) {
                break;
            }
        }
        tracing::debug!(key = %self.key, "data loop stopped");
    }

    /// False once the loop was told to stop while fetching
    fn fetch(&self, rx: &Receiver<Signal>) -> bool {
        self.client.begin_fetch(&self.key);
        let result = fetch_with_retry(&self.client, rx, || {
            let body = self.fetcher.get_json(&self.url)?;
            Ok(match &self.select {
                Some(select) => select(body),
                None => body,
            })
        });
        if self.cancelled.load(Ordering::SeqCst) {
            tracing::debug!(key = %self.key, "discarding result of a stopped query");
            return false;
        }
        match result {
            Some(Ok(data)) => {
                tracing::debug!(key = %self.key, "data refreshed");
                self.client.set_data(&self.key, data);
                true
            }
            Some(Err(e)) => {
                tracing::error!(key = %self.key, error = %e, "data query failed");
                self.client.set_error(&self.key, &e);
                true
            }
            None => false,
        }
    }
}

/// Run `attempt` with the client's retry policy. `None` means a stop arrived
/// while waiting between attempts.
fn fetch_with_retry<T>(
    client: &QueryClient,
    rx: &Receiver<Signal>,
    mut attempt: impl FnMut() -> Result<T, FetchError>,
) -> Option<Result<T, FetchError>> {
    let defaults = client.defaults();
    let mut tries = 0;
    loop {
        match attempt() {
            Ok(v) => return Some(Ok(v)),
            Err(e) if tries >= defaults.retry => return Some(Err(e)),
            Err(e) => {
                tries += 1;
                tracing::warn!(error = %e, attempt = tries, "fetch failed, retrying");
                match rx.recv_timeout(defaults.retry_delay) {
                    Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => return None,
                    Ok(Signal::Refetch) | Err(RecvTimeoutError::Timeout) => {}
                }
            }
        }
    }
}
