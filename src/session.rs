//! The Session: the owning handle that bounds the lifetime of all
//! voters and watchers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::sync::watch;

use crate::clock::{Clock, SystemClock};
use crate::error::Error;
use crate::store::StoreClient;
use crate::types::{Key, Value};
use crate::voter::{self, Voter};
use crate::watcher::Watcher;

/// Per-RPC header deadline used when talking to the store, and the
/// default retry period callers may fall back to when registering a
/// watch.
const DEFAULT_HEADER_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for a [`Session`].
///
/// Built via [`ConfigBuilder`]; `endpoints` exists to name the store
/// cluster a session is bound to (surfaced in tracing spans and
/// validated per the spec's boundary behavior), while `store` is the
/// already-constructed client this session drives — connecting to the
/// store is external to this crate, per its scope.
pub struct Config {
    endpoints: Vec<String>,
    header_timeout_per_request: Duration,
    clock: Arc<dyn Clock>,
    store: Arc<dyn StoreClient>,
}

/// Builder for [`Config`], validated by [`ConfigBuilder::finish`].
pub struct ConfigBuilder {
    endpoints: Vec<String>,
    header_timeout_per_request: Duration,
    clock: Arc<dyn Clock>,
    store: Option<Arc<dyn StoreClient>>,
}

impl ConfigBuilder {
    /// Start a builder with the real-time clock and a 1s header timeout.
    #[must_use]
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self {
            endpoints: Vec::new(),
            header_timeout_per_request: DEFAULT_HEADER_TIMEOUT,
            clock: Arc::new(SystemClock),
            store: Some(store),
        }
    }

    /// Set the store endpoints this session is bound to. At least one is required.
    #[must_use]
    pub fn endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Override the per-request header timeout (default: 1s).
    #[must_use]
    pub fn header_timeout_per_request(mut self, timeout: Duration) -> Self {
        self.header_timeout_per_request = timeout;
        self
    }

    /// Inject a non-default clock, e.g. for deterministic tests.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate and freeze this configuration.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if no endpoints were configured.
    pub fn finish(self) -> Result<Config, Error> {
        if self.endpoints.is_empty() {
            return Err(Error::Config("need at least one endpoint"));
        }
        Ok(Config {
            endpoints: self.endpoints,
            header_timeout_per_request: self.header_timeout_per_request,
            clock: self.clock,
            store: self.store.expect("store is always set by ConfigBuilder::new"),
        })
    }
}

/// The process-wide handle owning every voter and watcher task
/// registered against it, providing idempotent shutdown.
pub struct Session {
    store: Arc<dyn StoreClient>,
    clock: Arc<dyn Clock>,
    closed: AtomicBool,
    cancel_tx: watch::Sender<()>,
    cancel_rx: watch::Receiver<()>,
}

impl Session {
    /// Open a session bound to `config`.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `config` was built without
    /// endpoints (only reachable if a caller hand-built an invalid
    /// [`Config`] bypassing [`ConfigBuilder::finish`]'s own check).
    pub fn open(config: Config) -> Result<Self, Error> {
        if config.endpoints.is_empty() {
            return Err(Error::Config("need at least one endpoint"));
        }
        tracing::info!(endpoints = ?config.endpoints, header_timeout = ?config.header_timeout_per_request, "session opened");
        let (cancel_tx, cancel_rx) = watch::channel(());
        Ok(Self {
            store: config.store,
            clock: config.clock,
            closed: AtomicBool::new(false),
            cancel_tx,
            cancel_rx,
        })
    }

    /// Launch a campaigner for `(key, value, term)`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidVoter`] synchronously if `value` is
    /// empty or `term` is shorter than 1 second.
    pub fn add_voter(&self, key: impl Into<Key>, value: impl Into<Value>, term: Duration) -> Result<(), Error> {
        let value = value.into();
        voter::validate(&value, term).map_err(Error::InvalidVoter)?;
        let voter = Voter::new(
            self.store.clone(),
            key.into(),
            value,
            term,
            self.clock.clone(),
            self.cancel_rx.clone(),
        );
        tokio::spawn(voter.run());
        Ok(())
    }

    /// Subscribe to every distinct non-empty value a key takes on,
    /// starting with its current value.
    ///
    /// No task is spawned for a plain watch: the returned stream only
    /// makes progress as the caller polls it, exactly like the
    /// underlying store watch it wraps.
    pub fn add_watch(&self, key: impl Into<Key>, retry_period: Duration) -> impl Stream<Item = Value> {
        Watcher::new(
            self.store.clone(),
            key.into(),
            retry_period,
            self.clock.clone(),
            self.cancel_rx.clone(),
        )
        .run()
    }

    /// Subscribe to every value transition `(key, prev, new)`, driven
    /// by a background task for the lifetime of the session.
    pub fn add_watch_callback<F>(&self, key: impl Into<Key>, retry_period: Duration, f: F)
    where
        F: FnMut(&Key, &Value, &Value) + Send + 'static,
    {
        let key = key.into();
        let watcher = Watcher::new(
            self.store.clone(),
            key.clone(),
            retry_period,
            self.clock.clone(),
            self.cancel_rx.clone(),
        );
        tokio::spawn(async move {
            let stream = watcher.run();
            tokio::pin!(stream);
            crate::callback::drive(key, stream, f).await;
        });
    }

    /// Idempotent shutdown: closes the cancellation signal exactly
    /// once, across any number of concurrent calls.
    ///
    /// Non-blocking and best-effort: tasks observe cancellation within
    /// one loop iteration but in-flight store requests (including a
    /// just-started lease renewal) are allowed to complete naturally,
    /// so a voter's lease can outlive this call by up to one term.
    pub fn close(&self) {
        if self.closed.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
            let _ = self.cancel_tx.send(());
        }
    }
}
