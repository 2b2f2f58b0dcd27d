//! An in-process [`StoreClient`] used by this crate's own test suite.
//!
//! `MemoryStore` is not a production store: real deployments bring an
//! external client (e.g. etcd-backed) per the crate's scope. It exists
//! so the voter, watcher, and session tests — including the
//! compaction and error-storm scenarios — run without a live cluster.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_stream::stream;
use futures::stream::BoxStream;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::error::StoreError;
use crate::store::{StoreClient, StoreEntry, StoreEvent};
use crate::types::{Key, Revision, Value};

#[derive(Debug, Clone)]
struct Record {
    value: Value,
    mod_index: Revision,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
enum Msg {
    Event { key: String, event: StoreEvent },
    Compacted { key: String },
    Error { key: String },
}

/// A simple, single-process map with CAS semantics and a broadcast
/// watch channel, standing in for a real key-value store in tests.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Record>>,
    revision: AtomicI64,
    tx: broadcast::Sender<Msg>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(256);
        Self {
            entries: Mutex::new(HashMap::new()),
            revision: AtomicI64::new(0),
            tx,
        }
    }

    /// Test convenience: create `key` with `value` directly, bypassing CAS.
    pub async fn seed(&self, key: &str, value: &str, ttl: Duration) {
        let mod_index = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let record = Record {
            value: value.into(),
            mod_index,
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().unwrap().insert(key.to_string(), record.clone());
        let _ = self.tx.send(Msg::Event {
            key: key.to_string(),
            event: StoreEvent {
                value: record.value,
                mod_index,
            },
        });
    }

    /// Test convenience: remove `key` and notify watchers with an empty value.
    pub async fn delete(&self, key: &str) {
        let mod_index = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        self.entries.lock().unwrap().remove(key);
        let _ = self.tx.send(Msg::Event {
            key: key.to_string(),
            event: StoreEvent {
                value: Value::empty(),
                mod_index,
            },
        });
    }

    /// Simulate the store reporting that `key`'s watched revision was compacted.
    pub fn inject_compaction(&self, key: &str) {
        let _ = self.tx.send(Msg::Compacted { key: key.to_string() });
    }

    /// Test convenience: simulate a lease's TTL having already elapsed,
    /// as if its holder crashed and stopped renewing, without waiting
    /// out the real TTL.
    pub fn expire_now(&self, key: &str) {
        if let Some(record) = self.entries.lock().unwrap().get_mut(key) {
            record.expires_at = Instant::now();
        }
    }

    /// Simulate `count` consecutive unrecognized watch errors on `key`.
    pub fn inject_unknown_errors(&self, key: &str, count: usize) {
        for _ in 0..count {
            let _ = self.tx.send(Msg::Error { key: key.to_string() });
        }
    }
}

#[derive(Debug, Default, thiserror::Error)]
#[error("compare-and-swap precondition not met")]
struct CasRejected;

#[derive(Debug, Default, thiserror::Error)]
#[error("simulated unrecognized store error")]
struct Simulated;

#[async_trait::async_trait]
impl StoreClient for MemoryStore {
    async fn get(&self, key: &Key) -> Result<StoreEntry, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key.as_str()) {
            Some(record) if record.expires_at > Instant::now() => Ok(StoreEntry {
                value: record.value.clone(),
                mod_index: record.mod_index,
                ttl: record.expires_at.saturating_duration_since(Instant::now()),
            }),
            Some(_expired) => {
                entries.remove(key.as_str());
                Err(StoreError::NotFound)
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn create(&self, key: &Key, value: &Value, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        if entries.get(key.as_str()).is_some_and(|record| record.expires_at > now) {
            return Err(StoreError::NodeExists);
        }
        let mod_index = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        entries.insert(
            key.as_str().to_string(),
            Record {
                value: value.clone(),
                mod_index,
                expires_at: Instant::now() + ttl,
            },
        );
        let _ = self.tx.send(Msg::Event {
            key: key.as_str().to_string(),
            event: StoreEvent {
                value: value.clone(),
                mod_index,
            },
        });
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &Key,
        value: &Value,
        ttl: Duration,
        prev_value: &Value,
        prev_index: Revision,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        let now = Instant::now();
        let matches = matches!(
            entries.get(key.as_str()),
            Some(record) if record.expires_at > now && &record.value == prev_value && record.mod_index == prev_index
        );
        if !matches {
            return Err(StoreError::Cluster(Box::new(CasRejected)));
        }
        let mod_index = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        entries.insert(
            key.as_str().to_string(),
            Record {
                value: value.clone(),
                mod_index,
                expires_at: Instant::now() + ttl,
            },
        );
        let _ = self.tx.send(Msg::Event {
            key: key.as_str().to_string(),
            event: StoreEvent {
                value: value.clone(),
                mod_index,
            },
        });
        Ok(())
    }

    fn watch(&self, key: &Key, after_index: Revision) -> BoxStream<'static, Result<StoreEvent, StoreError>> {
        let key = key.as_str().to_string();
        let mut rx = self.tx.subscribe();
        Box::pin(stream! {
            loop {
                match rx.recv().await {
                    Ok(Msg::Event { key: k, event }) if k == key && event.mod_index > after_index => {
                        yield Ok(event);
                    }
                    Ok(Msg::Event { .. }) => continue,
                    Ok(Msg::Compacted { key: k }) if k == key => {
                        yield Err(StoreError::EventIndexCleared);
                    }
                    Ok(Msg::Compacted { .. }) => continue,
                    Ok(Msg::Error { key: k }) if k == key => {
                        yield Err(StoreError::Other(Box::new(Simulated)));
                    }
                    Ok(Msg::Error { .. }) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        yield Err(StoreError::Cluster(Box::new(Simulated)));
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        })
    }
}
