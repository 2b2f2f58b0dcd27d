//! The external store contract the session is built on top of.
//!
//! This crate does not ship a production [`StoreClient`] — the actual
//! key-value store (etcd or equivalent) is an external collaborator,
//! per the top-level scope. Callers bring their own implementation;
//! [`crate::testing::MemoryStore`] exists only to exercise this crate's
//! own test suite.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::StoreError;
use crate::types::{Key, Revision, Value};

/// A snapshot of a key: its current value, TTL, and the revision that
/// last wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    /// The value currently stored under the key.
    pub value: Value,
    /// The revision (`ModifiedIndex`) of the write that produced this value.
    pub mod_index: Revision,
    /// Remaining time-to-live as of this read (the store's lease
    /// expiry minus now), not the original TTL the lease was created
    /// with.
    pub ttl: Duration,
}

/// A single value transition observed on a watch stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    /// The value as of this event. Empty means the key was deleted.
    pub value: Value,
    /// The revision this event was observed at.
    pub mod_index: Revision,
}

/// CRUD-plus-watch access to a single key, with CAS preconditions and
/// TTL leases, as required by the Store contract table.
///
/// Implementations must be cheaply cloneable/shareable: the session
/// hands the same client to every voter and watcher task it spawns.
#[async_trait]
pub trait StoreClient: Send + Sync + 'static {
    /// Fetch the current value of `key`.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the key does not exist.
    async fn get(&self, key: &Key) -> Result<StoreEntry, StoreError>;

    /// Atomically create `key` with `value` and `ttl`, failing if it
    /// already exists.
    ///
    /// # Errors
    /// Returns [`StoreError::NodeExists`] if the key is already present.
    async fn create(&self, key: &Key, value: &Value, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically replace `key`'s value, conditioned on it still
    /// holding `prev_value` at revision `prev_index`.
    ///
    /// # Errors
    /// Returns a cluster error (never a distinguished "CAS failed"
    /// variant — the caller re-reads via [`Self::get`] to learn why,
    /// mirroring a real store's rejected-compare-and-swap response)
    /// when the precondition does not hold.
    async fn compare_and_swap(
        &self,
        key: &Key,
        value: &Value,
        ttl: Duration,
        prev_value: &Value,
        prev_index: Revision,
    ) -> Result<(), StoreError>;

    /// An infinite stream of value transitions on `key`, starting
    /// strictly after `after_index`.
    fn watch(&self, key: &Key, after_index: Revision) -> BoxStream<'static, Result<StoreEvent, StoreError>>;
}
