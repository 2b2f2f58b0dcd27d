//! Error taxonomy.
//!
//! [`Error`] is returned synchronously from the registration surface
//! (`Session::add_voter`, `ConfigBuilder::finish`, ...). [`StoreError`]
//! never crosses that boundary: voter and watcher loops match on it
//! internally and either retry, self-heal, or log, per the
//! propagation policy described on [`crate::session::Session`].

use std::error::Error as StdError;

/// Errors returned synchronously from the public API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid [`crate::session::Config`] (e.g. no endpoints configured).
    #[error("configuration error: {0}")]
    Config(&'static str),
    /// A precondition of [`crate::session::Session::add_voter`] was violated.
    #[error("invalid voter arguments: {0}")]
    InvalidVoter(&'static str),
}

/// Error kinds a [`crate::store::StoreClient`] implementation must be able to report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key does not exist.
    #[error("key not found")]
    NotFound,
    /// A `create-if-not-exists` write lost because the key already existed.
    #[error("key already exists")]
    NodeExists,
    /// The watch's `after_index` fell out of the store's retained history.
    #[error("watched revision was compacted")]
    EventIndexCleared,
    /// A transport/cluster-level failure. May wrap cancellation.
    #[error("cluster error: {0}")]
    Cluster(#[source] Box<dyn StdError + Send + Sync>),
    /// Any other store failure, not otherwise classified.
    #[error("store error: {0}")]
    Other(#[source] Box<dyn StdError + Send + Sync>),
}

impl StoreError {
    /// `true` if this error is, or wraps, a session-cancellation signal
    /// rather than a genuine failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StoreError::Cluster(source) if source.downcast_ref::<Cancelled>().is_some())
    }
}

/// Marker error used by [`StoreError::Cluster`] to signal that a store
/// operation observed the session's cancellation rather than a real
/// transport failure.
#[derive(Debug, Default, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;
