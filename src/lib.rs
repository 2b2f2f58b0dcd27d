//! Leader election and key-watch client for the planet node runtime.
//!
//! This crate is the hard core of "planet"'s cluster coordination: it
//! lets any number of nodes campaign for a named role by holding a
//! short-lived lease ([`Session::add_voter`]) and observe value
//! transitions on arbitrary keys with exactly-once delivery of each
//! distinct value ([`Session::add_watch`] / [`Session::add_watch_callback`]),
//! all against an externally operated, consistent key-value store.
//!
//! The store itself, container supervision, overlay networking, and
//! CLI/config parsing are out of scope: callers provide a
//! [`StoreClient`] implementation, and this crate consumes it, a
//! [`Clock`], and `tracing` for structured logging.
//!
//! No quorum membership changes, multi-key atomic operations, value
//! history beyond the last seen value, or leader fencing tokens are
//! provided; callers that need fencing must encode it in the value
//! they campaign with.

mod backoff;
mod callback;
pub mod clock;
pub mod error;
mod session;
pub mod store;
pub mod testing;
mod types;
mod voter;
mod watcher;

pub use clock::{Clock, SystemClock};
pub use error::{Error, StoreError};
pub use session::{Config, ConfigBuilder, Session};
pub use store::{StoreClient, StoreEntry, StoreEvent};
pub use types::{Key, Revision, Value};
