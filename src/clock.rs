//! Injectable time source.
//!
//! The voter and watcher loops never call [`tokio::time::sleep`] or
//! [`std::time::Instant::now`] directly; everything goes through a
//! `Clock` so tests can run the backoff, TTL, and tick math under
//! `tokio::time::pause`/`advance` without depending on wall-clock
//! behavior.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

/// A future that resolves once a requested duration has elapsed.
pub type Sleep = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Capability interface for time, per the Session's "Dynamic dispatch" design note.
pub trait Clock: Send + Sync {
    /// The current monotonic instant.
    fn now(&self) -> Instant;

    /// A future that resolves after `duration` has elapsed.
    fn sleep(&self, duration: Duration) -> Sleep;
}

/// The default, real-time clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> Sleep {
        Box::pin(tokio::time::sleep(duration))
    }
}
