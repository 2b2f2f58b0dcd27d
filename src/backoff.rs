//! Exponential backoff with reset, per the spec's Backoff component.
//!
//! Doubles on each call, clamped to `[initial, max]`, with a `reset`
//! that zeroes the try counter. `tries` is exposed so callers can
//! change strategy after N consecutive failures (the watcher's
//! unknown-error-storm counter in [`crate::watcher`] is built on top
//! of it rather than duplicating it).

use std::time::Duration;

use crate::clock::Clock;
use crate::error::Cancelled;

/// Exponential delay generator.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
    tries: u32,
}

impl Backoff {
    /// Build a backoff bounded by `[initial, max]`.
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
            tries: 0,
        }
    }

    /// Number of delays produced since construction or the last [`Self::reset`].
    #[must_use]
    pub fn tries(&self) -> u32 {
        self.tries
    }

    /// Produce the next delay and double the internal counter for next time.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        self.tries += 1;
        delay
    }

    /// Return the counter to zero.
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.tries = 0;
    }

    /// Sleep for [`Self::next_delay`], cancellable by `cancel`.
    ///
    /// Returns `Err(Cancelled)` if the session closed before the delay
    /// elapsed, `Ok(())` otherwise.
    pub async fn sleep(
        &mut self,
        clock: &dyn Clock,
        cancel: &mut tokio::sync::watch::Receiver<()>,
    ) -> Result<(), Cancelled> {
        let delay = self.next_delay();
        tokio::select! {
            () = clock.sleep(delay) => Ok(()),
            _ = cancel.changed() => Err(Cancelled),
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_up_to_max_and_resets() {
        let mut b = Backoff::new(Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(b.next_delay(), Duration::from_millis(100));
        assert_eq!(b.next_delay(), Duration::from_millis(200));
        assert_eq!(b.next_delay(), Duration::from_millis(400));
        assert_eq!(b.next_delay(), Duration::from_millis(800));
        assert_eq!(b.next_delay(), Duration::from_secs(1)); // clamped
        assert_eq!(b.tries(), 5);
        b.reset();
        assert_eq!(b.tries(), 0);
        assert_eq!(b.next_delay(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn sleep_is_interrupted_by_cancellation() {
        tokio::time::pause();
        let mut b = Backoff::new(Duration::from_secs(60), Duration::from_secs(60));
        let (tx, mut rx) = tokio::sync::watch::channel(());
        let clock = crate::clock::SystemClock;
        let fut = tokio::spawn(async move { b.sleep(&clock, &mut rx).await });
        tx.send(()).unwrap();
        let result = fut.await.unwrap();
        assert!(result.is_err());
    }
}
