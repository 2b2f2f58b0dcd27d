//! The FirstValue probe and the long-lived Watcher loop.
//!
//! A [`Watcher`] emits each distinct non-empty value taken by a key
//! exactly once, self-healing across disconnects, compaction, and
//! error storms, until the session is cancelled.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::{Stream, StreamExt};
use tokio::sync::watch;

use crate::backoff::Backoff;
use crate::clock::Clock;
use crate::error::StoreError;
use crate::store::StoreClient;
use crate::types::{Key, Revision, Value};

/// Consecutive unrecognized watch errors tolerated before forcing a
/// full re-snapshot, per the Watcher loop's error tie-break order.
const MAX_CONSECUTIVE_UNKNOWN_ERRORS: u32 = 10;

/// Blocking read of the current value of `key`, retrying until a
/// value exists or the session is cancelled.
///
/// Returns `None` on cancellation ("no result, no error", so callers
/// can distinguish shutdown from failure) and `Some((value,
/// revision))` as soon as one is observed.
pub(crate) async fn first_value(
    store: &dyn StoreClient,
    key: &Key,
    retry_period: Duration,
    clock: &dyn Clock,
    cancel: &mut watch::Receiver<()>,
) -> Option<(Value, Revision)> {
    loop {
        match store.get(key).await {
            Ok(entry) => return Some((entry.value, entry.mod_index)),
            Err(StoreError::NotFound) => {
                tracing::trace!(%key, "no value yet, retrying");
            }
            Err(err) => {
                tracing::warn!(%key, error = %err, "error probing for first value, retrying");
            }
        }
        tokio::select! {
            () = clock.sleep(retry_period) => {}
            _ = cancel.changed() => return None,
        }
    }
}

/// A long-lived observer of a single key's value transitions.
pub struct Watcher {
    store: Arc<dyn StoreClient>,
    key: Key,
    retry_period: Duration,
    clock: Arc<dyn Clock>,
    cancel: watch::Receiver<()>,
}

impl Watcher {
    pub(crate) fn new(
        store: Arc<dyn StoreClient>,
        key: Key,
        retry_period: Duration,
        clock: Arc<dyn Clock>,
        cancel: watch::Receiver<()>,
    ) -> Self {
        Self {
            store,
            key,
            retry_period,
            clock,
            cancel,
        }
    }

    /// Run the watcher, producing an infinite stream of distinct
    /// non-empty values until the session closes.
    pub fn run(mut self) -> impl Stream<Item = Value> + Send {
        stream! {
            'resnapshot: loop {
                let Some((value, mut after_index)) =
                    first_value(&*self.store, &self.key, self.retry_period, &*self.clock, &mut self.cancel).await
                else {
                    return;
                };
                if !value.is_empty() {
                    yield value;
                }

                let mut backoff = Backoff::default();
                let mut unknown_errors: u32 = 0;
                let mut watch_stream = self.store.watch(&self.key, after_index);

                loop {
                    let next = tokio::select! {
                        item = watch_stream.next() => item,
                        _ = self.cancel.changed() => return,
                    };
                    match next {
                        None => {
                            // The underlying stream is genuinely dead (unlike a one-off
                            // error item, there is nothing left to poll), so this is the
                            // one case where re-establishing it is actually required.
                            tracing::debug!(key = %self.key, "watch stream ended, restarting");
                            if backoff.sleep(&*self.clock, &mut self.cancel).await.is_err() {
                                return;
                            }
                            watch_stream = self.store.watch(&self.key, after_index);
                        }
                        Some(Ok(event)) => {
                            after_index = event.mod_index;
                            if event.value.is_empty() {
                                continue;
                            }
                            backoff.reset();
                            unknown_errors = 0;
                            yield event.value;
                        }
                        Some(Err(err)) if err.is_cancelled() => return,
                        Some(Err(StoreError::EventIndexCleared)) => {
                            tracing::info!(key = %self.key, "watch revision compacted, re-snapshotting");
                            continue 'resnapshot;
                        }
                        Some(Err(err @ StoreError::Cluster(_))) => {
                            // Same watcher, same stream: only the timing of the next
                            // poll changes.
                            tracing::warn!(key = %self.key, error = %err, "cluster error, backing off");
                            if backoff.sleep(&*self.clock, &mut self.cancel).await.is_err() {
                                return;
                            }
                        }
                        Some(Err(err)) => {
                            unknown_errors += 1;
                            tracing::warn!(key = %self.key, error = %err, unknown_errors, "unrecognized watch error");
                            if backoff.sleep(&*self.clock, &mut self.cancel).await.is_err() {
                                return;
                            }
                            if unknown_errors > MAX_CONSECUTIVE_UNKNOWN_ERRORS {
                                tracing::warn!(key = %self.key, "too many unrecognized errors, forcing re-snapshot");
                                continue 'resnapshot;
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::testing::MemoryStore;

    #[tokio::test]
    async fn first_emission_is_the_current_value() {
        let store = MemoryStore::new();
        store.seed("role", "A", Duration::from_secs(5)).await;
        let (_tx, cancel) = watch::channel(());
        let (value, _rev) = first_value(&store, &"role".into(), Duration::from_millis(10), &SystemClock, &mut cancel.clone())
            .await
            .expect("not cancelled");
        assert_eq!(value.as_str(), "A");
    }

    #[tokio::test]
    async fn empty_values_are_filtered() {
        let store = Arc::new(MemoryStore::new());
        store.seed("role", "A", Duration::from_secs(5)).await;
        let (_tx, cancel) = watch::channel(());
        let watcher = Watcher::new(
            store.clone(),
            "role".into(),
            Duration::from_millis(10),
            Arc::new(SystemClock),
            cancel,
        );
        let stream = watcher.run();
        tokio::pin!(stream);
        assert_eq!(stream.next().await.unwrap().as_str(), "A");
        store.delete("role").await;
        store.seed("role", "B", Duration::from_secs(5)).await;
        assert_eq!(stream.next().await.unwrap().as_str(), "B");
    }
}
