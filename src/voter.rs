//! The Voter loop: campaigning to hold a value as a TTL lease.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::clock::Clock;
use crate::error::StoreError;
use crate::store::StoreClient;
use crate::types::{Key, Value};

/// A campaigner for a single `(key, value, term)`.
///
/// Ticks every `term / 5`, guaranteeing at least four renewal
/// attempts per lease lifetime and tolerating up to three consecutive
/// store failures before eviction. Never returns an error to its
/// caller: failures are logged and the loop simply tries again next
/// tick, per the background-reconciler propagation policy.
pub struct Voter {
    store: Arc<dyn StoreClient>,
    key: Key,
    value: Value,
    term: Duration,
    clock: Arc<dyn Clock>,
    cancel: watch::Receiver<()>,
}

impl Voter {
    pub(crate) fn new(
        store: Arc<dyn StoreClient>,
        key: Key,
        value: Value,
        term: Duration,
        clock: Arc<dyn Clock>,
        cancel: watch::Receiver<()>,
    ) -> Self {
        Self {
            store,
            key,
            value,
            term,
            clock,
            cancel,
        }
    }

    /// Run the campaign indefinitely, until the session is cancelled.
    pub async fn run(mut self) {
        let tick = self.term / 5;
        debug_assert!(tick < self.term / 2, "voter tick must stay below term/2");
        loop {
            self.campaign_tick().await;
            tokio::select! {
                () = self.clock.sleep(tick) => {}
                _ = self.cancel.changed() => return,
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self), fields(key = %self.key, value = %self.value))]
    async fn campaign_tick(&self) {
        match self.store.get(&self.key).await {
            Err(StoreError::NotFound) => match self.store.create(&self.key, &self.value, self.term).await {
                Ok(()) => tracing::info!("elected"),
                Err(StoreError::NodeExists) => {
                    tracing::debug!("lost race to create lease, retrying next tick");
                }
                Err(err) => tracing::warn!(error = %err, "failed to create lease"),
            },
            Err(err) => tracing::warn!(error = %err, "failed to read lease, retrying next tick"),
            Ok(entry) if entry.value != self.value => {
                tracing::info!(holder = %entry.value, "not the leader");
            }
            Ok(entry) if entry.ttl > self.term / 2 => {
                tracing::trace!(remaining = ?entry.ttl, "lease healthy, no action");
            }
            Ok(entry) => {
                match self
                    .store
                    .compare_and_swap(&self.key, &self.value, self.term, &self.value, entry.mod_index)
                    .await
                {
                    Ok(()) => tracing::debug!("lease renewed"),
                    Err(err) => tracing::warn!(error = %err, "lost leadership this tick, will retry"),
                }
            }
        }
    }
}

/// Synchronous preconditions for [`crate::session::Session::add_voter`].
pub(crate) fn validate(value: &Value, term: Duration) -> Result<(), &'static str> {
    if value.is_empty() {
        return Err("voter value must not be empty");
    }
    if term < Duration::from_secs(1) {
        return Err("voter term must be at least 1s");
    }
    Ok(())
}
