//! The Callback adapter: turns a value stream into `(key, prev, new)` events.

use futures::{Stream, StreamExt};

use crate::types::{Key, Value};

/// Drive `f(key, prev, new)` for every value emitted by `values`,
/// tracking `prev` starting from the empty value.
///
/// Implemented strictly in terms of the watcher's stream, per the
/// "Callbacks vs. streams" design note: this is a thin consumer, not
/// a parallel implementation.
pub(crate) async fn drive<S, F>(key: Key, mut values: S, mut f: F)
where
    S: Stream<Item = Value> + Unpin,
    F: FnMut(&Key, &Value, &Value) + Send,
{
    let mut prev = Value::empty();
    while let Some(new) = values.next().await {
        f(&key, &prev, &new);
        prev = new;
    }
}
