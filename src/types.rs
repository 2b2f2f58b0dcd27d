//! Opaque key/value/revision types shared by every component.

use std::fmt;

/// An opaque, UTF-8 key addressable in the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    /// Borrow the key as a plain string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque, UTF-8 value stored under a [`Key`].
///
/// The empty string is reserved to mean "no value" and is filtered out
/// by the watcher before it ever reaches a caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Value(String);

impl Value {
    /// Borrow the value as a plain string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` for the reserved empty-string sentinel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The empty-value sentinel, never emitted by a watcher.
    #[must_use]
    pub fn empty() -> Self {
        Value(String::new())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The store's monotonically increasing per-mutation counter
/// (`ModifiedIndex` in etcd terms).
pub type Revision = i64;
