//! Change notification types
//!
//! Two kinds of notification flow between stores:
//! - [`StorageEvent`]: raised by the origin when one execution context writes,
//!   delivered to every *other* context of the same origin
//! - [`LocalNotice`]: raised by a store inside one execution context, seen by
//!   sibling stores of that same context

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of an execution context (one per open "tab")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate a fresh, process-unique context ID
    pub(crate) fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Identifier of one subscription within a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// An entry changed in the shared substrate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Key that changed, `None` if the whole substrate was cleared
    pub key: Option<String>,
    /// Raw value after the change, `None` if the entry was removed
    pub new_value: Option<String>,
    /// Context that performed the change
    pub source: ContextId,
}

/// A store in this context successfully wrote `key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNotice {
    pub key: String,
    /// Listener of the store that wrote, if it was listening
    pub sender: Option<ListenerId>,
}

/// What a subscription yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Another context changed an entry
    External(StorageEvent),
    /// A sibling store in this context changed an entry
    Local(LocalNotice),
    /// Notifications were dropped because the receiver fell behind
    Missed,
}

impl StorageEvent {
    /// Whether this event concerns `key`
    pub fn affects(&self, key: &str) -> bool {
        self.key.as_deref().map_or(true, |k| k == key)
    }
}
