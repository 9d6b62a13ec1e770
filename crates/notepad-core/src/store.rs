//! Persistent keyed store
//!
//! A `PersistentStore<T>` binds one typed value to one key of the durable
//! substrate and keeps an in-memory copy of it. Reads never touch the
//! substrate; writes go through to it and notify other consumers.
//!
//! ## Failure policy
//!
//! No operation returns an error. Substrate and codec failures are logged
//! (when diagnostics are enabled) and degrade as follows:
//! - unreadable or undecodable entry: the initial value is used
//! - failed encode or write: the cached value stays as it was
//! - no substrate at all: the store works in memory only
//!
//! ## Usage
//!
//! ```ignore
//! let ctx = Origin::new(MemorySubstrate::new()).open_context();
//! let mut theme = PersistentStore::open(&ctx, "site:theme", Theme::Light, StoreOptions::default());
//!
//! theme.update(|t| t.toggled());
//! theme.remove(); // clears the key and resets to Theme::Light
//! ```

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::codec::{json_deserializer, json_serializer, CodecError, Deserializer, Serializer};
use crate::sync::{ExecutionContext, Notification, Subscription};

/// Initial value of a store, either given directly or produced on demand
pub enum Initial<T> {
    /// A ready value, cloned whenever needed
    Value(T),
    /// A producer, called only when the initial value is actually needed
    Lazy(Arc<dyn Fn() -> T + Send + Sync>),
}

impl<T> Initial<T> {
    /// Create a lazily produced initial value
    pub fn lazy(producer: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Initial::Lazy(Arc::new(producer))
    }
}

impl<T: Clone> Initial<T> {
    fn produce(&self) -> T {
        match self {
            Initial::Value(value) => value.clone(),
            Initial::Lazy(producer) => producer(),
        }
    }
}

impl<T> From<T> for Initial<T> {
    fn from(value: T) -> Self {
        Initial::Value(value)
    }
}

/// Store configuration
pub struct StoreOptions<T> {
    /// Value to raw entry (default: JSON)
    pub serializer: Serializer<T>,
    /// Raw entry to value (default: JSON)
    pub deserializer: Deserializer<T>,
    /// Listen for and raise change notifications
    pub sync_across_tabs: bool,
    /// Log failures; on by default in debug builds only
    pub diagnostics: bool,
}

impl<T: Serialize + DeserializeOwned + 'static> Default for StoreOptions<T> {
    fn default() -> Self {
        Self {
            serializer: json_serializer(),
            deserializer: json_deserializer(),
            sync_across_tabs: true,
            diagnostics: cfg!(debug_assertions),
        }
    }
}

impl<T> StoreOptions<T> {
    /// Replace the serializer
    pub fn with_serializer(
        mut self,
        serializer: impl Fn(&T) -> Result<String, CodecError> + Send + Sync + 'static,
    ) -> Self {
        self.serializer = Arc::new(serializer);
        self
    }

    /// Replace the deserializer
    pub fn with_deserializer(
        mut self,
        deserializer: impl Fn(&str) -> Result<T, CodecError> + Send + Sync + 'static,
    ) -> Self {
        self.deserializer = Arc::new(deserializer);
        self
    }

    /// Enable or disable change notifications
    pub fn sync_across_tabs(mut self, enabled: bool) -> Self {
        self.sync_across_tabs = enabled;
        self
    }

    /// Enable or disable failure logging
    pub fn diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }
}

/// Read/update/reset access to a single value
///
/// This is the seam collection managers are written against.
pub trait StateCell<T> {
    /// Current value
    fn current(&self) -> &T;

    /// Replace the value with `f(current)`
    fn update<F: FnOnce(&T) -> T>(&mut self, f: F);

    /// Drop the stored value and go back to the initial one
    fn reset(&mut self);
}

/// Typed, synchronized slot over one substrate key
pub struct PersistentStore<T> {
    ctx: ExecutionContext,
    key: String,
    initial: Initial<T>,
    options: StoreOptions<T>,
    value: T,
    subscription: Option<Subscription>,
}

impl<T: Clone> PersistentStore<T> {
    /// Bind a store to `key` and load its current value
    ///
    /// Falls back to `initial` when the substrate is unavailable, the key is
    /// absent, or the entry cannot be decoded.
    pub fn open(
        ctx: &ExecutionContext,
        key: impl Into<String>,
        initial: impl Into<Initial<T>>,
        options: StoreOptions<T>,
    ) -> Self {
        let key = key.into();
        let initial = initial.into();
        let value = load(ctx, &key, &initial, &options);
        let subscription = if options.sync_across_tabs {
            ctx.subscribe()
        } else {
            None
        };

        Self {
            ctx: ctx.clone(),
            key,
            initial,
            options,
            value,
            subscription,
        }
    }

    /// Key this store is bound to
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current cached value
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Whether the durable substrate is reachable
    ///
    /// Callers use this to disable destructive actions when changes could
    /// not be persisted anyway.
    pub fn is_available(&self) -> bool {
        self.ctx.has_substrate() && self.ctx.get_item(&self.key).is_ok()
    }

    /// Whether change listeners are registered
    pub fn is_listening(&self) -> bool {
        self.subscription.is_some()
    }

    /// Write `f(current)` through to the substrate
    ///
    /// This is the only write primitive; absolute writes are
    /// `update(|_| value)`, see [`PersistentStore::set`]. The cached value
    /// changes only if the write succeeded, or if there is no substrate.
    pub fn update<F: FnOnce(&T) -> T>(&mut self, f: F) {
        let next = f(&self.value);

        if !self.ctx.has_substrate() {
            self.value = next;
            return;
        }

        let raw = match (self.options.serializer)(&next) {
            Ok(raw) => raw,
            Err(e) => {
                self.diagnose("serializing", &e);
                return;
            }
        };

        if let Err(e) = self.ctx.set_item(&self.key, &raw) {
            self.diagnose("setting", &e);
            return;
        }

        self.value = next;
        self.notify_siblings();
    }

    /// Write an absolute value
    pub fn set(&mut self, value: T) {
        self.update(|_| value);
    }

    /// Delete the entry and reset to the initial value
    pub fn remove(&mut self) {
        if self.ctx.has_substrate() {
            if let Err(e) = self.ctx.remove_item(&self.key) {
                self.diagnose("removing", &e);
                return;
            }
            self.notify_siblings();
        }
        self.value = self.initial.produce();
    }

    /// Rebind to another key, discarding the cached value
    pub fn set_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        if key == self.key {
            return;
        }
        debug!("persistent store rebinding \"{}\" -> \"{}\"", self.key, key);
        self.key = key;
        self.value = self.read_value();
    }

    /// Apply every pending change notification
    ///
    /// This is the event-loop tick: call it whenever the host would deliver
    /// events. Returns `true` if the cached value was refreshed.
    pub fn process_notifications(&mut self) -> bool {
        let Some(mut subscription) = self.subscription.take() else {
            return false;
        };

        let mut refreshed = false;
        while let Some(notification) = subscription.try_next() {
            match notification {
                Notification::External(event) if event.affects(&self.key) => {
                    self.apply_external(event.new_value);
                    refreshed = true;
                }
                Notification::Local(notice) if notice.key == self.key => {
                    self.value = self.read_value();
                    refreshed = true;
                }
                Notification::Missed => {
                    self.value = self.read_value();
                    refreshed = true;
                }
                _ => {}
            }
        }

        self.subscription = Some(subscription);
        refreshed
    }

    fn apply_external(&mut self, new_value: Option<String>) {
        self.value = match new_value {
            None => self.initial.produce(),
            Some(raw) => match (self.options.deserializer)(&raw) {
                Ok(value) => value,
                // Fall back to the safe reader
                Err(_) => self.read_value(),
            },
        };
    }

    fn read_value(&self) -> T {
        load(&self.ctx, &self.key, &self.initial, &self.options)
    }

    fn notify_siblings(&self) {
        if self.options.sync_across_tabs {
            let sender = self.subscription.as_ref().map(Subscription::id);
            self.ctx.notify_local(&self.key, sender);
        }
    }

    fn diagnose(&self, action: &str, error: &dyn fmt::Display) {
        if self.options.diagnostics {
            warn!("persistent store: {} key \"{}\" failed: {}", action, self.key, error);
        }
    }
}

/// Read and decode `key`, falling back to the initial value
fn load<T: Clone>(
    ctx: &ExecutionContext,
    key: &str,
    initial: &Initial<T>,
    options: &StoreOptions<T>,
) -> T {
    let raw = match ctx.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return initial.produce(),
        Err(e) => {
            if ctx.has_substrate() {
                debug!("persistent store: reading key \"{}\" failed: {}", key, e);
            }
            return initial.produce();
        }
    };

    match (options.deserializer)(&raw) {
        Ok(value) => value,
        Err(e) => {
            if options.diagnostics {
                warn!("persistent store: deserializing key \"{}\" failed: {}", key, e);
            }
            initial.produce()
        }
    }
}

impl<T: Clone> StateCell<T> for PersistentStore<T> {
    fn current(&self) -> &T {
        self.get()
    }

    fn update<F: FnOnce(&T) -> T>(&mut self, f: F) {
        PersistentStore::update(self, f);
    }

    fn reset(&mut self) {
        self.remove();
    }
}

impl<T: fmt::Debug> fmt::Debug for PersistentStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentStore")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("context", &self.ctx)
            .field("listening", &self.subscription.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DisabledSubstrate, MemorySubstrate, Substrate};
    use crate::sync::Origin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn memory_origin() -> Origin {
        Origin::new(MemorySubstrate::new())
    }

    fn counter_store(ctx: &ExecutionContext) -> PersistentStore<u32> {
        PersistentStore::open(ctx, "counter", 0u32, StoreOptions::default())
    }

    #[test]
    fn test_open_uses_initial_when_absent() {
        let ctx = memory_origin().open_context();
        let store = counter_store(&ctx);

        assert_eq!(*store.get(), 0);
        assert!(store.is_available());
        assert!(store.is_listening());
    }

    #[test]
    fn test_open_reads_existing_entry() {
        let origin = memory_origin();
        origin.substrate().set_item("counter", "41").unwrap();

        let store = counter_store(&origin.open_context());
        assert_eq!(*store.get(), 41);
    }

    #[test]
    fn test_lazy_initial_not_called_when_entry_exists() {
        let origin = memory_origin();
        origin.substrate().set_item("counter", "7").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();

        let store: PersistentStore<u32> = PersistentStore::open(
            &origin.open_context(),
            "counter",
            Initial::lazy(move || {
                counted.fetch_add(1, Ordering::SeqCst);
                0u32
            }),
            StoreOptions::default(),
        );

        assert_eq!(*store.get(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_lazy_initial_used_when_absent() {
        let store: PersistentStore<Vec<String>> = PersistentStore::open(
            &memory_origin().open_context(),
            "names",
            Initial::lazy(|| vec!["default".to_string()]),
            StoreOptions::default(),
        );

        assert_eq!(store.get(), &vec!["default".to_string()]);
    }

    #[test]
    fn test_malformed_entry_falls_back_to_initial() {
        let origin = memory_origin();
        origin.substrate().set_item("counter", "{oops").unwrap();

        let store = counter_store(&origin.open_context());
        assert_eq!(*store.get(), 0);
    }

    #[test]
    fn test_update_writes_through() {
        let origin = memory_origin();
        let mut store = counter_store(&origin.open_context());

        store.update(|n| n + 1);
        store.update(|n| n + 1);

        assert_eq!(*store.get(), 2);
        assert_eq!(
            origin.substrate().get_item("counter").unwrap().as_deref(),
            Some("2")
        );
    }

    #[test]
    fn test_set_is_absolute_update() {
        let origin = memory_origin();
        let mut store = counter_store(&origin.open_context());

        store.set(99);
        assert_eq!(*store.get(), 99);
    }

    #[test]
    fn test_failed_write_keeps_previous_value() {
        let origin = Origin::new(MemorySubstrate::with_quota(16));
        let mut store = PersistentStore::open(
            &origin.open_context(),
            "note",
            String::new(),
            StoreOptions::default(),
        );

        store.set("short".to_string());
        store.set("far too long for the configured quota".to_string());

        assert_eq!(store.get(), "short");
        assert_eq!(
            origin.substrate().get_item("note").unwrap().as_deref(),
            Some("\"short\"")
        );
    }

    #[test]
    fn test_failed_encode_keeps_previous_value() {
        let options = StoreOptions::<u32>::default().with_serializer(|n| {
            if *n > 10 {
                Err(CodecError::Encode("too big".to_string()))
            } else {
                Ok(n.to_string())
            }
        });
        let mut store = PersistentStore::open(&memory_origin().open_context(), "n", 1u32, options);

        store.set(5);
        store.set(50);
        assert_eq!(*store.get(), 5);
    }

    #[test]
    fn test_custom_codec() {
        let origin = memory_origin();
        let options = StoreOptions::<bool>::default()
            .with_serializer(|b| Ok(if *b { "yes" } else { "no" }.to_string()))
            .with_deserializer(|raw| match raw {
                "yes" => Ok(true),
                "no" => Ok(false),
                other => Err(CodecError::Decode(other.to_string())),
            });
        let mut store = PersistentStore::open(&origin.open_context(), "flag", false, options);

        store.set(true);
        assert_eq!(
            origin.substrate().get_item("flag").unwrap().as_deref(),
            Some("yes")
        );
    }

    #[test]
    fn test_remove_resets_to_initial() {
        let origin = memory_origin();
        let mut store = counter_store(&origin.open_context());
        store.set(5);

        store.remove();

        assert_eq!(*store.get(), 0);
        assert_eq!(origin.substrate().get_item("counter").unwrap(), None);
    }

    #[test]
    fn test_detached_context_is_memory_only() {
        let ctx = ExecutionContext::detached();
        let mut store = counter_store(&ctx);

        assert!(!store.is_available());
        assert!(!store.is_listening());

        store.set(3);
        assert_eq!(*store.get(), 3);

        store.remove();
        assert_eq!(*store.get(), 0);
        assert!(!store.process_notifications());
    }

    #[test]
    fn test_disabled_substrate_degrades_gracefully() {
        let ctx = Origin::new(DisabledSubstrate).open_context();
        let mut store = counter_store(&ctx);

        assert_eq!(*store.get(), 0);
        assert!(!store.is_available());

        // Write fails, value stays put, nothing panics
        store.set(1);
        assert_eq!(*store.get(), 0);

        // Remove fails too and leaves the value alone
        store.remove();
        assert_eq!(*store.get(), 0);
    }

    #[test]
    fn test_external_write_reaches_other_context() {
        let origin = memory_origin();
        let mut tab_a = counter_store(&origin.open_context());
        let mut tab_b = counter_store(&origin.open_context());

        tab_a.set(12);
        assert_eq!(*tab_b.get(), 0);

        assert!(tab_b.process_notifications());
        assert_eq!(*tab_b.get(), 12);

        // Writer does not hear its own change
        assert!(!tab_a.process_notifications());
    }

    #[test]
    fn test_external_remove_resets_other_context() {
        let origin = memory_origin();
        let mut tab_a = counter_store(&origin.open_context());
        let mut tab_b = counter_store(&origin.open_context());
        tab_a.set(12);
        tab_b.process_notifications();

        tab_a.remove();
        tab_b.process_notifications();

        assert_eq!(*tab_b.get(), 0);
    }

    #[test]
    fn test_substrate_clear_resets_other_context() {
        let origin = memory_origin();
        let tab_a = origin.open_context();
        let mut store_a = counter_store(&tab_a);
        let mut store_b = counter_store(&origin.open_context());
        store_a.set(5);
        store_b.process_notifications();
        assert_eq!(*store_b.get(), 5);

        tab_a.clear().unwrap();

        assert!(store_b.process_notifications());
        assert_eq!(*store_b.get(), 0);
    }

    #[test]
    fn test_lagged_reader_reloads_latest_value() {
        let origin = memory_origin();
        let mut writer = counter_store(&origin.open_context());
        let mut reader = counter_store(&origin.open_context());

        // Far more writes than the event channel holds
        for n in 1..=200 {
            writer.set(n);
        }

        assert!(reader.process_notifications());
        assert_eq!(*reader.get(), 200);
        assert!(!reader.process_notifications());
    }

    #[test]
    fn test_sibling_store_in_same_context_reloads() {
        let ctx = memory_origin().open_context();
        let mut first = counter_store(&ctx);
        let mut second = counter_store(&ctx);

        first.set(8);

        assert!(second.process_notifications());
        assert_eq!(*second.get(), 8);
        assert!(!first.process_notifications());
    }

    #[test]
    fn test_notifications_for_other_keys_are_ignored() {
        let origin = memory_origin();
        let mut counter = counter_store(&origin.open_context());
        let mut other = PersistentStore::open(
            &origin.open_context(),
            "other",
            0u32,
            StoreOptions::default(),
        );

        other.set(1);
        assert!(!counter.process_notifications());
        assert_eq!(*counter.get(), 0);
    }

    #[test]
    fn test_sync_disabled_does_not_listen() {
        let origin = memory_origin();
        let mut writer = counter_store(&origin.open_context());
        let mut reader = PersistentStore::open(
            &origin.open_context(),
            "counter",
            0u32,
            StoreOptions::default().sync_across_tabs(false),
        );

        writer.set(4);

        assert!(!reader.is_listening());
        assert!(!reader.process_notifications());
        assert_eq!(*reader.get(), 0);
    }

    #[test]
    fn test_undecodable_external_value_falls_back_to_reread() {
        let origin = memory_origin();
        let writer_ctx = origin.open_context();
        let mut reader = counter_store(&origin.open_context());

        // Raw garbage written by some other context
        writer_ctx.set_item("counter", "not a number").unwrap();

        assert!(reader.process_notifications());
        assert_eq!(*reader.get(), 0);
    }

    #[test]
    fn test_set_key_reloads_under_new_key() {
        let origin = memory_origin();
        origin.substrate().set_item("counter:b", "20").unwrap();
        let mut store = PersistentStore::open(
            &origin.open_context(),
            "counter:a",
            0u32,
            StoreOptions::default(),
        );
        store.set(10);

        store.set_key("counter:b");
        assert_eq!(store.key(), "counter:b");
        assert_eq!(*store.get(), 20);

        store.set_key("counter:missing");
        assert_eq!(*store.get(), 0);
    }

    #[test]
    fn test_dropping_store_unregisters_listeners() {
        let origin = memory_origin();
        let ctx = origin.open_context();
        let before = format!("{:?}", origin);
        {
            let _store = counter_store(&ctx);
            assert_ne!(format!("{:?}", origin), before);
        }
        assert_eq!(format!("{:?}", origin), before);
    }
}
