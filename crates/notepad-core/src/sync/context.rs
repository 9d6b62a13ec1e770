//! Origin and execution context implementation

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::debug;

use super::event::{ContextId, ListenerId, LocalNotice, Notification, StorageEvent};
use crate::storage::{Substrate, SubstrateError, SubstrateResult};

/// Buffered notifications per receiver before it is considered lagged
const CHANNEL_CAPACITY: usize = 64;

/// One shared substrate and its change broadcast
#[derive(Clone)]
pub struct Origin {
    inner: Arc<OriginInner>,
}

struct OriginInner {
    substrate: Arc<dyn Substrate>,
    events: broadcast::Sender<StorageEvent>,
}

impl Origin {
    /// Create an origin over the given substrate
    pub fn new(substrate: impl Substrate + 'static) -> Self {
        Self::from_shared(Arc::new(substrate))
    }

    /// Create an origin over an already shared substrate
    pub fn from_shared(substrate: Arc<dyn Substrate>) -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(OriginInner { substrate, events }),
        }
    }

    /// Open a new execution context attached to this origin
    pub fn open_context(&self) -> ExecutionContext {
        ExecutionContext::with_origin(Some(self.clone()))
    }

    /// Direct access to the substrate
    pub fn substrate(&self) -> &dyn Substrate {
        self.inner.substrate.as_ref()
    }

    fn publish(&self, event: StorageEvent) {
        // No listeners is not an error
        let _ = self.inner.events.send(event);
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.inner.events.subscribe()
    }
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Origin")
            .field("listeners", &self.inner.events.receiver_count())
            .finish()
    }
}

/// An independent running instance of the application
///
/// Cloning yields a handle to the same context (same ID, same local channel).
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    id: ContextId,
    origin: Option<Origin>,
    local: broadcast::Sender<LocalNotice>,
}

impl ExecutionContext {
    /// A context with no substrate at all (e.g. server-side rendering)
    pub fn detached() -> Self {
        Self::with_origin(None)
    }

    fn with_origin(origin: Option<Origin>) -> Self {
        let (local, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(ContextInner {
                id: ContextId::next(),
                origin,
                local,
            }),
        }
    }

    /// This context's ID
    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    /// Whether a substrate is attached
    pub fn has_substrate(&self) -> bool {
        self.inner.origin.is_some()
    }

    fn origin(&self) -> SubstrateResult<&Origin> {
        self.inner.origin.as_ref().ok_or(SubstrateError::Unavailable)
    }

    /// Read the raw entry for `key`
    pub fn get_item(&self, key: &str) -> SubstrateResult<Option<String>> {
        self.origin()?.substrate().get_item(key)
    }

    /// Write the raw entry for `key` and notify other contexts
    pub fn set_item(&self, key: &str, value: &str) -> SubstrateResult<()> {
        let origin = self.origin()?;
        origin.substrate().set_item(key, value)?;
        origin.publish(StorageEvent {
            key: Some(key.to_string()),
            new_value: Some(value.to_string()),
            source: self.id(),
        });
        Ok(())
    }

    /// Delete the entry for `key` and notify other contexts
    pub fn remove_item(&self, key: &str) -> SubstrateResult<()> {
        let origin = self.origin()?;
        origin.substrate().remove_item(key)?;
        origin.publish(StorageEvent {
            key: Some(key.to_string()),
            new_value: None,
            source: self.id(),
        });
        Ok(())
    }

    /// Delete every entry and notify other contexts
    pub fn clear(&self) -> SubstrateResult<()> {
        let origin = self.origin()?;
        origin.substrate().clear()?;
        origin.publish(StorageEvent {
            key: None,
            new_value: None,
            source: self.id(),
        });
        Ok(())
    }

    /// Tell sibling stores in this context that `key` changed
    ///
    /// `sender` identifies the writer's own subscription so it can skip the
    /// notice it raised itself.
    pub fn notify_local(&self, key: &str, sender: Option<ListenerId>) {
        let _ = self.inner.local.send(LocalNotice {
            key: key.to_string(),
            sender,
        });
    }

    /// Start listening for notifications
    ///
    /// Returns `None` for detached contexts, which have nothing to listen to.
    /// Dropping the subscription unregisters both listeners.
    pub fn subscribe(&self) -> Option<Subscription> {
        let origin = self.inner.origin.as_ref()?;
        Some(Subscription {
            id: ListenerId::next(),
            context: self.id(),
            external: origin.subscribe(),
            local: self.inner.local.subscribe(),
        })
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("id", &self.inner.id)
            .field("has_substrate", &self.has_substrate())
            .finish()
    }
}

/// Live listener registration for one store
pub struct Subscription {
    id: ListenerId,
    context: ContextId,
    external: broadcast::Receiver<StorageEvent>,
    local: broadcast::Receiver<LocalNotice>,
}

impl Subscription {
    /// This listener's ID
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Take the next pending notification without blocking
    ///
    /// External events raised by this subscription's own context are skipped;
    /// a context never hears its own writes as foreign changes.
    pub fn try_next(&mut self) -> Option<Notification> {
        loop {
            match self.external.try_recv() {
                Ok(event) if event.source == self.context => continue,
                Ok(event) => return Some(Notification::External(event)),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!("{} missed {} storage events", self.context, skipped);
                    return Some(Notification::Missed);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        loop {
            match self.local.try_recv() {
                Ok(notice) if notice.sender == Some(self.id) => continue,
                Ok(notice) => return Some(Notification::Local(notice)),
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!("{} missed {} local notices", self.context, skipped);
                    return Some(Notification::Missed);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("context", &self.context)
            .finish()
    }
}
