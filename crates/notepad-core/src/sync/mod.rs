//! Execution contexts and change notifications
//!
//! An [`Origin`] is one shared substrate plus the broadcast channel that tells
//! every attached [`ExecutionContext`] when an entry changes. Contexts are
//! the independent running instances of the application (think browser
//! tabs); each keeps its own cached view and reconciles on notification.
//!
//! ## Usage
//!
//! ```ignore
//! let origin = Origin::new(MemorySubstrate::new());
//! let tab_a = origin.open_context();
//! let tab_b = origin.open_context();
//!
//! tab_a.set_item("site:theme", "\"dark\"")?;
//! // tab_b's subscription now yields Notification::External(..)
//! ```

mod context;
mod event;

pub use context::{ExecutionContext, Origin, Subscription};
pub use event::{ContextId, ListenerId, LocalNotice, Notification, StorageEvent};
