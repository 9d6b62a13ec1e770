//! Storage layer
//!
//! The durable substrate: a synchronous, string-keyed get/set/remove store
//! shared by every execution context of one origin.
//!
//! ## Implementations
//!
//! - [`MemorySubstrate`]: in-process map with an optional byte quota
//! - [`FileSubstrate`]: one file per key in a directory, atomic writes
//! - [`DisabledSubstrate`]: refuses every access (storage disabled by policy)

pub mod error;
pub mod file;
pub mod memory;

pub use error::{SubstrateError, SubstrateResult};
pub use file::FileSubstrate;
pub use memory::MemorySubstrate;

/// A per-origin, synchronous, string-keyed store
///
/// Every call completes or fails immediately; there is no background I/O.
pub trait Substrate: Send + Sync {
    /// Read the raw entry for `key`, `None` if absent
    fn get_item(&self, key: &str) -> SubstrateResult<Option<String>>;

    /// Write the raw entry for `key`
    fn set_item(&self, key: &str, value: &str) -> SubstrateResult<()>;

    /// Delete the entry for `key` (absent keys are not an error)
    fn remove_item(&self, key: &str) -> SubstrateResult<()>;

    /// Delete every entry
    fn clear(&self) -> SubstrateResult<()>;
}

/// Substrate that refuses all access
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSubstrate;

impl Substrate for DisabledSubstrate {
    fn get_item(&self, key: &str) -> SubstrateResult<Option<String>> {
        Err(SubstrateError::AccessDenied {
            key: key.to_string(),
        })
    }

    fn set_item(&self, key: &str, _value: &str) -> SubstrateResult<()> {
        Err(SubstrateError::AccessDenied {
            key: key.to_string(),
        })
    }

    fn remove_item(&self, key: &str) -> SubstrateResult<()> {
        Err(SubstrateError::AccessDenied {
            key: key.to_string(),
        })
    }

    fn clear(&self) -> SubstrateResult<()> {
        Err(SubstrateError::AccessDenied { key: "*".to_string() })
    }
}
