//! In-memory substrate
//!
//! Behaves like browser local storage: a flat string map with an optional
//! quota counted over key and value lengths.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{Substrate, SubstrateError, SubstrateResult};

/// Shared in-memory substrate
#[derive(Debug, Default)]
pub struct MemorySubstrate {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemorySubstrate {
    /// Create an unbounded substrate
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a substrate that rejects writes pushing usage past `quota` bytes
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    /// Bytes currently used (keys plus values)
    pub fn usage(&self) -> SubstrateResult<usize> {
        let entries = self.lock()?;
        Ok(entries.iter().map(|(k, v)| k.len() + v.len()).sum())
    }

    /// Number of stored entries
    pub fn len(&self) -> SubstrateResult<usize> {
        Ok(self.lock()?.len())
    }

    /// Whether the substrate has no entries
    pub fn is_empty(&self) -> SubstrateResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> SubstrateResult<MutexGuard<'_, HashMap<String, String>>> {
        // A poisoned map means a writer panicked mid-update; refuse access.
        self.entries.lock().map_err(|_| SubstrateError::Unavailable)
    }
}

impl Substrate for MemorySubstrate {
    fn get_item(&self, key: &str) -> SubstrateResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> SubstrateResult<()> {
        let mut entries = self.lock()?;

        if let Some(limit) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > limit {
                return Err(SubstrateError::QuotaExceeded {
                    key: key.to_string(),
                    limit,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> SubstrateResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn clear(&self) -> SubstrateResult<()> {
        self.lock()?.clear();
        Ok(())
    }
}
