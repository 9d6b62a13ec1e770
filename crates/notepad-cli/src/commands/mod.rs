//! Command handlers
//!
//! Each invocation of the binary is one execution context over the file
//! substrate in the configured data directory.

pub mod config;
pub mod record;
pub mod theme;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use notepad_core::{
    Config, ExecutionContext, FileSubstrate, Origin, PersistentStore, RecordStore, StoreOptions,
};

/// Open this process's execution context
pub fn open_context(config: &Config) -> ExecutionContext {
    let substrate = FileSubstrate::new(config.storage_dir());
    debug!("Opening file substrate at {:?}", substrate.dir());
    Origin::new(substrate).open_context()
}

/// Store options derived from configuration
///
/// Store failures are always logged; the subscriber's filter decides
/// whether they are shown.
pub fn store_options<T>(config: &Config) -> StoreOptions<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    StoreOptions::default()
        .sync_across_tabs(config.sync_across_tabs)
        .diagnostics(true)
}

/// Open the record collection under the configured key
pub fn open_records(ctx: &ExecutionContext, config: &Config) -> RecordStore {
    PersistentStore::open(ctx, config.records_key.clone(), None, store_options(config))
}
