//! Notepad Core Library
//!
//! This crate provides the core functionality for Notepad, a small
//! local-first note keeper: typed values persisted under string keys, kept
//! in sync between independently running contexts that share one storage
//! area.
//!
//! # Architecture
//!
//! - **Substrate**: durable string key/value area shared by all contexts
//! - **Execution contexts**: independent instances over one substrate, told
//!   about each other's writes through change notifications
//! - **Persistent store**: one typed, cached value per key
//! - **Record collection**: CRUD over the notes held in one store
//!
//! # Quick Start
//!
//! ```text
//! let origin = Origin::new(FileSubstrate::new(config.storage_dir()));
//! let ctx = origin.open_context();
//!
//! let mut store = records_store(&ctx, StoreOptions::default());
//! let mut records = RecordCollection::new(&mut store);
//! records.add(RecordFields::new("Groceries", "Milk, eggs"));
//! ```
//!
//! # Modules
//!
//! - `storage`: substrate trait and its file, memory and disabled backends
//! - `sync`: origins, execution contexts and change notifications
//! - `codec`: value <-> raw entry conversion
//! - `store`: the persistent keyed store (main entry point)
//! - `models`: records and theme
//! - `records`: record collection manager
//! - `validation`: field length rules
//! - `config`: application configuration

pub mod codec;
pub mod config;
pub mod models;
pub mod records;
pub mod storage;
pub mod store;
pub mod sync;
pub mod validation;

pub use codec::CodecError;
pub use config::Config;
pub use models::{Record, RecordFields, RecordPatch, Theme, RECORDS_KEY, THEME_KEY};
pub use records::{records_store, PrefixMatch, RecordCollection, RecordStore, Records};
pub use storage::{
    DisabledSubstrate, FileSubstrate, MemorySubstrate, Substrate, SubstrateError,
    SubstrateResult,
};
pub use store::{Initial, PersistentStore, StateCell, StoreOptions};
pub use sync::{ExecutionContext, Origin};
pub use validation::{validate_fields, validate_patch, ValidationError};
