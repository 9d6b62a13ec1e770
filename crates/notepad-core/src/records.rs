//! Record collection management
//!
//! CRUD over the ordered collection of records held in one store slot. The
//! collection is `None` until the first record is added and again after
//! `clear()`; new records are appended, so insertion order is kept.
//!
//! `RecordCollection` owns nothing but a borrow of the slot. Every mutation
//! is a single read-modify-write through [`StateCell::update`].
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = records_store(&ctx, StoreOptions::default());
//! let mut records = RecordCollection::new(&mut store);
//!
//! let note = records.add(RecordFields::new("Groceries", "Milk, eggs"));
//! records.update(note.id, &RecordPatch::description("Milk, eggs, bread"));
//! records.remove(note.id);
//! ```

use uuid::Uuid;

use crate::models::{Record, RecordFields, RecordPatch, RECORDS_KEY};
use crate::store::{PersistentStore, StateCell, StoreOptions};
use crate::sync::ExecutionContext;

/// Stored shape of the collection: absent, or an ordered list
pub type Records = Option<Vec<Record>>;

/// Store bound to the record collection
pub type RecordStore = PersistentStore<Records>;

/// Open the record collection slot (`site:records`) in `ctx`
pub fn records_store(ctx: &ExecutionContext, options: StoreOptions<Records>) -> RecordStore {
    PersistentStore::open(ctx, RECORDS_KEY, None, options)
}

/// Result of resolving a short ID
#[derive(Debug, Clone, PartialEq)]
pub enum PrefixMatch {
    /// Nothing matched
    None,
    /// Exactly one record matched
    One(Record),
    /// Several records matched; the prefix is ambiguous
    Many(Vec<Record>),
}

/// CRUD helper bound to a record collection slot
pub struct RecordCollection<'a, S: StateCell<Records>> {
    slot: &'a mut S,
}

impl<'a, S: StateCell<Records>> RecordCollection<'a, S> {
    pub fn new(slot: &'a mut S) -> Self {
        Self { slot }
    }

    /// Create a record and append it
    ///
    /// Starts a one-element collection when none exists yet.
    pub fn add(&mut self, fields: RecordFields) -> Record {
        let record = Record::new(fields);
        let appended = record.clone();

        self.slot.update(move |prev| match prev {
            Some(records) => {
                let mut next = records.clone();
                next.push(appended);
                Some(next)
            }
            None => Some(vec![appended]),
        });

        record
    }

    /// Merge `patch` into the record with `id`
    ///
    /// No-op when the collection is absent or no record matches.
    pub fn update(&mut self, id: Uuid, patch: &RecordPatch) {
        if self.is_absent() {
            return;
        }
        self.slot.update(|prev| {
            prev.as_ref().map(|records| {
                records
                    .iter()
                    .map(|r| {
                        let mut r = r.clone();
                        if r.id == id {
                            r.apply(patch);
                        }
                        r
                    })
                    .collect()
            })
        });
    }

    /// Remove the record with `id`, keeping the order of the rest
    ///
    /// No-op when the collection is absent or no record matches.
    pub fn remove(&mut self, id: Uuid) {
        if self.is_absent() {
            return;
        }
        self.slot.update(|prev| {
            prev.as_ref()
                .map(|records| records.iter().filter(|r| r.id != id).cloned().collect())
        });
    }

    /// Look up a record by ID
    pub fn get(&self, id: Uuid) -> Option<Record> {
        self.list().iter().find(|r| r.id == id).cloned()
    }

    /// Discard every record; the slot goes back to absent
    pub fn clear(&mut self) {
        self.slot.reset();
    }

    /// All records in insertion order (empty when absent)
    pub fn list(&self) -> &[Record] {
        self.slot.current().as_deref().unwrap_or(&[])
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.list().len()
    }

    /// Whether there are no records
    pub fn is_empty(&self) -> bool {
        self.list().is_empty()
    }

    /// Whether the collection has never been started (or was cleared)
    pub fn is_absent(&self) -> bool {
        self.slot.current().is_none()
    }

    /// Resolve a full or partial ID
    pub fn find_by_prefix(&self, prefix: &str) -> PrefixMatch {
        if let Ok(id) = Uuid::parse_str(prefix) {
            return match self.get(id) {
                Some(record) => PrefixMatch::One(record),
                None => PrefixMatch::None,
            };
        }

        let prefix = prefix.to_lowercase();
        let mut matches: Vec<Record> = self
            .list()
            .iter()
            .filter(|r| r.id.to_string().starts_with(&prefix))
            .cloned()
            .collect();

        match matches.len() {
            0 => PrefixMatch::None,
            1 => PrefixMatch::One(matches.remove(0)),
            _ => PrefixMatch::Many(matches),
        }
    }
}
