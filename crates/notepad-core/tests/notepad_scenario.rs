//! End-to-end behaviour of stores and record collections over shared
//! substrates, across several execution contexts.

use std::sync::Arc;

use notepad_core::{
    records_store, FileSubstrate, MemorySubstrate, Origin, PersistentStore, Record,
    RecordCollection, RecordFields, RecordPatch, StoreOptions, Substrate, Theme, RECORDS_KEY,
    THEME_KEY,
};
use tempfile::TempDir;

fn quiet<T: serde::Serialize + serde::de::DeserializeOwned + 'static>() -> StoreOptions<T> {
    StoreOptions::default().diagnostics(false)
}

#[test]
fn groceries_scenario() {
    let origin = Origin::new(MemorySubstrate::new());
    let ctx = origin.open_context();
    let mut store = records_store(&ctx, quiet());
    let mut records = RecordCollection::new(&mut store);
    assert!(records.is_absent());

    let before = chrono::Utc::now();
    let note = records.add(RecordFields::new("Groceries", "Milk, eggs"));
    assert_eq!(records.len(), 1);
    assert_eq!(note.title, "Groceries");
    assert_eq!(note.description, "Milk, eggs");
    assert!(note.date_created >= before);

    records.update(note.id, &RecordPatch::description("Milk, eggs, bread"));
    let updated = records.get(note.id).expect("record should exist");
    assert_eq!(updated.description, "Milk, eggs, bread");
    assert_eq!(updated.title, "Groceries");
    assert_eq!(updated.date_created, note.date_created);

    records.remove(note.id);
    assert_eq!(records.get(note.id), None);
    assert!(records.is_empty());
}

#[test]
fn malformed_entry_falls_back_to_empty() {
    let origin = Origin::new(MemorySubstrate::new());
    origin
        .substrate()
        .set_item(RECORDS_KEY, "{this is not json")
        .unwrap();

    let ctx = origin.open_context();
    let mut store = records_store(&ctx, quiet());
    assert_eq!(store.get(), &None);

    // The collection is still usable and overwrites the bad entry
    let note = RecordCollection::new(&mut store).add(RecordFields::new("Fresh", "start"));
    let raw = origin.substrate().get_item(RECORDS_KEY).unwrap().unwrap();
    let stored: Vec<Record> = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored, vec![note]);
}

#[test]
fn collection_round_trips_through_file_substrate() {
    let temp = TempDir::new().unwrap();

    let written = {
        let origin = Origin::new(FileSubstrate::new(temp.path()));
        let ctx = origin.open_context();
        let mut store = records_store(&ctx, quiet());
        let mut records = RecordCollection::new(&mut store);
        records.add(RecordFields::new("first", "first note"));
        records.add(RecordFields::new("second", "second note"));
        records.list().to_vec()
    };

    // A later run over the same directory sees the same collection
    let origin = Origin::new(FileSubstrate::new(temp.path()));
    let ctx = origin.open_context();
    let mut store = records_store(&ctx, quiet());
    let records = RecordCollection::new(&mut store);

    assert_eq!(records.list(), written.as_slice());
}

#[test]
fn write_in_one_context_reaches_another() {
    let origin = Origin::new(MemorySubstrate::new());
    let tab_a = origin.open_context();
    let tab_b = origin.open_context();
    let mut store_a = records_store(&tab_a, quiet());
    let mut store_b = records_store(&tab_b, quiet());

    let note = RecordCollection::new(&mut store_a).add(RecordFields::new("Groceries", "Milk"));

    // Nothing changes until B handles its pending notifications
    assert_eq!(store_b.get(), &None);
    assert!(store_b.process_notifications());
    assert_eq!(RecordCollection::new(&mut store_b).get(note.id), Some(note.clone()));

    // B edits, A converges
    RecordCollection::new(&mut store_b).update(note.id, &RecordPatch::title("Shopping"));
    assert!(store_a.process_notifications());
    let seen = RecordCollection::new(&mut store_a).get(note.id).unwrap();
    assert_eq!(seen.title, "Shopping");

    // A clears, B resets to absent
    RecordCollection::new(&mut store_a).clear();
    store_b.process_notifications();
    assert!(RecordCollection::new(&mut store_b).is_absent());
}

#[test]
fn sibling_stores_in_one_context_converge() {
    let origin = Origin::new(MemorySubstrate::new());
    let ctx = origin.open_context();
    let mut header = PersistentStore::open(&ctx, THEME_KEY, Theme::Light, quiet());
    let mut settings = PersistentStore::open(&ctx, THEME_KEY, Theme::Light, quiet());

    settings.update(|t| t.toggled());

    assert_eq!(header.get(), &Theme::Light);
    assert!(header.process_notifications());
    assert_eq!(header.get(), &Theme::Dark);
    // The writer does not hear itself
    assert!(!settings.process_notifications());
}

#[test]
fn contexts_with_sync_disabled_stay_stale() {
    let origin = Origin::new(MemorySubstrate::new());
    let tab_a = origin.open_context();
    let tab_b = origin.open_context();
    let mut store_a = PersistentStore::open(&tab_a, THEME_KEY, Theme::Light, quiet());
    let mut store_b = PersistentStore::open(
        &tab_b,
        THEME_KEY,
        Theme::Light,
        quiet::<Theme>().sync_across_tabs(false),
    );

    store_a.set(Theme::Dark);

    assert!(!store_b.is_listening());
    assert!(!store_b.process_notifications());
    assert_eq!(store_b.get(), &Theme::Light);
}

#[test]
fn failed_write_keeps_previous_collection() {
    let substrate = Arc::new(MemorySubstrate::with_quota(256));
    let origin = Origin::from_shared(substrate.clone());
    let ctx = origin.open_context();
    let mut store = records_store(&ctx, quiet());
    let mut records = RecordCollection::new(&mut store);

    let kept = records.add(RecordFields::new("ok", "fits"));
    let raw_before = substrate.get_item(RECORDS_KEY).unwrap();

    records.add(RecordFields::new("big", "x".repeat(512)));

    assert_eq!(records.list(), &[kept]);
    assert_eq!(substrate.get_item(RECORDS_KEY).unwrap(), raw_before);
}
