//! Record command handlers

use anyhow::{bail, Context, Result};
use tracing::info;

use notepad_core::{
    validate_fields, validate_patch, PrefixMatch, Record, RecordCollection, RecordFields,
    RecordPatch, RecordStore,
};

use crate::editor::{confirm, edit_text, prompt_with_default};
use crate::output::{short_id, Output};

/// Create a new record
///
/// Opens the editor for the description when none is given.
pub fn add(
    store: &mut RecordStore,
    title: String,
    description: Option<String>,
    output: &Output,
) -> Result<()> {
    let description = match description {
        Some(d) => d,
        None => {
            let initial = format!("<!-- New record: {} -->\n\n", title);
            edit_text(&initial).context("Failed to edit description")?
        }
    };

    let fields = RecordFields::new(title, description);
    validate_fields(&fields)?;

    let mut records = RecordCollection::new(store);
    let record = records.add(fields);

    // A rejected write leaves the collection as it was
    if records.get(record.id).is_none() {
        bail!("Failed to save record. See the log for details.");
    }
    info!("Added record {}", record.id);

    output.success(&format!("Created record: {}", record.id));
    output.print_record(&record);

    Ok(())
}

/// List all records in creation order
pub fn list(store: &mut RecordStore, output: &Output) -> Result<()> {
    let records = RecordCollection::new(store);
    output.print_records(records.list());
    Ok(())
}

/// Show a single record
pub fn show(store: &mut RecordStore, id: String, output: &Output) -> Result<()> {
    let records = RecordCollection::new(store);
    let record = resolve_id(&records, &id)?;

    output.print_record(&record);
    Ok(())
}

/// Edit a record's title and/or description
///
/// Prompts for both fields when neither flag is given.
pub fn edit(
    store: &mut RecordStore,
    id: String,
    title: Option<String>,
    description: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut records = RecordCollection::new(store);
    let record = resolve_id(&records, &id)?;

    let patch = if title.is_none() && description.is_none() {
        prompt_patch(&record)?
    } else {
        RecordPatch { title, description }
    };

    if patch.is_empty() {
        output.message("Nothing to change.");
        return Ok(());
    }
    validate_patch(&patch)?;

    records.update(record.id, &patch);

    let mut expected = record.clone();
    expected.apply(&patch);
    let updated = records
        .get(record.id)
        .filter(|r| *r == expected)
        .context("Failed to save record. See the log for details.")?;
    info!("Updated record {}", updated.id);

    output.success("Record updated");
    output.print_record(&updated);

    Ok(())
}

/// Delete a record
pub fn delete(store: &mut RecordStore, id: String, yes: bool, output: &Output) -> Result<()> {
    ensure_available(store)?;

    let mut records = RecordCollection::new(store);
    let record = resolve_id(&records, &id)?;

    if output.should_prompt() && !yes {
        println!("Delete record: {} - {}", short_id(&record), record.title);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    records.remove(record.id);
    if records.get(record.id).is_some() {
        bail!("Failed to delete record. See the log for details.");
    }
    info!("Deleted record {}", record.id);

    output.success(&format!("Deleted record: {}", record.id));

    Ok(())
}

/// Delete every record
pub fn clear(store: &mut RecordStore, yes: bool, output: &Output) -> Result<()> {
    ensure_available(store)?;

    let mut records = RecordCollection::new(store);
    if records.is_absent() {
        output.message("No records to clear.");
        return Ok(());
    }

    if output.should_prompt() && !yes {
        println!("Delete all {} record(s)", records.len());
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let count = records.len();
    records.clear();
    if !records.is_absent() {
        bail!("Failed to clear records. See the log for details.");
    }
    info!("Cleared {} records", count);

    output.success(&format!("Deleted {} record(s)", count));

    Ok(())
}

/// Refuse destructive commands when changes could not be persisted
fn ensure_available(store: &RecordStore) -> Result<()> {
    if !store.is_available() {
        bail!("Storage is unavailable. Refusing to modify records.");
    }
    Ok(())
}

/// Resolve a record ID (supports full UUID or prefix)
fn resolve_id(records: &RecordCollection<'_, RecordStore>, id: &str) -> Result<Record> {
    match records.find_by_prefix(id) {
        PrefixMatch::None => bail!("No record found matching: {}", id),
        PrefixMatch::One(record) => Ok(record),
        PrefixMatch::Many(matches) => {
            eprintln!("Multiple records match '{}':", id);
            for record in &matches {
                eprintln!("  {} - {}", record.id, record.title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

/// Ask for new field values, keeping the current ones on empty input
fn prompt_patch(record: &Record) -> Result<RecordPatch> {
    println!("Editing record: {}", record.id);
    println!("Press Enter to keep current value, or type new value.\n");

    let title = prompt_with_default("Title", &record.title)?;
    let description = prompt_with_default("Description", &record.description)?;

    Ok(RecordPatch { title, description })
}
