use csv::WriterBuilder;
use serde::Serialize;
use tracing::info;

use super::{BlobStore, StorageError};

/// One row of the tracking log. Field order is the CSV column order.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingEntry {
    pub job_title: String,
    pub company: String,
    pub role: String,
    pub tailored_resume_identifier: String,
    pub date_modified: String,
}

/// Appends `entry` to the tracking CSV, creating it with a header row if it
/// does not exist yet. The whole file is rewritten on every update.
pub async fn append_entry(
    store: &dyn BlobStore,
    container: &str,
    file_name: &str,
    entry: &TrackingEntry,
) -> Result<(), StorageError> {
    let existing = store.get(container, file_name).await?.unwrap_or_default();
    let updated = append_row(existing, entry)?;
    store.put(container, file_name, updated, "text/csv").await?;
    info!(
        "Tracking log {container}/{file_name} updated with {}",
        entry.tailored_resume_identifier
    );
    Ok(())
}

fn append_row(mut existing: Vec<u8>, entry: &TrackingEntry) -> Result<Vec<u8>, StorageError> {
    let needs_header = existing.iter().all(|b| b.is_ascii_whitespace());
    if needs_header {
        existing.clear();
    } else if existing.last() != Some(&b'\n') {
        existing.push(b'\n');
    }

    let mut wtr = WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(existing);
    wtr.serialize(entry)?;
    wtr.into_inner()
        .map_err(|e| StorageError::Backend(e.to_string()))
}
