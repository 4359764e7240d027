//! CSV rollup functionality for archiving WAL events.
//!
//! This module implements atomic WAL-to-CSV conversion with proper error handling
//! to prevent data loss.

use crate::{IntakeEvent, Result};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    amount_mg: f64,
    taken_at: String,
    kind: Option<String>,
    cost: Option<f64>,
    note: Option<String>,
}

impl From<&IntakeEvent> for CsvRow {
    fn from(event: &IntakeEvent) -> Self {
        CsvRow {
            id: event.id.to_string(),
            amount_mg: event.amount_mg,
            taken_at: event.taken_at.to_rfc3339(),
            kind: event.kind.map(|k| k.label().to_string()),
            cost: event.cost,
            note: event.note.clone(),
        }
    }
}

/// Roll up WAL events into CSV and archive the WAL atomically
///
/// This function:
/// 1. Reads all events from the WAL
/// 2. Appends them to the CSV file (creates with headers if needed)
/// 3. Syncs the CSV to disk
/// 4. Renames the WAL to .processed
/// 5. Returns the number of events processed
///
/// # Safety
/// - CSV is fsynced before WAL is renamed
/// - WAL is renamed (not deleted) to allow manual recovery if needed
/// - Processed WAL files can be cleaned up manually
pub fn wal_to_csv_and_archive(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    // Read all events from WAL
    let events = crate::wal::read_events(wal_path)?;

    if events.is_empty() {
        tracing::info!("No events in WAL to roll up");
        return Ok(0);
    }

    // Ensure parent directory exists
    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Open CSV file for appending
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Determine if we need to write headers by checking file size after opening
    // This avoids an extra stat() syscall
    let needs_headers = file.metadata()?.len() == 0;

    // CSV writer automatically writes headers if the serialized type has them
    // For appending, we need to skip headers manually if file already has content
    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    // Write all events to CSV
    for event in &events {
        let row = CsvRow::from(event);
        writer.serialize(row)?;
    }

    // Flush and sync to disk
    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Wrote {} events to CSV", events.len());

    // Atomically archive the WAL by renaming it
    let processed_path = wal_path.with_extension("wal.processed");
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!("Archived WAL to {:?}", processed_path);

    Ok(events.len())
}

/// Clean up old processed WAL files
///
/// This removes all .wal.processed files in the given directory.
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Some(extension) = path.extension() {
            if extension == "processed" {
                std::fs::remove_file(&path)?;
                tracing::debug!("Removed processed WAL: {:?}", path);
                count += 1;
            }
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntakeKind;
    use crate::wal::EventSink;
    use chrono::Utc;
    use std::fs::File;
    use uuid::Uuid;

    fn create_test_event(kind: Option<IntakeKind>) -> IntakeEvent {
        IntakeEvent {
            id: Uuid::new_v4(),
            amount_mg: 4.0,
            taken_at: Utc::now(),
            kind,
            cost: Some(0.5),
            note: Some("after lunch, with coffee".into()),
        }
    }

    #[test]
    fn test_wal_to_csv_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("intake_events.wal");
        let csv_path = temp_dir.path().join("events.csv");

        // Write events to WAL
        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        for kind in [None, Some(IntakeKind::Vape), Some(IntakeKind::Pouch)] {
            sink.append(&create_test_event(kind)).unwrap();
        }

        // Roll up to CSV
        let count = wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();
        assert_eq!(count, 3);

        // Verify CSV exists
        assert!(csv_path.exists());

        // Verify WAL was archived
        assert!(!wal_path.exists());
        assert!(wal_path.with_extension("wal.processed").exists());
    }

    #[test]
    fn test_wal_to_csv_appends() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("intake_events.wal");
        let csv_path = temp_dir.path().join("events.csv");

        // First rollup
        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        sink.append(&create_test_event(None)).unwrap();
        let count1 = wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();
        assert_eq!(count1, 1);

        // Second rollup (appends)
        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        sink.append(&create_test_event(Some(IntakeKind::Gum))).unwrap();
        let count2 = wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();
        assert_eq!(count2, 1);

        // Verify CSV has both entries
        let reader = csv::Reader::from_path(&csv_path).unwrap();
        let record_count = reader.into_records().count();
        assert_eq!(record_count, 2);
    }

    #[test]
    fn test_empty_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("empty.wal");
        let csv_path = temp_dir.path().join("events.csv");

        // Create empty WAL
        File::create(&wal_path).unwrap();

        let count = wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_cleanup_processed_wals() {
        let temp_dir = tempfile::tempdir().unwrap();

        // Create some processed WAL files
        File::create(temp_dir.path().join("e1.wal.processed")).unwrap();
        File::create(temp_dir.path().join("e2.wal.processed")).unwrap();
        File::create(temp_dir.path().join("keep.wal")).unwrap();

        let count = cleanup_processed_wals(temp_dir.path()).unwrap();
        assert_eq!(count, 2);

        // Verify only .processed files were removed
        assert!(!temp_dir.path().join("e1.wal.processed").exists());
        assert!(!temp_dir.path().join("e2.wal.processed").exists());
        assert!(temp_dir.path().join("keep.wal").exists());
    }
}
