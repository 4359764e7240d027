//! Intake history loading with a trailing-days window.
//!
//! This module loads recent events from both WAL and CSV files to provide
//! the event list the concentration engine and aggregations consume.

use crate::{IntakeEvent, Result};
use chrono::{DateTime, Duration, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// CSV row format for reading archived events
#[derive(Debug, Deserialize)]
struct CsvRow {
    id: String,
    amount_mg: f64,
    taken_at: String,
    kind: Option<String>,
    cost: Option<f64>,
    note: Option<String>,
}

impl TryFrom<CsvRow> for IntakeEvent {
    type Error = crate::Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| crate::Error::Other(format!("Invalid UUID: {}", e)))?;

        let taken_at = DateTime::parse_from_rfc3339(&row.taken_at)
            .map_err(|e| crate::Error::Other(format!("Invalid date: {}", e)))?
            .with_timezone(&Utc);

        // An unrecognized kind degrades to untagged rather than losing the row
        let kind = row.kind.as_deref().and_then(|s| s.parse().ok());

        Ok(IntakeEvent {
            id,
            amount_mg: row.amount_mg,
            taken_at,
            kind,
            cost: row.cost,
            note: row.note,
        })
    }
}

/// Load events from the last N days from both WAL and CSV
///
/// Returns events sorted by taken_at (newest first).
/// Automatically deduplicates events that appear in both WAL and CSV.
pub fn load_recent_events(wal_path: &Path, csv_path: &Path, days: i64) -> Result<Vec<IntakeEvent>> {
    let cutoff = Utc::now() - Duration::days(days);
    let mut events = Vec::new();
    let mut seen_ids = HashSet::new();

    // Load from WAL first (most recent)
    if wal_path.exists() {
        let wal_events = crate::wal::read_events(wal_path)?;
        for event in wal_events {
            if event.taken_at >= cutoff {
                seen_ids.insert(event.id);
                events.push(event);
            }
        }
        tracing::debug!("Loaded {} events from WAL", events.len());
    }

    // Load from CSV (archived)
    if csv_path.exists() {
        let csv_events = load_events_from_csv(csv_path)?;
        let mut csv_count = 0;
        for event in csv_events {
            if event.taken_at >= cutoff && !seen_ids.contains(&event.id) {
                seen_ids.insert(event.id);
                events.push(event);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} events from CSV", csv_count);
    }

    // Sort by taken_at, newest first
    events.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));

    tracing::info!("Loaded {} total events from last {} days", events.len(), days);

    Ok(events)
}

/// Load all events from a CSV file
fn load_events_from_csv(path: &Path) -> Result<Vec<IntakeEvent>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut events = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => match IntakeEvent::try_from(row) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!("Failed to parse CSV row: {}", e);
                    // Continue processing other rows
                }
            },
            Err(e) => {
                tracing::warn!("Failed to deserialize CSV row: {}", e);
            }
        }
    }

    Ok(events)
}
