// LogScope - core/export.rs
//
// CSV, JSON, and plain-text export of timeline entries.
// Core layer: writes to any Write trait object.

use crate::core::model::LogEntry;
use crate::util::constants::MAX_EXPORT_ENTRIES;
use crate::util::error::ExportError;
use chrono::DateTime;
use std::io::Write;
use std::path::Path;

/// Export format selector for the driver binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Text,
}

/// Render an entry's timestamp as RFC 3339, or empty when out of range.
fn format_ts(ts: i64) -> String {
    DateTime::from_timestamp_millis(ts)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

fn check_count(entries: &[LogEntry]) -> Result<(), ExportError> {
    if entries.len() > MAX_EXPORT_ENTRIES {
        return Err(ExportError::TooManyEntries {
            count: entries.len(),
            max: MAX_EXPORT_ENTRIES,
        });
    }
    Ok(())
}

/// Export entries to CSV.
///
/// Columns: key, timestamp, severity, source, message.
pub fn export_csv<W: Write>(
    entries: &[LogEntry],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    check_count(entries)?;

    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(["key", "timestamp", "severity", "source", "message"])
        .map_err(|e| ExportError::Csv {
            path: export_path.to_path_buf(),
            source: e,
        })?;

    let mut count = 0;
    for entry in entries {
        csv_writer
            .write_record([
                &entry.key.to_string(),
                &format_ts(entry.ts),
                entry.severity.map(|s| s.label()).unwrap_or(""),
                entry.source.as_deref().unwrap_or(""),
                &entry.message,
            ])
            .map_err(|e| ExportError::Csv {
                path: export_path.to_path_buf(),
                source: e,
            })?;
        count += 1;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(count)
}

/// Export entries to JSON (array of objects).
pub fn export_json<W: Write>(
    entries: &[LogEntry],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    check_count(entries)?;

    serde_json::to_writer_pretty(writer, entries).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(entries.len())
}

/// Export entries as plain text, one line per entry in display form.
pub fn export_text<W: Write>(
    entries: &[LogEntry],
    mut writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    check_count(entries)?;

    let mut count = 0;
    for entry in entries {
        writeln!(
            writer,
            "{} [{}] {}: {}",
            format_ts(entry.ts),
            entry.severity.map(|s| s.label()).unwrap_or("-"),
            entry.source.as_deref().unwrap_or("-"),
            entry.message
        )
        .map_err(|e| ExportError::Io {
            path: export_path.to_path_buf(),
            source: e,
        })?;
        count += 1;
    }

    writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(count)
}
