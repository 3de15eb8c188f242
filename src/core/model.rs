// LogScope - core/model.rs
//
// Core data model types. Pure data definitions with no I/O, no platform
// dependencies.
//
// These types are the shared vocabulary across all layers.

use serde::{Deserialize, Serialize};

// =============================================================================
// Log Entry (normalised output of the line normalizer)
// =============================================================================

/// A single normalised log event retained in the timeline window.
///
/// This is the core data unit that flows through insertion, counting,
/// fan-out, and export. Every transport record — structured or free text —
/// is normalised into one of these (or merged into the previous one as a
/// continuation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Timeline sort key: derived from `ts` but disambiguated so that keys
    /// are unique and strictly increasing in insertion order. Two records
    /// with the same millisecond get distinct keys.
    pub key: i64,

    /// Best-effort record timestamp in milliseconds since the Unix epoch,
    /// as extracted from the record or supplied by the transport.
    pub ts: i64,

    /// Normalised severity level. `None` if the record carried no
    /// recognisable level (such entries never affect the tallies).
    pub severity: Option<Severity>,

    /// Origin tag — a host or adapter-instance identifier (e.g.
    /// `host.alpha`, `hue.0`). `None` when the record carried none.
    pub source: Option<String>,

    /// Full message text, including any continuation content appended
    /// from later timestamp-less lines.
    pub message: String,
}

// =============================================================================
// Severity
// =============================================================================

/// Normalised severity levels, ordered from least to most severe.
///
/// These are the level tokens the upstream log format emits; any other
/// token is treated as "no severity" (`Option::None` on the entry).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Silly,
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    /// Parse a raw level token (case-insensitive). Returns `None` for
    /// anything outside the known set.
    pub fn parse(token: &str) -> Option<Severity> {
        match token.to_ascii_lowercase().as_str() {
            "silly" => Some(Severity::Silly),
            "debug" => Some(Severity::Debug),
            "info" => Some(Severity::Info),
            "warn" => Some(Severity::Warn),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Silly => "silly",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }

    /// Short label for compact display (fixed width 5).
    pub fn short_label(&self) -> &'static str {
        match self {
            Severity::Silly => "SILLY",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO ",
            Severity::Warn => "WARN ",
            Severity::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Counted categories
// =============================================================================

/// A severity category whose occurrences are tallied while counting is
/// enabled for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountedCategory {
    Error,
    Warning,
}

impl std::fmt::Display for CountedCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CountedCategory::Error => f.write_str("error"),
            CountedCategory::Warning => f.write_str("warning"),
        }
    }
}

// =============================================================================
// Raw records (transport payloads)
// =============================================================================

/// One raw record as delivered by the transport, before normalisation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    /// A pre-structured record (already parsed upstream).
    Structured(StructuredRecord),

    /// A free-text line: either a stamped log line or a continuation of
    /// the previous entry.
    Text(String),
}

/// A pre-structured log record as produced by the backend.
///
/// The timestamp is mandatory — a structured record without one is not
/// deserialisable and never reaches the engine. The wire format uses
/// `from` for the origin tag; unknown fields (IDs and the like) are
/// ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StructuredRecord {
    /// Milliseconds since the Unix epoch.
    pub ts: i64,

    /// Severity, if the backend classified the record.
    #[serde(default)]
    pub severity: Option<Severity>,

    /// Origin tag.
    #[serde(default, rename = "from")]
    pub source: Option<String>,

    /// Message payload.
    #[serde(default)]
    pub message: String,
}

// =============================================================================
// Snapshot pull results
// =============================================================================

/// One element of a snapshot pull result.
///
/// The transport may append a single trailing `SizeHint` — a byte-size
/// indicator for the backend's log store — after the records. The engine
/// separates it before sorting and normalising; it is passed through to
/// batch observers opaquely.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotItem {
    Record(RawRecord),
    SizeHint(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parse_known_tokens() {
        assert_eq!(Severity::parse("error"), Some(Severity::Error));
        assert_eq!(Severity::parse("WARN"), Some(Severity::Warn));
        assert_eq!(Severity::parse("Info"), Some(Severity::Info));
        assert_eq!(Severity::parse("debug"), Some(Severity::Debug));
        assert_eq!(Severity::parse("silly"), Some(Severity::Silly));
    }

    /// Unknown level tokens map to None, never to a default severity.
    #[test]
    fn test_severity_parse_unknown_is_none() {
        assert_eq!(Severity::parse("notice"), None);
        assert_eq!(Severity::parse(""), None);
        assert_eq!(Severity::parse("warning!"), None);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warn);
        assert!(Severity::Warn > Severity::Info);
        assert!(Severity::Silly < Severity::Debug);
    }

    /// Wire records use `from` for the origin tag and tolerate unknown
    /// fields such as `_id`.
    #[test]
    fn test_structured_record_wire_shape() {
        let json = r#"{
            "severity": "error",
            "ts": 1588162801514,
            "message": "host.alpha Invalid request",
            "from": "host.alpha",
            "_id": 48358425
        }"#;
        let rec: StructuredRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.ts, 1588162801514);
        assert_eq!(rec.severity, Some(Severity::Error));
        assert_eq!(rec.source.as_deref(), Some("host.alpha"));
        assert_eq!(rec.message, "host.alpha Invalid request");
    }

    /// A structured record without a timestamp must not deserialise —
    /// the timestamp is what makes it directly insertable.
    #[test]
    fn test_structured_record_requires_ts() {
        let json = r#"{"message": "no ts here"}"#;
        assert!(serde_json::from_str::<StructuredRecord>(json).is_err());
    }
}
