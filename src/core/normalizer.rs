// LogScope - core/normalizer.rs
//
// Line normalizer: turns one raw transport record into a canonical entry
// candidate, a continuation of the previous entry, or nothing.
//
// Free-text parsing is a documented grammar, not ad hoc slicing:
//
//   STAMP    ^YYYY-MM-DD HH:MM:SS.mmm         (line start, 3 ms digits)
//   SEVERITY [silly|debug|info|warn|error]     (first bracketed level token)
//   SOURCE   ": host.<token>" or ": <ident>.<instance>"
//                                              (dotted origin after a colon)
//   MESSAGE  everything after the first "]: " marker
//
// A line without STAMP is a continuation: its entire text is appended
// verbatim to the previous entry's message. Normalisation is a pure,
// synchronous function of (window tail key, raw record) — it never blocks
// and never touches the window itself.

use crate::core::model::{LogEntry, RawRecord, Severity};
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;

/// Chrono format matching the STAMP grammar above.
const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Outcome of normalising one raw record against the current window tail.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// A new entry, key already assigned. Ready for ordered insertion.
    NewEntry(LogEntry),

    /// A timestamp-less line: append this text verbatim to the message of
    /// the last window entry. If the window is empty the caller drops it.
    Continuation(String),
}

/// Fields extracted from a stamped free-text line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    /// Parsed STAMP as milliseconds since the Unix epoch (UTC).
    pub ts: i64,
    /// Parsed SEVERITY token, if present and recognised.
    pub severity: Option<Severity>,
    /// Parsed SOURCE token, if present.
    pub source: Option<String>,
    /// Message payload.
    pub message: String,
}

fn stamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3}")
            .expect("normalizer: invalid STAMP regex")
    })
}

fn severity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[(silly|debug|info|warn|error)\]")
            .expect("normalizer: invalid SEVERITY regex")
    })
}

fn source_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Two origin shapes: a host identifier (`host.alpha`) or an
        // adapter-instance identifier (`hue.0`), both following ": ".
        Regex::new(r": (host\.[^\s:()]+|[A-Za-z][A-Za-z0-9_-]*\.\d+)")
            .expect("normalizer: invalid SOURCE regex")
    })
}

/// Parse one stamped free-text line against the grammar.
///
/// Returns `None` when the line does not begin with STAMP (i.e. it is a
/// continuation). A line with a STAMP always yields a `ParsedLine`:
/// severity and source are best-effort, and when the "]: " marker is
/// missing the message falls back to the post-stamp remainder, trimmed.
pub fn parse_line(line: &str) -> Option<ParsedLine> {
    let stamp = stamp_re().find(line)?;

    // The STAMP regex guarantees the shape, so a chrono failure here can
    // only be a calendar-invalid date (e.g. month 13). Such lines are
    // treated as continuations rather than entries with a garbage key.
    let ts = NaiveDateTime::parse_from_str(stamp.as_str(), STAMP_FORMAT)
        .ok()?
        .and_utc()
        .timestamp_millis();

    let rest = &line[stamp.end()..];

    let severity = severity_re()
        .captures(rest)
        .and_then(|caps| caps.get(1))
        .and_then(|m| Severity::parse(m.as_str()));

    let source = source_re()
        .captures(rest)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    let message = match rest.split_once("]: ") {
        Some((_, payload)) => payload.to_string(),
        None => rest.trim().to_string(),
    };

    Some(ParsedLine {
        ts,
        severity,
        source,
        message,
    })
}

/// Assign the timeline sort key for a candidate entry.
///
/// `last_key` is the key of the current last window entry (`None` when the
/// window is empty). Keys must be unique and usable for ordering, so
/// same-millisecond or out-of-order arrivals are disambiguated by
/// incrementing past the tail: the assigned key is always strictly greater
/// than `last_key`.
pub fn assign_key(last_key: Option<i64>, ts: i64) -> i64 {
    match last_key {
        Some(last) if last >= ts => last + 1,
        _ => ts,
    }
}

/// Normalise one raw record against the current window tail key.
///
/// Structured records are accepted directly; free-text lines go through
/// the grammar. The result is either a keyed [`LogEntry`] ready for
/// insertion or a continuation payload for the tail entry.
pub fn normalize(record: &RawRecord, last_key: Option<i64>) -> Normalized {
    match record {
        RawRecord::Structured(rec) => Normalized::NewEntry(LogEntry {
            key: assign_key(last_key, rec.ts),
            ts: rec.ts,
            severity: rec.severity,
            source: rec.source.clone(),
            message: rec.message.clone(),
        }),
        RawRecord::Text(line) => match parse_line(line) {
            Some(parsed) => Normalized::NewEntry(LogEntry {
                key: assign_key(last_key, parsed.ts),
                ts: parsed.ts,
                severity: parsed.severity,
                source: parsed.source,
                message: parsed.message,
            }),
            None => Normalized::Continuation(line.clone()),
        },
    }
}
