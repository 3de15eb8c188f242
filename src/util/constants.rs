// LogScope - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogScope";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "LogScope";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Window limits
// =============================================================================

/// Default maximum number of entries retained in the timeline window.
/// Once exceeded, the oldest entry is evicted on every insert.
pub const DEFAULT_MAX_ENTRIES: usize = 1_000;

/// Minimum sensible window size (the window must hold at least one entry).
pub const MIN_MAX_ENTRIES: usize = 1;

/// Hard upper bound on the window size (prevents configuration mistakes;
/// at ~1 KB per entry this caps the window heap at roughly 1 GB).
pub const ABSOLUTE_MAX_ENTRIES: usize = 1_000_000;

/// Maximum size of a single entry's message in bytes. Continuation lines
/// stop appending once an entry reaches this cap, so a pathological stream
/// of continuations cannot grow one entry without bound.
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024; // 64 KB

// =============================================================================
// Reload / snapshot limits
// =============================================================================

/// Default number of records requested from the transport on a reload.
pub const DEFAULT_FETCH_LIMIT: usize = 200;

/// Minimum configurable fetch limit.
pub const MIN_FETCH_LIMIT: usize = 1;

/// Maximum configurable fetch limit (bounded by the window hard cap —
/// fetching more than the window can retain is wasted transport work).
pub const MAX_FETCH_LIMIT: usize = ABSOLUTE_MAX_ENTRIES;

// =============================================================================
// File feed limits
// =============================================================================

/// How often the file feed polls the watched file for new content (ms).
pub const FEED_POLL_INTERVAL_MS: u64 = 500;

/// How often the cancel flag is checked within each poll sleep interval (ms).
/// The background thread wakes every this many ms to check for cancellation.
pub const FEED_CANCEL_CHECK_INTERVAL_MS: u64 = 100;

/// Minimum user-configurable feed poll interval (ms).
pub const MIN_FEED_POLL_INTERVAL_MS: u64 = 100;

/// Maximum user-configurable feed poll interval (ms).
pub const MAX_FEED_POLL_INTERVAL_MS: u64 = 10_000; // 10 s

/// Maximum bytes read from the watched file in one poll tick.
/// Prevents a large burst of new content from stalling the poll loop.
pub const MAX_FEED_READ_BYTES_PER_TICK: usize = 512 * 1_024; // 512 KiB

/// Maximum accumulated size of the partial (in-progress) line buffer.
///
/// Guards against OOM when the watched file produces no newlines — binary
/// content, an extremely long single line, or a file opened by mistake.
/// Set to 4x `MAX_FEED_READ_BYTES_PER_TICK` so legitimate lines up to
/// ~2 MiB are tolerated before the fragment is discarded with a warning.
pub const MAX_FEED_PARTIAL_BYTES: usize = MAX_FEED_READ_BYTES_PER_TICK * 4; // 2 MiB

/// Maximum bytes read from the end of the watched file when serving a
/// snapshot pull. Bounds snapshot latency and memory on very large files;
/// the last N lines are taken from within this window.
pub const MAX_FEED_SNAPSHOT_BYTES: usize = 4 * 1024 * 1024; // 4 MiB

// =============================================================================
// Export
// =============================================================================

/// Maximum number of entries that can be exported in a single operation.
pub const MAX_EXPORT_ENTRIES: usize = 5_000_000;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
