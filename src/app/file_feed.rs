// LogScope - app/file_feed.rs
//
// File feed: a file-backed transport that tails a local log file and
// serves snapshot pulls from it. Used by the console driver and the e2e
// tests; any other transport (socket, message bus) plugs into the same
// `Transport` / `TransportEvent` contract.
//
// Architecture:
//   - `FileFeed::spawn` starts a background poll thread and returns a
//     `FileFeedHandle` (the engine-facing `Transport`) plus the event
//     receiver the embedding pumps into the engine.
//   - An `Arc<AtomicBool>` cancel flag allows the embedding to stop the
//     feed; the poll sleep is sub-divided so both cancellation and
//     snapshot commands are served promptly.
//   - New complete lines are sent as `TransportEvent::Record` values, one
//     per line, each carrying the line's byte length as its size hint.
//   - File presence drives connectivity: a vanished file sends
//     `Connectivity(false)`, a reappearing one `Connectivity(true)`
//     (which makes the engine reload — exactly what a rotated-in fresh
//     file needs).
//
// Encoding: new bytes are decoded as lossy UTF-8. Truncated/rotated files
// (size < last offset) reset the offset to 0 so rewritten content is
// picked up cleanly. MAX_FEED_READ_BYTES_PER_TICK caps the bytes consumed
// per tick so a burst of large writes cannot stall the poll loop.

use crate::app::transport::{Transport, TransportEvent};
use crate::core::model::{RawRecord, SnapshotItem};
use crate::util::constants::{
    FEED_CANCEL_CHECK_INTERVAL_MS, FEED_POLL_INTERVAL_MS, MAX_FEED_PARTIAL_BYTES,
    MAX_FEED_READ_BYTES_PER_TICK, MAX_FEED_SNAPSHOT_BYTES,
};
use crate::util::error::TransportError;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Public types
// =============================================================================

/// File feed tuning knobs.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// How often the watched file is polled for new content (ms).
    pub poll_interval_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: FEED_POLL_INTERVAL_MS,
        }
    }
}

/// Engine-facing handle to a running file feed.
///
/// Implements [`Transport`]: snapshot requests are forwarded to the poll
/// thread over a command channel and answered as
/// [`TransportEvent::Snapshot`] on the event channel.
pub struct FileFeedHandle {
    cmd_tx: mpsc::Sender<FeedCommand>,
    cancel: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
}

impl FileFeedHandle {
    /// Request the background thread to stop. It exits within one
    /// cancel-check interval.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

impl Transport for FileFeedHandle {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn request_snapshot(&mut self, host: &str, limit: usize) {
        let cmd = FeedCommand::FetchSnapshot {
            host: host.to_string(),
            limit,
        };
        if self.cmd_tx.send(cmd).is_err() {
            tracing::warn!(host, "File feed thread is gone — snapshot request dropped");
        }
    }
}

enum FeedCommand {
    FetchSnapshot { host: String, limit: usize },
}

/// Namespace for spawning file feeds.
pub struct FileFeed;

impl FileFeed {
    /// Start tailing `path` from its *current end* (new content only).
    ///
    /// Returns the engine-facing handle and the event receiver. The
    /// embedding pumps received events into the engine in order.
    pub fn spawn(
        path: PathBuf,
        config: FeedConfig,
    ) -> (FileFeedHandle, mpsc::Receiver<TransportEvent>) {
        let (event_tx, event_rx) = mpsc::channel();
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let connected = Arc::new(AtomicBool::new(path.exists()));

        let handle = FileFeedHandle {
            cmd_tx,
            cancel: Arc::clone(&cancel),
            connected: Arc::clone(&connected),
        };

        let initially_present = connected.load(Ordering::SeqCst);
        std::thread::spawn(move || {
            run_feed_watcher(
                path,
                config,
                event_tx,
                cmd_rx,
                cancel,
                connected,
                initially_present,
            );
        });

        tracing::info!(present = initially_present, "File feed started");
        (handle, event_rx)
    }
}

// =============================================================================
// Background watcher
// =============================================================================

/// Per-file tail state.
struct TailState {
    /// Byte position of the last byte examined. Always advances by exactly
    /// the number of bytes read each tick.
    offset: u64,
    /// Bytes from the most recent read that followed the final newline —
    /// an in-progress line, prepended to the next tick's decoded bytes.
    partial: String,
    /// Whether the file existed at the last poll.
    present: bool,
}

fn run_feed_watcher(
    path: PathBuf,
    config: FeedConfig,
    tx: mpsc::Sender<TransportEvent>,
    cmd_rx: mpsc::Receiver<FeedCommand>,
    cancel: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    initially_present: bool,
) {
    macro_rules! send {
        ($msg:expr) => {
            if tx.send($msg).is_err() {
                // Embedding dropped the receiver — exit silently.
                return;
            }
        };
    }

    let mut state = TailState {
        // Seed to the current end so only content written after the feed
        // started is surfaced as push records.
        offset: std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0),
        partial: String::new(),
        present: initially_present,
    };
    tracing::debug!(file = %path.display(), offset = state.offset, "Feed: seeding initial offset");

    // Sub-divide each poll interval into cancel/command-check slices.
    let slices = (config.poll_interval_ms / FEED_CANCEL_CHECK_INTERVAL_MS).max(1);

    loop {
        // Interruptible wait: serve snapshot commands while sleeping.
        for _ in 0..slices {
            if cancel.load(Ordering::SeqCst) {
                return;
            }
            match cmd_rx.recv_timeout(Duration::from_millis(FEED_CANCEL_CHECK_INTERVAL_MS)) {
                Ok(FeedCommand::FetchSnapshot { host, limit }) => {
                    let result = fetch_snapshot(&path, limit);
                    send!(TransportEvent::Snapshot { host, result });
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }

        // -----------------------------------------------------------------
        // 1. Check current file size; file presence drives connectivity.
        // -----------------------------------------------------------------
        let current_size = match std::fs::metadata(&path) {
            Ok(m) => m.len(),
            Err(e) => {
                if state.present {
                    tracing::info!(file = %path.display(), error = %e, "Feed: file vanished");
                    state.present = false;
                    state.offset = 0;
                    state.partial.clear();
                    connected.store(false, Ordering::SeqCst);
                    send!(TransportEvent::Connectivity(false));
                }
                continue;
            }
        };

        if !state.present {
            tracing::info!(file = %path.display(), "Feed: file appeared");
            state.present = true;
            connected.store(true, Ordering::SeqCst);
            send!(TransportEvent::Connectivity(true));
        }

        // -----------------------------------------------------------------
        // 2. Handle rotation / truncation.
        // -----------------------------------------------------------------
        if current_size < state.offset {
            tracing::info!(
                file = %path.display(),
                old_offset = state.offset,
                new_size = current_size,
                "Feed: file truncated or rotated — resetting offset to 0"
            );
            state.offset = 0;
            state.partial.clear();
        }

        // -----------------------------------------------------------------
        // 3. Nothing new.
        // -----------------------------------------------------------------
        if current_size == state.offset {
            continue;
        }

        // -----------------------------------------------------------------
        // 4. Read new bytes (capped per tick).
        // -----------------------------------------------------------------
        let bytes_available = (current_size - state.offset) as usize;
        let read_limit = bytes_available.min(MAX_FEED_READ_BYTES_PER_TICK);

        let new_bytes = match read_bytes_at(&path, state.offset, read_limit) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Feed: read error");
                continue;
            }
        };

        let n = new_bytes.len();
        if n == 0 {
            continue;
        }

        // Advance unconditionally — these bytes are consumed whether they
        // produce complete lines or not.
        state.offset += n as u64;

        // -----------------------------------------------------------------
        // 5. Decode (lossy UTF-8) and append to the partial-line buffer.
        // -----------------------------------------------------------------
        let decoded = String::from_utf8_lossy(&new_bytes);
        state.partial.push_str(&decoded);

        if state.partial.len() > MAX_FEED_PARTIAL_BYTES {
            tracing::warn!(
                file = %path.display(),
                bytes = state.partial.len(),
                "Feed: discarding oversized newline-less fragment"
            );
            state.partial.clear();
            continue;
        }

        // -----------------------------------------------------------------
        // 6. Split at the last newline; everything after it is an
        //    in-progress line carried to the next tick.
        // -----------------------------------------------------------------
        let complete_text = match state.partial.rfind('\n') {
            Some(nl_pos) => {
                let complete = state.partial[..=nl_pos].to_string();
                state.partial = state.partial[nl_pos + 1..].to_string();
                complete
            }
            None => continue,
        };

        // -----------------------------------------------------------------
        // 7. Push one record per complete line.
        // -----------------------------------------------------------------
        for line in complete_text.lines() {
            if line.is_empty() {
                continue;
            }
            send!(TransportEvent::Record {
                size_hint: Some(line.len() as u64),
                record: RawRecord::Text(line.to_string()),
            });
        }
    }
}

/// Serve a snapshot pull: the last `limit` non-empty lines of the file,
/// followed by a trailing size hint carrying the file's byte size.
///
/// Reads at most `MAX_FEED_SNAPSHOT_BYTES` from the end of the file; when
/// the window starts mid-file the first (partial) line is discarded.
fn fetch_snapshot(path: &Path, limit: usize) -> Result<Vec<SnapshotItem>, TransportError> {
    let size = std::fs::metadata(path)
        .map_err(|source| TransportError::Io { source })?
        .len();

    let start = size.saturating_sub(MAX_FEED_SNAPSHOT_BYTES as u64);
    let read_limit = (size - start) as usize;
    let bytes =
        read_bytes_at(path, start, read_limit).map_err(|source| TransportError::Io { source })?;
    let text = String::from_utf8_lossy(&bytes);

    let mut lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
    if start > 0 && !lines.is_empty() {
        // The window opened mid-line; the first fragment is not a record.
        lines.remove(0);
    }
    let skip = lines.len().saturating_sub(limit);

    let mut items: Vec<SnapshotItem> = lines[skip..]
        .iter()
        .map(|line| SnapshotItem::Record(RawRecord::Text((*line).to_string())))
        .collect();
    items.push(SnapshotItem::SizeHint(size));

    tracing::debug!(
        file = %path.display(),
        records = items.len() - 1,
        size,
        "Feed: snapshot served"
    );
    Ok(items)
}

/// Read up to `limit` bytes from `path` starting at byte position `offset`.
fn read_bytes_at(path: &Path, offset: u64, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut file = std::fs::File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; limit];
    let n = file.read(&mut buf)?;
    buf.truncate(n);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Instant;

    const DEADLINE: Duration = Duration::from_secs(5);

    fn fast_config() -> FeedConfig {
        FeedConfig {
            poll_interval_ms: 100,
        }
    }

    /// Drain events until `pred` accepts one, or panic at the deadline.
    fn wait_for<F>(rx: &mpsc::Receiver<TransportEvent>, mut pred: F) -> TransportEvent
    where
        F: FnMut(&TransportEvent) -> bool,
    {
        let start = Instant::now();
        while start.elapsed() < DEADLINE {
            if let Ok(event) = rx.recv_timeout(Duration::from_millis(100)) {
                if pred(&event) {
                    return event;
                }
            }
        }
        panic!("expected event did not arrive within {DEADLINE:?}");
    }

    #[test]
    fn test_snapshot_serves_last_lines_with_trailing_size_hint() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "line one\nline two\nline three\n").unwrap();
        let file_size = std::fs::metadata(&path).unwrap().len();

        let (mut handle, rx) = FileFeed::spawn(path, fast_config());
        handle.request_snapshot("host.file", 2);

        let event = wait_for(&rx, |e| matches!(e, TransportEvent::Snapshot { .. }));
        let TransportEvent::Snapshot { host, result } = event else {
            unreachable!()
        };
        assert_eq!(host, "host.file");

        let items = result.expect("snapshot must succeed");
        assert_eq!(items.len(), 3, "two records plus the trailing size hint");
        assert_eq!(
            items[0],
            SnapshotItem::Record(RawRecord::Text("line two".to_string()))
        );
        assert_eq!(
            items[1],
            SnapshotItem::Record(RawRecord::Text("line three".to_string()))
        );
        assert_eq!(items[2], SnapshotItem::SizeHint(file_size));

        handle.stop();
    }

    #[test]
    fn test_snapshot_missing_file_reports_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing.log");

        let (mut handle, rx) = FileFeed::spawn(path, fast_config());
        assert!(!handle.is_connected());
        handle.request_snapshot("host.file", 10);

        let event = wait_for(&rx, |e| matches!(e, TransportEvent::Snapshot { .. }));
        let TransportEvent::Snapshot { result, .. } = event else {
            unreachable!()
        };
        assert!(matches!(result, Err(TransportError::Io { .. })));

        handle.stop();
    }

    /// Lines appended after spawn stream out as one record per line with
    /// the line length as size hint; content present before spawn does not.
    #[test]
    fn test_appended_lines_stream_as_records() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "old content\n").unwrap();

        let (handle, rx) = FileFeed::spawn(path.clone(), fast_config());
        assert!(handle.is_connected());

        // Give the watcher a moment to seed its offset, then append.
        std::thread::sleep(Duration::from_millis(300));
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "fresh line").unwrap();
        file.flush().unwrap();

        let event = wait_for(&rx, |e| matches!(e, TransportEvent::Record { .. }));
        let TransportEvent::Record { record, size_hint } = event else {
            unreachable!()
        };
        assert_eq!(record, RawRecord::Text("fresh line".to_string()));
        assert_eq!(size_hint, Some("fresh line".len() as u64));

        handle.stop();
    }

    /// Truncation resets the offset so rewritten content is picked up.
    #[test]
    fn test_truncation_resets_offset() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "aaaaaaaaaaaaaaaaaaaaaaaa\n").unwrap();

        let (handle, rx) = FileFeed::spawn(path.clone(), fast_config());
        std::thread::sleep(Duration::from_millis(300));

        // Rotate: replace with a shorter file.
        std::fs::write(&path, "rotated\n").unwrap();

        let event = wait_for(&rx, |e| matches!(e, TransportEvent::Record { .. }));
        let TransportEvent::Record { record, .. } = event else {
            unreachable!()
        };
        assert_eq!(record, RawRecord::Text("rotated".to_string()));

        handle.stop();
    }
}
