// LogScope - app/engine.rs
//
// The log-stream aggregation engine: owns the timeline window, drives the
// normalizer and ordered inserter, keeps the error/warning tallies, and
// fans updates out to registered observers.
//
// Concurrency model: the engine has no internal threads. It is driven by
// external events — push records, connectivity changes, snapshot
// completions, API calls — which the embedding must deliver in order.
// Only the reload is asynchronous, modelled as request/completion:
// `begin_reload` fires `Transport::request_snapshot` at most once per
// outstanding host, and the embedding later delivers the outcome through
// `on_snapshot_result`. Pushes that arrive while a reload is in flight
// are queued on the pending reload and replayed through the incremental
// path once it lands; a superseding reload for a different host discards
// them. Stale completions (no pending reload, or host mismatch) are
// ignored.

use crate::app::counters::SeverityTallies;
use crate::app::observers::{BatchObserver, CountObserver, ObserverSet, ReloadErrorSink};
use crate::app::transport::Transport;
use crate::core::model::{CountedCategory, LogEntry, RawRecord, SnapshotItem};
use crate::core::normalizer::{self, Normalized};
use crate::core::window::LogWindow;
use crate::util::constants::{DEFAULT_FETCH_LIMIT, DEFAULT_MAX_ENTRIES};
use crate::util::error::TransportError;
use std::sync::Arc;

// =============================================================================
// Configuration
// =============================================================================

/// Engine tuning knobs. See `platform::config` for the file-backed loader.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of entries retained in the window.
    pub max_entries: usize,

    /// Number of records requested from the transport per reload.
    pub fetch_limit: usize,

    /// Initial state of error counting.
    pub count_errors: bool,

    /// Initial state of warning counting.
    pub count_warnings: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            count_errors: true,
            count_warnings: true,
        }
    }
}

// =============================================================================
// Public result types
// =============================================================================

/// Result of a `snapshot` call.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotState {
    /// The cached window, returned immediately.
    Ready {
        entries: Vec<LogEntry>,
        size_hint: Option<u64>,
    },

    /// A reload is in flight (or will start once a host is set). The
    /// resulting batch is delivered to batch observers; concurrent callers
    /// during the same in-flight reload share that single pull.
    Pending,
}

// =============================================================================
// Engine
// =============================================================================

/// A single in-flight reload: the host it was issued for, plus the pushes
/// queued while it is outstanding.
struct PendingReload {
    host: String,
    deferred: Vec<DeferredPush>,
}

struct DeferredPush {
    record: RawRecord,
    size_hint: Option<u64>,
}

/// The log-stream aggregation engine. Long-lived; tracks exactly one
/// active host at a time.
pub struct LogEngine<T: Transport> {
    transport: T,
    config: EngineConfig,

    active_host: Option<String>,
    connected: bool,

    /// `None` until the first reload (or an explicit clear) initialises
    /// the window for the current host. Pushes before that are no-ops.
    window: Option<LogWindow>,

    /// Byte-size indicator from the last successful reload.
    size_hint: Option<u64>,

    pending: Option<PendingReload>,

    tallies: SeverityTallies,

    batch_observers: ObserverSet<dyn BatchObserver>,
    error_observers: ObserverSet<dyn CountObserver>,
    warning_observers: ObserverSet<dyn CountObserver>,
    error_sink: Option<Arc<dyn ReloadErrorSink>>,
}

impl<T: Transport> LogEngine<T> {
    pub fn new(transport: T, config: EngineConfig) -> Self {
        let connected = transport.is_connected();
        let tallies = SeverityTallies::new(config.count_errors, config.count_warnings);
        Self {
            transport,
            config,
            active_host: None,
            connected,
            window: None,
            size_hint: None,
            pending: None,
            tallies,
            batch_observers: ObserverSet::new(),
            error_observers: ObserverSet::new(),
            warning_observers: ObserverSet::new(),
            error_sink: None,
        }
    }

    // -------------------------------------------------------------------------
    // Read accessors
    // -------------------------------------------------------------------------

    pub fn active_host(&self) -> Option<&str> {
        self.active_host.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// True once a reload or an explicit clear has initialised the window.
    pub fn is_initialized(&self) -> bool {
        self.window.is_some()
    }

    /// Number of retained entries (0 while uninitialised).
    pub fn window_len(&self) -> usize {
        self.window.as_ref().map(LogWindow::len).unwrap_or(0)
    }

    pub fn error_total(&self) -> usize {
        self.tallies.errors()
    }

    pub fn warning_total(&self) -> usize {
        self.tallies.warnings()
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    pub fn subscribe_batches(&mut self, observer: Arc<dyn BatchObserver>) {
        self.batch_observers.subscribe(observer);
    }

    pub fn unsubscribe_batches(&mut self, observer: &Arc<dyn BatchObserver>) {
        self.batch_observers.unsubscribe(observer);
    }

    pub fn subscribe_error_count(&mut self, observer: Arc<dyn CountObserver>) {
        self.error_observers.subscribe(observer);
    }

    pub fn unsubscribe_error_count(&mut self, observer: &Arc<dyn CountObserver>) {
        self.error_observers.unsubscribe(observer);
    }

    pub fn subscribe_warning_count(&mut self, observer: Arc<dyn CountObserver>) {
        self.warning_observers.subscribe(observer);
    }

    pub fn unsubscribe_warning_count(&mut self, observer: &Arc<dyn CountObserver>) {
        self.warning_observers.unsubscribe(observer);
    }

    /// Install the sink that receives reload failures. Failures are also
    /// logged; the sink is for collaborator-visible surfacing (banners,
    /// alerts) which is not the engine's concern.
    pub fn set_error_sink(&mut self, sink: Arc<dyn ReloadErrorSink>) {
        self.error_sink = Some(sink);
    }

    // -------------------------------------------------------------------------
    // Host / connectivity events
    // -------------------------------------------------------------------------

    /// Switch the engine to a different backend host. Discards the window
    /// and triggers a full reload when the host actually changes.
    pub fn set_active_host(&mut self, host: &str) {
        if self.active_host.as_deref() == Some(host) {
            return;
        }
        tracing::info!(host, "Active host changed");
        self.active_host = Some(host.to_string());
        self.window = None;
        self.size_hint = None;
        self.begin_reload();
    }

    /// Transport connectivity transition. Reconnecting while a host is
    /// active triggers a full reload; disconnecting only records the flag.
    pub fn on_connectivity_change(&mut self, connected: bool) {
        if connected && !self.connected {
            self.connected = true;
            tracing::debug!("Transport connected");
            if self.active_host.is_some() {
                self.begin_reload();
            }
        } else if !connected && self.connected {
            self.connected = false;
            tracing::debug!("Transport disconnected");
        }
    }

    // -------------------------------------------------------------------------
    // Incremental path
    // -------------------------------------------------------------------------

    /// Feed one push record through normalise → insert → evict → count →
    /// notify. `size_hint` is the transport's byte-size indicator for the
    /// record, passed through to batch observers opaquely.
    ///
    /// While a reload is in flight the record is queued and replayed after
    /// the reload lands. Before the first reload (window uninitialised)
    /// the record is dropped — a defined no-op, tolerating startup races.
    pub fn on_raw_record(&mut self, record: RawRecord, size_hint: Option<u64>) {
        if let Some(pending) = &mut self.pending {
            pending.deferred.push(DeferredPush { record, size_hint });
            return;
        }
        self.apply_record(record, size_hint);
    }

    fn apply_record(&mut self, record: RawRecord, size_hint: Option<u64>) {
        let Some(window) = self.window.as_mut() else {
            tracing::trace!("Push before first reload — dropped");
            return;
        };

        match normalizer::normalize(&record, window.last_key()) {
            Normalized::NewEntry(entry) => {
                let severity = entry.severity;
                let batch = [entry.clone()];
                if let Some(evicted) = window.insert(entry) {
                    tracing::trace!(key = evicted.key, "Evicted oldest entry");
                }
                self.notify_batch(&batch, size_hint);
                match self.tallies.record(severity) {
                    Some(CountedCategory::Error) => self.notify_error_count(),
                    Some(CountedCategory::Warning) => self.notify_warning_count(),
                    None => {}
                }
            }
            Normalized::Continuation(text) => match window.append_to_tail(&text).cloned() {
                Some(updated) => {
                    let batch = [updated];
                    self.notify_batch(&batch, size_hint);
                }
                None => tracing::trace!("Continuation with empty window — dropped"),
            },
        }
    }

    // -------------------------------------------------------------------------
    // Snapshot / reload path
    // -------------------------------------------------------------------------

    /// Return the cached window, or begin (or join) a reload.
    ///
    /// With `force_reload` false and an initialised window the cached
    /// entries are returned immediately. Otherwise a reload is begun —
    /// de-duplicated against any in-flight reload for the same host — and
    /// `Pending` is returned; the batch lands via the observers.
    pub fn snapshot(&mut self, force_reload: bool) -> SnapshotState {
        if !force_reload {
            if let Some(window) = &self.window {
                return SnapshotState::Ready {
                    entries: window.to_vec(),
                    size_hint: self.size_hint,
                };
            }
        }
        self.begin_reload();
        SnapshotState::Pending
    }

    /// Deliver the outcome of a snapshot pull for `host`.
    ///
    /// A failure leaves the window untouched and emits no batch; it is
    /// reported to the error sink and the pending state is cleared so a
    /// later request can retry. Either way, pushes deferred during the
    /// reload are replayed through the incremental path afterwards.
    pub fn on_snapshot_result(
        &mut self,
        host: &str,
        result: Result<Vec<SnapshotItem>, TransportError>,
    ) {
        let pending = match self.pending.take() {
            Some(p) if p.host == host => p,
            Some(p) => {
                tracing::debug!(got = host, want = %p.host, "Stale snapshot result discarded");
                self.pending = Some(p);
                return;
            }
            None => {
                tracing::debug!(host, "Snapshot result with no reload in flight — discarded");
                return;
            }
        };

        match result {
            Ok(items) => self.apply_snapshot(items),
            Err(err) => {
                tracing::warn!(host, error = %err, "Snapshot reload failed — window unchanged");
                if let Some(sink) = &self.error_sink {
                    sink.on_reload_error(host, &err);
                }
            }
        }

        for push in pending.deferred {
            self.apply_record(push.record, push.size_hint);
        }
    }

    fn begin_reload(&mut self) {
        let Some(host) = self.active_host.clone() else {
            tracing::debug!("Reload requested with no active host — deferred until one is set");
            return;
        };

        match &self.pending {
            Some(p) if p.host == host => {
                tracing::debug!(host = %host, "Reload already in flight — joining");
                return;
            }
            Some(p) => {
                // A newer reload supersedes the outstanding one; its queued
                // pushes belong to the superseded host state and are dropped.
                tracing::debug!(superseded = %p.host, host = %host, "Superseding in-flight reload");
            }
            None => {}
        }

        self.pending = Some(PendingReload {
            host: host.clone(),
            deferred: Vec::new(),
        });
        tracing::debug!(host = %host, limit = self.config.fetch_limit, "Snapshot pull requested");
        self.transport.request_snapshot(&host, self.config.fetch_limit);
    }

    fn apply_snapshot(&mut self, mut items: Vec<SnapshotItem>) {
        // Separate the trailing size hint before sorting and normalising.
        let size_hint = match items.last() {
            Some(SnapshotItem::SizeHint(n)) => {
                let n = *n;
                items.pop();
                Some(n)
            }
            _ => None,
        };

        let mut records: Vec<RawRecord> = items
            .into_iter()
            .filter_map(|item| match item {
                SnapshotItem::Record(record) => Some(record),
                SnapshotItem::SizeHint(n) => {
                    tracing::debug!(n, "Non-trailing size hint in snapshot — ignored");
                    None
                }
            })
            .collect();

        // Structured pulls are sorted by original timestamp (stable) so
        // same-millisecond key disambiguation is deterministic. Free-text
        // pulls keep arrival order: continuation lines carry no timestamp
        // and must stay attached to their stamped parent line.
        if records
            .iter()
            .all(|r| matches!(r, RawRecord::Structured(_)))
        {
            records.sort_by_key(|r| match r {
                RawRecord::Structured(s) => s.ts,
                RawRecord::Text(_) => i64::MIN,
            });
        }

        let old_errors = self.tallies.errors();
        let old_warnings = self.tallies.warnings();
        self.tallies.reset();

        let mut window = LogWindow::new(self.config.max_entries);
        for record in &records {
            match normalizer::normalize(record, window.last_key()) {
                Normalized::NewEntry(entry) => {
                    let severity = entry.severity;
                    window.insert(entry);
                    self.tallies.record(severity);
                }
                Normalized::Continuation(text) => {
                    window.append_to_tail(&text);
                }
            }
        }

        let batch = window.to_vec();
        tracing::info!(
            entries = batch.len(),
            errors = self.tallies.errors(),
            warnings = self.tallies.warnings(),
            "Snapshot reload applied"
        );
        self.window = Some(window);
        self.size_hint = size_hint;

        self.notify_batch(&batch, size_hint);
        if self.tallies.errors() != old_errors {
            self.notify_error_count();
        }
        if self.tallies.warnings() != old_warnings {
            self.notify_warning_count();
        }
    }

    // -------------------------------------------------------------------------
    // Clear / counting toggles
    // -------------------------------------------------------------------------

    /// Unconditionally empty the window (initialising it if necessary),
    /// reset both counters, and notify: one zero-value notification per
    /// counter observer whose counter changed, plus one empty batch.
    pub fn clear(&mut self) {
        match self.window.as_mut() {
            Some(window) => window.clear(),
            None => self.window = Some(LogWindow::new(self.config.max_entries)),
        }
        self.size_hint = None;

        let changes = self.tallies.reset();
        if changes.errors {
            self.notify_error_count();
        }
        if changes.warnings {
            self.notify_warning_count();
        }
        self.notify_batch(&[], None);
        tracing::debug!("Window cleared");
    }

    /// Enable or disable counting for one category. Disabling zeroes the
    /// counter and fires one zero-value notification (skipped when it was
    /// already zero); enabling only affects future increments.
    pub fn set_counting_enabled(&mut self, category: CountedCategory, enabled: bool) {
        if self.tallies.set_enabled(category, enabled) {
            match category {
                CountedCategory::Error => self.notify_error_count(),
                CountedCategory::Warning => self.notify_warning_count(),
            }
        }
    }

    // -------------------------------------------------------------------------
    // Fan-out
    // -------------------------------------------------------------------------

    fn notify_batch(&self, entries: &[LogEntry], size_hint: Option<u64>) {
        for observer in self.batch_observers.iter() {
            observer.on_batch(entries, size_hint);
        }
    }

    fn notify_error_count(&self) {
        let value = self.tallies.errors();
        for observer in self.error_observers.iter() {
            observer.on_count(value);
        }
    }

    fn notify_warning_count(&self) {
        let value = self.tallies.warnings();
        for observer in self.warning_observers.iter() {
            observer.on_count(value);
        }
    }
}
