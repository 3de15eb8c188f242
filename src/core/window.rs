// LogScope - core/window.rs
//
// The timeline window: a bounded, key-ordered sequence of log entries.
//
// Combines the ordered inserter (amortised O(1) append fast path, O(n)
// backward-scan slow path for late arrivals) with the bounded-window rule
// (synchronous oldest-first eviction). The window never holds duplicate
// keys — callers assign keys via the normalizer, which disambiguates
// collisions before insertion.

use crate::core::model::LogEntry;
use crate::util::constants::MAX_MESSAGE_BYTES;
use std::collections::VecDeque;

/// Bounded, key-ordered in-memory sequence of retained log entries.
#[derive(Debug)]
pub struct LogWindow {
    entries: VecDeque<LogEntry>,
    max_entries: usize,
}

impl LogWindow {
    /// Create an empty window retaining at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(1024)),
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Key of the newest (last) entry, or `None` when empty. This is the
    /// `last_key` input to the normalizer's key assignment.
    pub fn last_key(&self) -> Option<i64> {
        self.entries.back().map(|e| e.key)
    }

    pub fn front(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn back(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Clone the retained entries in key order (for batch notifications
    /// and snapshots).
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Insert a keyed entry preserving ascending key order, then enforce
    /// the size bound. Returns the evicted (lowest-key) entry when the
    /// insertion pushed the window over its maximum.
    ///
    /// Fast path: the new key is >= the tail key (or the window is empty)
    /// and the entry is appended. Slow path: a late arrival is placed by
    /// scanning backward from the tail for the first strictly smaller key.
    /// The scan only orders pre-disambiguated keys; it never assigns one.
    pub fn insert(&mut self, entry: LogEntry) -> Option<LogEntry> {
        debug_assert!(
            self.entries.iter().all(|e| e.key != entry.key),
            "duplicate window key {}",
            entry.key
        );

        match self.entries.back() {
            None => self.entries.push_back(entry),
            Some(last) if entry.key >= last.key => self.entries.push_back(entry),
            _ => {
                // Late arrival: find the insertion point such that every
                // entry to the left has a strictly smaller key.
                let mut idx = self.entries.len();
                while idx > 0 && self.entries[idx - 1].key > entry.key {
                    idx -= 1;
                }
                self.entries.insert(idx, entry);
            }
        }

        if self.entries.len() > self.max_entries {
            self.entries.pop_front()
        } else {
            None
        }
    }

    /// Append continuation text verbatim to the newest entry's message.
    ///
    /// Returns the updated entry, or `None` when the window is empty (the
    /// continuation is dropped). Appends stop once the message has reached
    /// `MAX_MESSAGE_BYTES`, so a pathological continuation stream cannot
    /// grow a single entry without bound.
    pub fn append_to_tail(&mut self, text: &str) -> Option<&LogEntry> {
        let last = self.entries.back_mut()?;

        if last.message.len() <= MAX_MESSAGE_BYTES {
            last.message.push_str(text);
            if last.message.len() > MAX_MESSAGE_BYTES {
                let mut cut = MAX_MESSAGE_BYTES;
                while !last.message.is_char_boundary(cut) {
                    cut -= 1;
                }
                last.message.truncate(cut);
                last.message.push_str("... [truncated]");
            }
        }

        self.entries.back()
    }
}
