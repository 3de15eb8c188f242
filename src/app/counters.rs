// LogScope - app/counters.rs
//
// Rolling error/warning tallies with per-category enable flags.
//
// Explicit state, not ambient globals: every transition goes through a
// method that reports whether the externally visible value changed, so
// the engine can decide exactly when to notify count observers.
//
// Semantics: a counter tallies qualifying entries observed since the last
// reload, clear, or toggle-off. Evictions do NOT decrement — the tally is
// a "seen since" figure, not a live census of the window (reload recomputes
// it from scratch over the fresh window).

use crate::core::model::{CountedCategory, Severity};

/// Error/warning tallies and their enable flags.
#[derive(Debug, Clone)]
pub struct SeverityTallies {
    errors: usize,
    warnings: usize,
    count_errors: bool,
    count_warnings: bool,
}

impl SeverityTallies {
    pub fn new(count_errors: bool, count_warnings: bool) -> Self {
        Self {
            errors: 0,
            warnings: 0,
            count_errors,
            count_warnings,
        }
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn warnings(&self) -> usize {
        self.warnings
    }

    pub fn is_enabled(&self, category: CountedCategory) -> bool {
        match category {
            CountedCategory::Error => self.count_errors,
            CountedCategory::Warning => self.count_warnings,
        }
    }

    /// Tally one newly inserted entry. Returns the category whose counter
    /// changed, if any. Continuations and non-counted severities are the
    /// caller's concern — this is called once per genuinely new entry.
    pub fn record(&mut self, severity: Option<Severity>) -> Option<CountedCategory> {
        match severity {
            Some(Severity::Error) if self.count_errors => {
                self.errors += 1;
                Some(CountedCategory::Error)
            }
            Some(Severity::Warn) if self.count_warnings => {
                self.warnings += 1;
                Some(CountedCategory::Warning)
            }
            _ => None,
        }
    }

    /// Zero both counters (reload start, clear). Returns which categories
    /// actually changed value.
    pub fn reset(&mut self) -> TallyChanges {
        let changes = TallyChanges {
            errors: self.errors != 0,
            warnings: self.warnings != 0,
        };
        self.errors = 0;
        self.warnings = 0;
        changes
    }

    /// Toggle counting for one category.
    ///
    /// Disabling zeroes the counter immediately and returns `true` when
    /// the value changed (so exactly one zero-value notification fires,
    /// skipped if it was already zero). Enabling never recounts the
    /// window — it only gates future increments.
    pub fn set_enabled(&mut self, category: CountedCategory, enabled: bool) -> bool {
        match category {
            CountedCategory::Error => {
                if self.count_errors == enabled {
                    return false;
                }
                self.count_errors = enabled;
                if !enabled {
                    let changed = self.errors != 0;
                    self.errors = 0;
                    return changed;
                }
                false
            }
            CountedCategory::Warning => {
                if self.count_warnings == enabled {
                    return false;
                }
                self.count_warnings = enabled;
                if !enabled {
                    let changed = self.warnings != 0;
                    self.warnings = 0;
                    return changed;
                }
                false
            }
        }
    }
}

/// Which counters changed value during a bulk transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TallyChanges {
    pub errors: bool,
    pub warnings: bool,
}
