//! Progress tracking for fetch operations
//!
//! This module provides the counters shared by every slice pipeline: the
//! number of documents fetched so far and the cumulative total reported by
//! the store. Both are add-only atomics; reads are best-effort snapshots.
//! An optional progress bar mirrors the counters on stderr.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::info;

/// Counters shared across all pipelines of one fetch
pub struct ProgressCounters {
    /// Documents fetched so far
    fetched: AtomicU64,
    /// Sum of the totals reported by every opened search
    total: AtomicU64,
    /// Start time of the operation
    start_time: Instant,
    /// Progress bar (optional, can be disabled)
    bar: Option<ProgressBar>,
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub fetched: u64,
    pub total: u64,
}

impl ProgressSnapshot {
    /// Percentage of the reported total fetched so far
    ///
    /// A zero total counts as complete.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.fetched as f64 / self.total as f64 * 100.0
        }
    }
}

impl ProgressCounters {
    /// Create new counters
    ///
    /// # Arguments
    /// * `enable_bar` - Whether to draw a progress bar on stderr
    ///
    /// # Returns
    /// * `Self` - Counters starting at zero
    pub fn new(enable_bar: bool) -> Self {
        let bar = enable_bar.then(|| {
            let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            bar.set_style(style);
            bar
        });

        Self {
            fetched: AtomicU64::new(0),
            total: AtomicU64::new(0),
            start_time: Instant::now(),
            bar,
        }
    }

    /// Add a reported total hit count
    pub fn add_total(&self, count: u64) {
        let total = self.total.fetch_add(count, Ordering::Relaxed) + count;
        if let Some(ref bar) = self.bar {
            bar.set_length(total);
        }
    }

    /// Add fetched documents
    pub fn add_fetched(&self, count: u64) {
        let fetched = self.fetched.fetch_add(count, Ordering::Relaxed) + count;

        if let Some(ref bar) = self.bar {
            bar.set_position(fetched);

            let elapsed = self.start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                let speed = fetched as f64 / elapsed;
                bar.set_message(format!("({:.0} docs/sec)", speed));
            }
        }
    }

    /// Read both counters
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            fetched: self.fetched.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }

    /// Log the current progress
    pub fn log(&self) {
        let snapshot = self.snapshot();
        info!(
            "Fetched {} documents out of {} documents ({:.1}%)",
            snapshot.fetched,
            snapshot.total,
            snapshot.percent()
        );
    }

    /// Milliseconds since the counters were created
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

impl Default for ProgressCounters {
    fn default() -> Self {
        Self::new(false)
    }
}
