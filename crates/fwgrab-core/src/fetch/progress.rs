//! Progress reporting for one download (bytes done, rate, ETA).

use std::time::Instant;

use crate::plan::DownloadPlan;

use super::{FetchError, FetchedFile};

/// Snapshot of download progress for one entry.
#[derive(Debug, Clone)]
pub struct ProgressStats {
    /// Body bytes received so far.
    pub bytes_done: u64,
    /// Total size if the server sent `Content-Length`.
    pub total_bytes: Option<u64>,
    /// Elapsed time since the request started (seconds).
    pub elapsed_secs: f64,
}

impl ProgressStats {
    pub(super) fn sample(started: Instant, bytes_done: u64, total_bytes: Option<u64>) -> Self {
        Self {
            bytes_done,
            total_bytes,
            elapsed_secs: started.elapsed().as_secs_f64(),
        }
    }

    /// Download rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining; `None` when the total or the rate is unknown.
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes?.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0], if the total is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes? {
            0 => Some(1.0),
            total => Some((self.bytes_done as f64 / total as f64).min(1.0)),
        }
    }
}

/// Callbacks for a materialize run. All methods default to no-ops.
pub trait FetchObserver {
    /// Entry `index` (0-based) of `count` is about to be requested.
    fn on_start(&mut self, _index: usize, _count: usize, _plan: &DownloadPlan) {}

    /// Called repeatedly while the body is streaming.
    fn on_progress(&mut self, _plan: &DownloadPlan, _stats: &ProgressStats) {}

    fn on_finish(&mut self, _plan: &DownloadPlan, _result: &Result<FetchedFile, FetchError>) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl FetchObserver for SilentObserver {}
