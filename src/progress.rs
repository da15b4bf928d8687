use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Longest gap between two progress lines, regardless of batch size.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// Running counters for one verification run.
///
/// Only the aggregator increments the counters; anyone holding an `Arc` may
/// read them while the run is in flight.
#[derive(Debug)]
pub struct RunningStats {
    total_checked: AtomicU64,
    total_valid: AtomicU64,
    total_invalid: AtomicU64,
    start_time: Instant,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(start_time: Instant) -> Self {
        Self {
            total_checked: AtomicU64::new(0),
            total_valid: AtomicU64::new(0),
            total_invalid: AtomicU64::new(0),
            start_time,
        }
    }

    /// Counts one outcome and returns the new checked total.
    pub fn record(&self, valid: bool) -> u64 {
        if valid {
            self.total_valid.fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_invalid.fetch_add(1, Ordering::Relaxed);
        }
        self.total_checked.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn total_checked(&self) -> u64 {
        self.total_checked.load(Ordering::Acquire)
    }

    pub fn total_valid(&self) -> u64 {
        self.total_valid.load(Ordering::Relaxed)
    }

    pub fn total_invalid(&self) -> u64 {
        self.total_invalid.load(Ordering::Relaxed)
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_checked: self.total_checked(),
            total_valid: self.total_valid(),
            total_invalid: self.total_invalid(),
            elapsed: self.elapsed(),
        }
    }

    pub fn progress(&self, total: usize) -> ProgressInfo {
        ProgressInfo::compute(total as u64, self.snapshot())
    }
}

impl Default for RunningStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`RunningStats`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub total_checked: u64,
    pub total_valid: u64,
    pub total_invalid: u64,
    pub elapsed: Duration,
}

impl StatsSnapshot {
    /// Checked addresses per second over the whole run.
    pub fn rate(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.total_checked as f64 / seconds
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressInfo {
    pub total: u64,
    pub checked: u64,
    pub invalid: u64,
    pub percent: f64,
    pub rate: f64,
    pub eta: Option<Duration>,
}

impl ProgressInfo {
    pub fn compute(total: u64, snapshot: StatsSnapshot) -> Self {
        let checked = snapshot.total_checked;
        let rate = snapshot.rate();

        let percent = if total > 0 {
            checked as f64 / total as f64 * 100.0
        } else {
            100.0
        };

        let remaining = total.saturating_sub(checked);
        let eta = if remaining == 0 {
            Some(Duration::ZERO)
        } else if rate > 0.0 {
            Some(Duration::from_secs_f64(remaining as f64 / rate))
        } else {
            None
        };

        Self {
            total,
            checked,
            invalid: snapshot.total_invalid,
            percent,
            rate,
            eta,
        }
    }
}

/// Progress is due on every full batch, or when the last line is older than
/// [`PROGRESS_INTERVAL`].
pub fn should_report(checked: u64, batch_size: usize, since_last: Duration) -> bool {
    let on_batch = batch_size > 0 && checked % batch_size as u64 == 0;
    on_batch || since_last > PROGRESS_INTERVAL
}
