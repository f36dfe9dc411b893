use std::time::{Duration, Instant};

use log::info;

//------------ Progress ------------------------------------------------------

/// Periodic progress reporting for long ingestion runs. Without an
/// expected total only the row count and elapsed time are logged.
#[derive(Debug)]
pub struct Progress {
    start: Instant,
    interval: u64,
    expected_total: Option<u64>,
    next_report: u64,
}

/// A snapshot of the progress at some row count.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Estimate {
    pub rows: u64,
    pub percent: Option<f64>,
    pub elapsed: Duration,
    pub remaining: Option<Duration>,
    pub total: Option<Duration>,
}

impl Progress {
    pub fn new(interval: u64, expected_total: Option<u64>) -> Self {
        Self {
            start: Instant::now(),
            interval: interval.max(1),
            expected_total,
            next_report: 0,
        }
    }

    /// Log the progress if `rows` crossed the next reporting point.
    pub fn update(&mut self, rows: u64) {
        if rows < self.next_report {
            return;
        }
        self.next_report = (rows / self.interval + 1) * self.interval;

        let est = self.estimate(rows, self.start.elapsed());
        match (est.percent, est.remaining, est.total) {
            (Some(percent), Some(remaining), Some(total)) => info!(
                "progress: {}/{} [{:.2}%] elapsed {:?}, remaining {:?}, \
                total {:?}",
                rows,
                self.expected_total.unwrap_or_default(),
                percent,
                est.elapsed,
                remaining,
                total
            ),
            _ => info!("progress: {} rows, elapsed {:?}", rows, est.elapsed),
        }
    }

    /// Extrapolate the remaining and total time from `rows` processed in
    /// `elapsed`. Durations are truncated to whole seconds.
    pub fn estimate(&self, rows: u64, elapsed: Duration) -> Estimate {
        let elapsed_secs = Duration::from_secs(elapsed.as_secs());
        let mut est = Estimate {
            rows,
            percent: None,
            elapsed: elapsed_secs,
            remaining: None,
            total: None,
        };
        let Some(expected) = self.expected_total.filter(|t| *t > 0) else {
            return est;
        };
        est.percent = Some(100.0 * rows as f64 / expected as f64);
        if rows > 0 {
            let total = elapsed.as_secs_f64() * expected as f64 / rows as f64;
            let remaining = (total - elapsed.as_secs_f64()).max(0.0);
            est.total = Some(Duration::from_secs(total as u64));
            est.remaining = Some(Duration::from_secs(remaining as u64));
        }
        est
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
