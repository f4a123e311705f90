//! Time spent turning one quote frame into an appended row.
//!
//! Derive+append is pure arithmetic plus one vector push, so samples are
//! kept in nanoseconds; anything past `MAX_TRACKED_NS` is clamped.

use std::sync::Mutex;
use std::time::Duration;

use hdrhistogram::Histogram;

/// Upper end of the tracked range: one second.
const MAX_TRACKED_NS: u64 = 1_000_000_000;

/// Percentile summary in nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendLatency {
    pub p50_ns: u64,
    pub p99_ns: u64,
    pub max_ns: u64,
    pub samples: u64,
}

pub struct LatencyStats {
    inner: Mutex<Histogram<u64>>,
}

impl LatencyStats {
    pub fn new() -> Self {
        let histogram = Histogram::new_with_bounds(1, MAX_TRACKED_NS, 2)
            .expect("1ns..1s at 2 significant figures is a valid range");
        Self {
            inner: Mutex::new(histogram),
        }
    }

    /// Record one frame's derive+append time.
    pub fn record(&self, elapsed: Duration) {
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        if let Ok(mut h) = self.inner.lock() {
            h.saturating_record(ns.clamp(1, MAX_TRACKED_NS));
        }
    }

    /// `None` until the first frame is recorded.
    pub fn summary(&self) -> Option<AppendLatency> {
        let h = self.inner.lock().ok()?;
        if h.is_empty() {
            return None;
        }
        Some(AppendLatency {
            p50_ns: h.value_at_quantile(0.5),
            p99_ns: h.value_at_quantile(0.99),
            max_ns: h.max(),
            samples: h.len(),
        })
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}
