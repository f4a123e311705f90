use crate::error::{AppError, Result};

/// Alert band around a ratio of 1.0. A ratio strictly outside
/// `[LOWER_BOUND, UPPER_BOUND]` raises an alert.
pub const BAND_WIDTH: f64 = 0.05;
pub const UPPER_BOUND: f64 = 1.0 + BAND_WIDTH;
pub const LOWER_BOUND: f64 = 1.0 - BAND_WIDTH;

/// Channel capacity between the feed reader and the sink consumer.
pub const CHANNEL_CAPACITY: usize = 1024;

/// How often the consumer logs throughput and latency stats (seconds).
pub const STATS_INTERVAL_SECS: u64 = 30;

/// Feed parse failures logged verbatim before switching to sampling.
pub const PARSE_FAILURE_LOG_FIRST: u64 = 10;

/// After the first few, only every Nth feed parse failure is logged.
pub const PARSE_FAILURE_LOG_EVERY: u64 = 1000;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Newline-delimited JSON frames to replay (FEED_PATH). Reads stdin when unset.
    pub feed_path: Option<String>,
    /// Pause between replayed frames in milliseconds (REPLAY_DELAY_MS).
    pub replay_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source. `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            feed_path: lookup("FEED_PATH")
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            replay_delay_ms: lookup("REPLAY_DELAY_MS")
                .unwrap_or_else(|| "0".to_string())
                .trim()
                .parse::<u64>()
                .map_err(|_| {
                    AppError::Config("REPLAY_DELAY_MS must be a non-negative integer".to_string())
                })?,
        })
    }
}
