use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::config::{PARSE_FAILURE_LOG_EVERY, PARSE_FAILURE_LOG_FIRST};
use crate::error::Result;
use crate::types::QuoteSnapshot;

static PARSE_FAILURES: AtomicU64 = AtomicU64::new(0);

/// Decode one non-blank feed line: a JSON array of quote objects, instrument
/// A first:
/// `[{"stock":"ABC","top_ask":{...},"top_bid":{...},"timestamp":"..."}, {...}]`.
pub fn decode_line(raw: &str) -> Result<Vec<QuoteSnapshot>> {
    let quotes = serde_json::from_str::<Vec<QuoteSnapshot>>(raw.trim())?;
    Ok(quotes)
}

/// Parse one feed line into the quotes of a single tick.
///
/// Blank lines yield `None` silently; anything unparseable yields `None` and
/// is counted, with the first few failures and then every Nth one logged.
pub fn parse_feed_line(raw: &str) -> Option<Vec<QuoteSnapshot>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    match decode_line(trimmed) {
        Ok(quotes) => Some(quotes),
        Err(e) => {
            let count = PARSE_FAILURES.fetch_add(1, Ordering::Relaxed) + 1;
            if should_log(count) {
                let end = trimmed.char_indices().nth(200).map_or(trimmed.len(), |(i, _)| i);
                let sample = &trimmed[..end];
                warn!(count, error = %e, "[FEED PARSE] unrecognized line: {sample}");
            }
            None
        }
    }
}

/// Whether the `count`-th parse failure (1-based) gets a log line.
fn should_log(count: u64) -> bool {
    count <= PARSE_FAILURE_LOG_FIRST || count % PARSE_FAILURE_LOG_EVERY == 0
}

pub fn parse_failures() -> u64 {
    PARSE_FAILURES.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    const LINE: &str = r#"[{"stock":"ABC","top_ask":{"price":121.2,"size":36},"top_bid":{"price":120.48,"size":109},"timestamp":"2019-02-11 22:06:30.572453","id":"0.109974697771"},{"stock":"DEF","top_ask":{"price":121.68,"size":4},"top_bid":{"price":117.87,"size":81},"timestamp":"2019-02-11 22:06:30.572453","id":"0.109974697771"}]"#;

    #[test]
    fn parses_pair_line() {
        let quotes = parse_feed_line(LINE).expect("line should parse");
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].stock, "ABC");
        assert_eq!(quotes[1].stock, "DEF");
        assert!((quotes[1].top_bid.price - 117.87).abs() < 1e-9);
    }

    #[test]
    fn short_line_still_parses() {
        let raw = r#"[{"top_ask":{"price":1.0},"top_bid":{"price":1.0},"timestamp":"2019-02-11 22:06:30"}]"#;
        let quotes = parse_feed_line(raw).expect("single quote should parse");
        assert_eq!(quotes.len(), 1);
        assert!(quotes[0].stock.is_empty());
    }

    #[test]
    fn blank_line_is_skipped() {
        assert!(parse_feed_line("   ").is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_feed_line(r#"{"totally":"unrelated"}"#).is_none());
        assert!(parse_feed_line("not json").is_none());
    }

    #[test]
    fn decode_error_is_json_error() {
        let err = decode_line("not json").unwrap_err();
        assert!(matches!(err, AppError::Json(_)), "got {err:?}");
        assert!(decode_line(LINE).is_ok());
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let raw = r#"[{"top_ask":{"price":1.0},"top_bid":{"price":1.0},"timestamp":"soon"}]"#;
        assert!(parse_feed_line(raw).is_none());
        assert!(matches!(decode_line(raw), Err(AppError::Json(_))));
    }

    #[test]
    fn failure_logging_is_throttled() {
        assert!(should_log(1));
        assert!(should_log(10));
        assert!(!should_log(11));
        assert!(!should_log(999));
        assert!(should_log(1000));
        assert!(!should_log(1001));
        assert!(should_log(2000));
    }
}
