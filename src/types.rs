use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

/// One side of the top of book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    #[serde(default)]
    pub size: f64,
}

/// Best ask / best bid for one instrument at a point in time.
///
/// Field names follow the upstream feed (`top_ask`, `top_bid`, `stock`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    #[serde(default)]
    pub stock: String,
    pub top_ask: PriceLevel,
    pub top_bid: PriceLevel,
    #[serde(with = "feed_timestamp")]
    pub timestamp: NaiveDateTime,
}

impl QuoteSnapshot {
    pub fn new(stock: &str, ask: f64, bid: f64, timestamp: NaiveDateTime) -> Self {
        Self {
            stock: stock.to_string(),
            top_ask: PriceLevel { price: ask, size: 0.0 },
            top_bid: PriceLevel { price: bid, size: 0.0 },
            timestamp,
        }
    }

    /// Average of best ask and best bid.
    #[inline]
    pub fn midpoint(&self) -> f64 {
        (self.top_ask.price + self.top_bid.price) / 2.0
    }
}

/// The two tracked instruments for one update tick.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotePair {
    pub instrument_a: QuoteSnapshot,
    pub instrument_b: QuoteSnapshot,
}

impl QuotePair {
    pub fn new(instrument_a: QuoteSnapshot, instrument_b: QuoteSnapshot) -> Self {
        Self { instrument_a, instrument_b }
    }
}

/// Positional form used by the feed: index 0 is instrument A, index 1 is
/// instrument B. Anything past the second element is ignored.
impl<'a> TryFrom<&'a [QuoteSnapshot]> for QuotePair {
    type Error = AppError;

    fn try_from(snapshots: &'a [QuoteSnapshot]) -> Result<Self> {
        match snapshots {
            [a, b, ..] => Ok(Self::new(a.clone(), b.clone())),
            _ => Err(AppError::InvalidInput(format!(
                "expected 2 quote snapshots, got {}",
                snapshots.len()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Derived row
// ---------------------------------------------------------------------------

/// One derived row of the analytical table. Serialized field names are the
/// table's column names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticalRecord {
    pub price_a: f64,
    pub price_b: f64,
    pub ratio: f64,
    #[serde(with = "feed_timestamp")]
    pub timestamp: NaiveDateTime,
    pub upper_bound: f64,
    pub lower_bound: f64,
    /// Equal to `ratio` when it leaves the alert band.
    pub alert_value: Option<f64>,
}

impl AnalyticalRecord {
    pub fn is_alert(&self) -> bool {
        self.alert_value.is_some()
    }
}

// ---------------------------------------------------------------------------
// Timestamp wire format
// ---------------------------------------------------------------------------

/// `YYYY-MM-DD HH:MM:SS[.fraction]`, as the feed writes it. The ISO `T`
/// separator is accepted on input.
pub mod feed_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
    const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn parse(s: &str) -> Option<NaiveDateTime> {
        let s = s.trim();
        NaiveDateTime::parse_from_str(s, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(s, ISO_FORMAT))
            .ok()
    }

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        feed_timestamp::parse(s).unwrap()
    }

    #[test]
    fn midpoint_averages_ask_and_bid() {
        let q = QuoteSnapshot::new("ABC", 121.2, 120.48, ts("2019-02-11 22:06:30.572453"));
        assert!((q.midpoint() - 120.84).abs() < 1e-9);
    }

    #[test]
    fn pair_from_short_slice_is_invalid_input() {
        let one = vec![QuoteSnapshot::new("ABC", 1.0, 1.0, ts("2019-02-11 22:06:30"))];
        let err = QuotePair::try_from(one.as_slice()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)), "got {err:?}");

        let none: Vec<QuoteSnapshot> = Vec::new();
        assert!(QuotePair::try_from(none.as_slice()).is_err());
    }

    #[test]
    fn pair_from_slice_keeps_position() {
        let t = ts("2019-02-11 22:06:30");
        let snaps = vec![
            QuoteSnapshot::new("ABC", 1.0, 1.0, t),
            QuoteSnapshot::new("DEF", 2.0, 2.0, t),
            QuoteSnapshot::new("GHI", 3.0, 3.0, t),
        ];
        let pair = QuotePair::try_from(snaps.as_slice()).unwrap();
        assert_eq!(pair.instrument_a.stock, "ABC");
        assert_eq!(pair.instrument_b.stock, "DEF");
    }

    #[test]
    fn snapshot_deserializes_feed_shape() {
        let raw = r#"{"stock":"ABC","top_ask":{"price":121.2,"size":36},"top_bid":{"price":120.48,"size":109},"timestamp":"2019-02-11 22:06:30.572453"}"#;
        let q: QuoteSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(q.stock, "ABC");
        assert!((q.top_ask.price - 121.2).abs() < 1e-9);
        assert!((q.top_bid.size - 109.0).abs() < 1e-9);
        assert_eq!(q.timestamp, ts("2019-02-11 22:06:30.572453"));
    }

    #[test]
    fn timestamp_accepts_iso_separator() {
        assert_eq!(ts("2019-02-11T22:06:30.5"), ts("2019-02-11 22:06:30.5"));
        assert!(feed_timestamp::parse("yesterday").is_none());
    }
}
