use crate::config::{LOWER_BOUND, UPPER_BOUND};
use crate::error::Result;
use crate::types::{AnalyticalRecord, QuotePair, QuoteSnapshot};

/// Derive the analytical row for one tick.
///
/// Pure: the same pair always yields the same record. A zero midpoint on
/// instrument B is not guarded; the ratio becomes ±inf or NaN and flows into
/// the alert check unchanged. NaN compares false against both bounds, so it
/// never raises an alert.
pub fn derive(pair: &QuotePair) -> AnalyticalRecord {
    let price_a = pair.instrument_a.midpoint();
    let price_b = pair.instrument_b.midpoint();
    let ratio = price_a / price_b;

    let timestamp = if pair.instrument_a.timestamp > pair.instrument_b.timestamp {
        pair.instrument_a.timestamp
    } else {
        pair.instrument_b.timestamp
    };

    AnalyticalRecord {
        price_a,
        price_b,
        ratio,
        timestamp,
        upper_bound: UPPER_BOUND,
        lower_bound: LOWER_BOUND,
        alert_value: alert_value(ratio),
    }
}

/// Positional form: index 0 is instrument A, index 1 is instrument B.
/// Fails with `InvalidInput` when fewer than two snapshots are given.
pub fn derive_from_slice(snapshots: &[QuoteSnapshot]) -> Result<AnalyticalRecord> {
    let pair = QuotePair::try_from(snapshots)?;
    Ok(derive(&pair))
}

/// `Some(ratio)` iff the ratio is strictly outside the band.
#[inline]
fn alert_value(ratio: f64) -> Option<f64> {
    (ratio > UPPER_BOUND || ratio < LOWER_BOUND).then_some(ratio)
}
