//! Line-chart view over the ratio table.
//!
//! The view configuration is fixed: one line per column in `columns`, rows
//! pivoted by distinct timestamp, numeric columns averaged. `pivot_by_timestamp`
//! reproduces that aggregation so hosts without a charting engine can still
//! read the series.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::types::AnalyticalRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Aggregate {
    #[serde(rename = "avg")]
    Avg,
    #[serde(rename = "distinct count")]
    DistinctCount,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewConfig {
    pub view: &'static str,
    pub row_pivots: &'static [&'static str],
    pub columns: &'static [&'static str],
    pub aggregates: &'static [(&'static str, Aggregate)],
}

pub static RATIO_VIEW: ViewConfig = ViewConfig {
    view: "y_line",
    row_pivots: &["timestamp"],
    columns: &["ratio", "lower_bound", "upper_bound", "alert_value"],
    aggregates: &[
        ("price_a", Aggregate::Avg),
        ("price_b", Aggregate::Avg),
        ("ratio", Aggregate::Avg),
        ("timestamp", Aggregate::DistinctCount),
        ("upper_bound", Aggregate::Avg),
        ("lower_bound", Aggregate::Avg),
        ("alert_value", Aggregate::Avg),
    ],
};

impl ViewConfig {
    pub fn aggregate_for(&self, column: &str) -> Option<Aggregate> {
        self.aggregates
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, agg)| *agg)
    }
}

/// One x-axis point of the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub timestamp: NaiveDateTime,
    pub ratio: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Average over the rows in this bucket that carry an alert.
    pub alert_value: Option<f64>,
    /// Rows folded into this point.
    pub row_count: usize,
}

#[derive(Default)]
struct Bucket {
    rows: usize,
    ratio: f64,
    lower: f64,
    upper: f64,
    alert_sum: f64,
    alerts: usize,
}

/// Group rows by distinct timestamp, ascending, and average each plotted
/// column. Empty alert cells are skipped by the average.
pub fn pivot_by_timestamp(rows: &[AnalyticalRecord]) -> Vec<ChartPoint> {
    let mut buckets: BTreeMap<NaiveDateTime, Bucket> = BTreeMap::new();
    for row in rows {
        let b = buckets.entry(row.timestamp).or_default();
        b.rows += 1;
        b.ratio += row.ratio;
        b.lower += row.lower_bound;
        b.upper += row.upper_bound;
        if let Some(alert) = row.alert_value {
            b.alert_sum += alert;
            b.alerts += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(timestamp, b)| {
            let n = b.rows as f64;
            ChartPoint {
                timestamp,
                ratio: b.ratio / n,
                lower_bound: b.lower / n,
                upper_bound: b.upper / n,
                alert_value: (b.alerts > 0).then(|| b.alert_sum / b.alerts as f64),
                row_count: b.rows,
            }
        })
        .collect()
}
