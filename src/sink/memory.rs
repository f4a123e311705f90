use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use tokio::sync::watch;

use crate::schema::Schema;
use crate::sink::live_table::{LiveTable, TableHost};
use crate::types::AnalyticalRecord;
use crate::view::{pivot_by_timestamp, ChartPoint, ViewConfig};

// ---------------------------------------------------------------------------
// MemoryTable
// ---------------------------------------------------------------------------

/// In-process append-only table. Cloning yields another handle to the same
/// rows. Every update bumps a version observers can `subscribe` to.
#[derive(Clone)]
pub struct MemoryTable {
    inner: Arc<MemoryTableInner>,
}

struct MemoryTableInner {
    schema: OnceLock<&'static Schema>,
    rows: RwLock<Vec<AnalyticalRecord>>,
    version: watch::Sender<u64>,
}

impl MemoryTable {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            inner: Arc::new(MemoryTableInner {
                schema: OnceLock::new(),
                rows: RwLock::new(Vec::new()),
                version,
            }),
        }
    }

    /// Receiver that changes once per update batch.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.version.subscribe()
    }

    pub fn version(&self) -> u64 {
        *self.inner.version.borrow()
    }

    pub fn schema(&self) -> Option<&'static Schema> {
        self.inner.schema.get().copied()
    }

    pub fn len(&self) -> usize {
        self.inner.rows.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of all rows in insertion order.
    pub fn rows(&self) -> Vec<AnalyticalRecord> {
        self.inner.rows.read().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn last_row(&self) -> Option<AnalyticalRecord> {
        self.inner.rows.read().ok()?.last().cloned()
    }

    /// Current chart series, pivoted the way the line view draws it.
    pub fn chart(&self) -> Vec<ChartPoint> {
        match self.inner.rows.read() {
            Ok(rows) => pivot_by_timestamp(&rows),
            Err(_) => Vec::new(),
        }
    }
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveTable for MemoryTable {
    fn update(&mut self, rows: &[AnalyticalRecord]) {
        if rows.is_empty() {
            return;
        }
        {
            let mut table = self.inner.rows.write().unwrap_or_else(|e| e.into_inner());
            table.extend_from_slice(rows);
        }
        self.inner.version.send_modify(|v| *v += 1);
    }
}

// ---------------------------------------------------------------------------
// MemoryHost
// ---------------------------------------------------------------------------

/// Table host backed by a single `MemoryTable`. Table construction can be
/// disabled to model a surface that is not ready yet.
pub struct MemoryHost {
    table: MemoryTable,
    available: AtomicBool,
    view: OnceLock<&'static ViewConfig>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            table: MemoryTable::new(),
            available: AtomicBool::new(true),
            view: OnceLock::new(),
        }
    }

    pub fn unavailable() -> Self {
        let host = Self::new();
        host.set_available(false);
        host
    }

    pub fn set_available(&self, v: bool) {
        self.available.store(v, Ordering::Relaxed);
    }

    /// Handle to the table this host hands out. Usable by observers before
    /// the sink is initialized; it stays empty until then.
    pub fn table(&self) -> MemoryTable {
        self.table.clone()
    }

    /// View configuration the table was loaded with, once loaded.
    pub fn view(&self) -> Option<&'static ViewConfig> {
        self.view.get().copied()
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl TableHost for MemoryHost {
    type Table = MemoryTable;

    fn create_table(&self, schema: &'static Schema) -> Option<MemoryTable> {
        if !self.available.load(Ordering::Relaxed) {
            return None;
        }
        let _ = self.table.inner.schema.set(schema);
        Some(self.table.clone())
    }

    fn load(&self, _table: &MemoryTable, view: &'static ViewConfig) {
        let _ = self.view.set(view);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deriver::derive;
    use crate::schema::ANALYTICAL_SCHEMA;
    use crate::sink::live_table::LiveTableSink;
    use crate::types::{feed_timestamp, QuotePair, QuoteSnapshot};
    use std::time::Duration;

    fn pair(a: f64, b: f64, ts: &str) -> QuotePair {
        let t = feed_timestamp::parse(ts).unwrap();
        QuotePair::new(
            QuoteSnapshot::new("ABC", a, a, t),
            QuoteSnapshot::new("DEF", b, b, t),
        )
    }

    #[test]
    fn uninitialized_sink_adds_no_rows() {
        let host = MemoryHost::unavailable();
        let table = host.table();
        let mut sink = LiveTableSink::new(host);

        assert!(!sink.on_ready());
        sink.on_new_data(&pair(110.0, 100.0, "2019-02-11 22:06:30"));

        assert!(table.is_empty());
        assert_eq!(table.version(), 0);
        assert!(table.schema().is_none());
    }

    #[test]
    fn n_appends_yield_n_rows_in_order() {
        let host = MemoryHost::new();
        let table = host.table();
        let mut sink = LiveTableSink::new(host);
        assert!(sink.on_ready());
        assert_eq!(sink.host().view().map(|v| v.view), Some("y_line"));
        assert_eq!(table.schema(), Some(&ANALYTICAL_SCHEMA));

        let inputs: Vec<QuotePair> = (0..10)
            .map(|i| pair(95.0 + i as f64, 100.0, &format!("2019-02-11 22:06:{:02}", 30 + i)))
            .collect();

        let mut seen = Vec::new();
        for p in &inputs {
            sink.on_new_data(p);
            seen.push(table.last_row().unwrap());
        }

        let rows = table.rows();
        assert_eq!(rows.len(), inputs.len());
        assert_eq!(table.version(), inputs.len() as u64);
        // Earlier rows are unchanged by later appends.
        assert_eq!(rows, seen);
        for (row, p) in rows.iter().zip(&inputs) {
            assert_eq!(*row, derive(p));
        }
    }

    #[test]
    fn chart_reflects_appended_rows() {
        let host = MemoryHost::new();
        let table = host.table();
        let mut sink = LiveTableSink::new(host);
        sink.on_ready();

        sink.on_new_data(&pair(110.0, 100.0, "2019-02-11 22:06:30"));
        sink.on_new_data(&pair(100.0, 100.0, "2019-02-11 22:06:30"));

        let chart = table.chart();
        assert_eq!(chart.len(), 1);
        assert_eq!(chart[0].row_count, 2);
        assert!((chart[0].alert_value.unwrap() - 1.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn subscriber_sees_each_update() {
        let host = MemoryHost::new();
        let table = host.table();
        let mut rx = table.subscribe();
        let mut sink = LiveTableSink::new(host);
        sink.on_ready();

        sink.on_new_data(&pair(100.0, 100.0, "2019-02-11 22:06:30"));
        tokio::time::timeout(Duration::from_secs(1), rx.changed())
            .await
            .expect("update not observed")
            .expect("table dropped");
        assert_eq!(*rx.borrow_and_update(), 1);

        sink.on_new_data(&pair(100.0, 100.0, "2019-02-11 22:06:31"));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 2);
        assert_eq!(table.len(), 2);
    }
}
