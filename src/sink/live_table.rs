use tracing::{debug, info, warn};

use crate::deriver::derive;
use crate::error::Result;
use crate::schema::{Schema, ANALYTICAL_SCHEMA};
use crate::types::{AnalyticalRecord, QuotePair, QuoteSnapshot};
use crate::view::{ViewConfig, RATIO_VIEW};

/// Append-only table observed by a renderer. `update` adds rows and never
/// touches existing ones.
pub trait LiveTable {
    fn update(&mut self, rows: &[AnalyticalRecord]);
}

/// The surface a sink draws into. Injected at construction.
pub trait TableHost {
    type Table: LiveTable;

    /// Build a table for `schema`. `None` when the host cannot build tables yet.
    fn create_table(&self, schema: &'static Schema) -> Option<Self::Table>;

    /// Attach `table` to the surface with the given view configuration.
    fn load(&self, table: &Self::Table, view: &'static ViewConfig);
}

/// Derives one row per quote pair and appends it to the host's table.
///
/// Starts uninitialized. `on_ready` acquires the table once; until then every
/// append is dropped without error. There is no way back to uninitialized.
pub struct LiveTableSink<H: TableHost> {
    host: H,
    table: Option<H::Table>,
    rows_appended: u64,
    rows_dropped: u64,
}

impl<H: TableHost> LiveTableSink<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            table: None,
            rows_appended: 0,
            rows_dropped: 0,
        }
    }

    /// Acquire the table if not yet done. Returns whether the sink is live.
    ///
    /// When the host cannot build a table the sink stays uninitialized; a later
    /// call may try again.
    pub fn on_ready(&mut self) -> bool {
        if self.table.is_some() {
            return true;
        }

        let Some(table) = self.host.create_table(&ANALYTICAL_SCHEMA) else {
            warn!(
                event = "SINK_UNAVAILABLE",
                "table host unavailable, sink stays uninitialized and drops appends"
            );
            return false;
        };

        self.host.load(&table, &RATIO_VIEW);
        self.table = Some(table);
        info!(
            event = "SINK_READY",
            view = RATIO_VIEW.view,
            columns = ANALYTICAL_SCHEMA.columns.len(),
            "sink initialized"
        );
        true
    }

    /// Derive and append one row. A silent no-op while uninitialized.
    pub fn on_new_data(&mut self, pair: &QuotePair) {
        let Some(table) = self.table.as_mut() else {
            self.rows_dropped += 1;
            debug!(dropped = self.rows_dropped, "sink not ready, dropping quote pair");
            return;
        };

        let row = derive(pair);
        log_row(&row);
        table.update(std::slice::from_ref(&row));
        self.rows_appended += 1;
    }

    /// Positional form as delivered by the feed: index 0 is instrument A,
    /// index 1 is instrument B.
    ///
    /// While uninitialized the input is dropped before it is validated, so a
    /// short slice only fails once the sink is live.
    pub fn on_new_snapshots(&mut self, snapshots: &[QuoteSnapshot]) -> Result<()> {
        if self.table.is_none() {
            self.rows_dropped += 1;
            debug!(dropped = self.rows_dropped, "sink not ready, dropping snapshots");
            return Ok(());
        }
        let pair = QuotePair::try_from(snapshots)?;
        self.on_new_data(&pair);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.table.is_some()
    }

    pub fn rows_appended(&self) -> u64 {
        self.rows_appended
    }

    pub fn rows_dropped(&self) -> u64 {
        self.rows_dropped
    }

    #[cfg(test)]
    pub(crate) fn host(&self) -> &H {
        &self.host
    }
}

fn log_row(row: &AnalyticalRecord) {
    if let Some(alert) = row.alert_value {
        warn!(
            event = "RATIO_ALERT",
            ratio = alert,
            price_a = row.price_a,
            price_b = row.price_b,
            timestamp = %row.timestamp,
            "ratio {alert:.4} outside [{:.2}, {:.2}]",
            row.lower_bound,
            row.upper_bound,
        );
    } else {
        debug!(
            ratio = row.ratio,
            timestamp = %row.timestamp,
            "ratio {:.4} | a={:.4} b={:.4}",
            row.ratio,
            row.price_a,
            row.price_b,
        );
    }
}
