use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use ratio_monitor::config::{Config, CHANNEL_CAPACITY, STATS_INTERVAL_SECS};
use ratio_monitor::error::Result;
use ratio_monitor::feed::{parse_failures, parse_feed_line};
use ratio_monitor::latency::LatencyStats;
use ratio_monitor::sink::{LiveTableSink, MemoryHost, MemoryTable, TableHost};
use ratio_monitor::types::QuoteSnapshot;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let host = MemoryHost::new();
    let table = host.table();

    let (frame_tx, frame_rx) = mpsc::channel(CHANNEL_CAPACITY);

    // Renderer stand-in: reacts to every table update.
    let observer = tokio::spawn(observe_table(table.clone()));

    // Single consumer owns the sink, so appends are serialized.
    let consumer = tokio::spawn(sink_consumer(host, frame_rx));

    let frames = read_feed(&cfg, frame_tx).await?;
    let appended = consumer.await??;
    observer.abort();

    let chart = table.chart();
    let alerts = table.rows().iter().filter(|r| r.is_alert()).count();
    info!(
        event = "FEED_DONE",
        frames,
        rows = appended,
        alerts,
        chart_points = chart.len(),
        parse_failures = parse_failures(),
        "Feed finished: {frames} frames | {appended} rows | {alerts} alerts | {} chart points",
        chart.len(),
    );
    if let Some(last) = chart.last() {
        info!(
            "Last point {} | ratio={:.4} band=[{:.2}, {:.2}]",
            last.timestamp, last.ratio, last.lower_bound, last.upper_bound,
        );
    }

    Ok(())
}

/// Reads newline-delimited frames from FEED_PATH or stdin and forwards each
/// parsed tick to the sink consumer. Returns the number of frames forwarded.
async fn read_feed(cfg: &Config, tx: mpsc::Sender<Vec<QuoteSnapshot>>) -> Result<u64> {
    let input: Box<dyn AsyncRead + Unpin + Send> = match &cfg.feed_path {
        Some(path) => {
            info!("Replaying feed from {path}");
            Box::new(tokio::fs::File::open(path).await?)
        }
        None => {
            info!("Reading feed from stdin");
            Box::new(tokio::io::stdin())
        }
    };

    let mut lines = BufReader::new(input).lines();
    let mut frames = 0u64;
    while let Some(line) = lines.next_line().await? {
        let Some(quotes) = parse_feed_line(&line) else {
            continue;
        };
        frames += 1;
        if tx.send(quotes).await.is_err() {
            warn!("sink consumer stopped, no longer reading feed");
            break;
        }
        if cfg.replay_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(cfg.replay_delay_ms)).await;
        }
    }
    Ok(frames)
}

/// Owns the sink: initializes it, then derives and appends one row per frame.
/// A frame with fewer than two quotes ends the run with `InvalidInput`.
async fn sink_consumer(host: MemoryHost, mut rx: mpsc::Receiver<Vec<QuoteSnapshot>>) -> Result<u64> {
    let mut sink = LiveTableSink::new(host);
    let latency = LatencyStats::new();
    sink.on_ready();

    let mut stats_interval = tokio::time::interval(Duration::from_secs(STATS_INTERVAL_SECS));
    stats_interval.tick().await; // consume immediate first tick

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let Some(quotes) = msg else { break };
                let started = Instant::now();
                sink.on_new_snapshots(&quotes)?;
                latency.record(started.elapsed());
            }
            _ = stats_interval.tick() => {
                log_stats(&sink, &latency);
            }
        }
    }

    log_stats(&sink, &latency);
    Ok(sink.rows_appended())
}

fn log_stats<H: TableHost>(sink: &LiveTableSink<H>, latency: &LatencyStats) {
    let l = latency.summary().unwrap_or_default();
    info!(
        event = "SINK_STATS",
        appended = sink.rows_appended(),
        dropped = sink.rows_dropped(),
        p50_ns = l.p50_ns,
        p99_ns = l.p99_ns,
        max_ns = l.max_ns,
        "[SINK] appended={} dropped={} | derive+append p50={}ns p99={}ns max={}ns",
        sink.rows_appended(),
        sink.rows_dropped(),
        l.p50_ns,
        l.p99_ns,
        l.max_ns,
    );
}

async fn observe_table(table: MemoryTable) {
    let mut rx = table.subscribe();
    while rx.changed().await.is_ok() {
        let version = *rx.borrow_and_update();
        if let Some(row) = table.last_row() {
            debug!(
                version,
                ratio = row.ratio,
                alert = row.alert_value.is_some(),
                "[VIEW] redraw | {} | ratio={:.4}",
                row.timestamp,
                row.ratio,
            );
        }
    }
}
