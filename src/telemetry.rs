// src/telemetry.rs
use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "headline_relay=info,warn";

/// Compact logs by default; JSON lines when `RELAY_LOG_JSON=1`.
/// Safe to call more than once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var("RELAY_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    // stdout carries headlines from the console sink; logs go to stderr.
    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing already initialized");
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relay_events_total", "Events handed to the pipeline.");
        describe_counter!("relay_noise_total", "Events dropped as empty or bare timestamps.");
        describe_counter!("relay_malformed_total", "Events dropped for a malformed timestamp.");
        describe_counter!("relay_duplicate_total", "Events suppressed by the dedup window.");
        describe_counter!("relay_dispatched_total", "Events accepted and dispatched.");
        describe_counter!("relay_journal_errors_total", "Failed journal appends.");
        describe_counter!("relay_sink_errors_total", "Failed sink deliveries.");
        describe_counter!("relay_dedup_resets_total", "Dedup window clears after rotation.");
        describe_counter!("relay_journal_rotations_total", "Journal truncations seen by the tail.");
        describe_counter!("relay_producer_events_total", "Raw events read, per producer.");
        describe_counter!("relay_producer_errors_total", "Producer poll errors.");
        describe_gauge!("relay_dedup_window_size", "Texts currently held by the dedup window.");
    });
}

/// Install the Prometheus recorder with its own HTTP listener. Must run
/// inside the tokio runtime.
pub fn install_metrics_exporter(addr: &str) -> Result<()> {
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("invalid metrics_addr {addr:?}"))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;
    ensure_metrics_described();
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}
