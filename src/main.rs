//! headline-relay — binary entrypoint.
//! Loads config, wires the pipeline, and drives one producer until it is
//! exhausted or interrupted.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use headline_relay::config::RelayConfig;
use headline_relay::ingest::providers::{
    journal_tail::JournalTail, lines::LineProducer, text_dump::TextDumpProducer,
};
use headline_relay::ingest::run_producer;
use headline_relay::ingest::types::HeadlineProducer;
use headline_relay::telemetry::{init_tracing, install_metrics_exporter};
use headline_relay::Pipeline;

#[derive(Parser)]
#[command(name = "headline-relay", about = "Dedupe, journal and forward desk headlines")]
#[command(version)]
struct Cli {
    /// Path to config TOML file (default: $RELAY_CONFIG_PATH, then config/relay.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Source tag for events that carry none
    #[arg(long, global = true)]
    tag: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read `HH:MM:SS<TAB>text[<TAB>TAG]` lines from stdin
    Stdin {
        /// Treat input as untimestamped transcript fragments, merged after
        /// this many milliseconds of silence
        #[arg(long)]
        transcript_gap_ms: Option<u64>,
    },
    /// Follow a headlines CSV written by another monitor
    Tail {
        path: PathBuf,
        /// Replay rows already in the file instead of starting at the end
        #[arg(long)]
        from_start: bool,
    },
    /// Re-read a feed window text dump and extract headlines from it
    Dump { path: PathBuf },
}

fn load_config(cli: &Cli) -> Result<RelayConfig> {
    let mut cfg = match &cli.config {
        Some(p) => RelayConfig::load(p)?,
        None => RelayConfig::load_default()?,
    };
    if let Some(tag) = &cli.tag {
        cfg.default_source_tag = tag.clone();
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = load_config(&cli).context("loading relay config")?;

    if let Some(addr) = &cfg.metrics_addr {
        install_metrics_exporter(addr)?;
    }

    let tag = cfg.default_source_tag.clone();
    let mut producer: Box<dyn HeadlineProducer> = match &cli.command {
        Command::Stdin { transcript_gap_ms } => {
            let p = LineProducer::stdin(&tag);
            match transcript_gap_ms {
                Some(ms) => Box::new(p.transcript(Duration::from_millis(*ms))),
                None => Box::new(p),
            }
        }
        Command::Tail { path, from_start } => {
            if cfg.journal_enabled && same_file(path, &cfg.log_path) {
                anyhow::bail!(
                    "refusing to tail the relay's own journal {}; point log_path elsewhere",
                    path.display()
                );
            }
            let tail = if *from_start {
                JournalTail::from_start(path, &tag)
            } else {
                JournalTail::from_end(path, &tag)?
            };
            Box::new(tail.with_interval(cfg.poll_interval()))
        }
        Command::Dump { path } => {
            Box::new(TextDumpProducer::new(path, &tag).with_interval(cfg.poll_interval()))
        }
    };

    let mut pipeline = Pipeline::from_config(&cfg)?;
    run_producer(producer.as_mut(), &mut pipeline).await;
    pipeline.shutdown().context("closing journal")?;
    Ok(())
}

fn same_file(a: &std::path::Path, b: &std::path::Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}
