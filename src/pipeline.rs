// src/pipeline.rs
//! Headline dedup & dispatch: noise filter -> timestamp normalization ->
//! dedup window -> journal -> sinks. One pipeline per producer; it owns
//! its window and journal handle exclusively.

use chrono::NaiveDateTime;
use metrics::{counter, gauge};
use tracing::{debug, info, trace, warn};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::ingest::dedup::DedupWindow;
use crate::ingest::timestamp::normalize;
use crate::ingest::types::{HeadlineEvent, NormalizedEvent};
use crate::ingest::{is_time_of_day, normalize_text};
use crate::journal::{recent_texts, Journal};
use crate::notify::console::ConsoleSink;
use crate::notify::discord::DiscordSink;
use crate::notify::quota::{QuotaSink, UsageTracker};
use crate::notify::{render, ColorMap, Sink};
use crate::telemetry::ensure_metrics_described;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub event: NormalizedEvent,
    /// False when the journal append failed (or no journal is configured).
    pub journaled: bool,
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    Dispatched(DispatchReport),
    /// Seen before; expected on every UI refresh.
    Duplicate,
    /// Empty text or a bare `HH:MM:SS` cell.
    Noise,
    /// Timestamp could not be parsed; carries the raw value.
    Malformed(String),
}

impl DispatchResult {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, DispatchResult::Dispatched(_))
    }
}

pub struct PipelineBuilder {
    capacity: usize,
    journal: Option<Journal>,
    sinks: Vec<Box<dyn Sink>>,
    colors: ColorMap,
    seed: Vec<String>,
}

impl PipelineBuilder {
    pub fn journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn colors(mut self, colors: ColorMap) -> Self {
        self.colors = colors;
        self
    }

    /// Texts considered already seen (oldest first).
    pub fn seed(mut self, texts: Vec<String>) -> Self {
        self.seed = texts;
        self
    }

    pub fn build(self) -> Pipeline {
        ensure_metrics_described();
        let mut dedup = DedupWindow::new(self.capacity);
        let seeded = dedup.seed(&self.seed);
        if seeded > 0 {
            info!(seeded, "dedup window warmed from journal");
        }
        Pipeline {
            dedup,
            journal: self.journal,
            sinks: self.sinks,
            colors: self.colors,
        }
    }
}

pub struct Pipeline {
    dedup: DedupWindow,
    journal: Option<Journal>,
    sinks: Vec<Box<dyn Sink>>,
    colors: ColorMap,
}

impl Pipeline {
    pub fn builder(capacity: usize) -> PipelineBuilder {
        PipelineBuilder {
            capacity,
            journal: None,
            sinks: Vec::new(),
            colors: ColorMap::default(),
            seed: Vec::new(),
        }
    }

    /// Journal, console and Discord sinks as configured.
    pub fn from_config(cfg: &RelayConfig) -> anyhow::Result<Self> {
        let mut b = Pipeline::builder(cfg.cache_size).colors(cfg.color_map());

        if cfg.journal_enabled {
            if cfg.seed_from_journal {
                b = b.seed(recent_texts(&cfg.log_path, cfg.cache_size)?);
            }
            b = b.journal(Journal::open(&cfg.log_path)?);
        }

        if cfg.console.enabled {
            b = b.sink(Box::new(ConsoleSink::new(cfg.console.style)));
        }

        if let Some(d) = &cfg.discord {
            let sink = match (&d.webhook_url, &d.channel_id, &d.bot_token) {
                (Some(url), _, _) => DiscordSink::webhook(url.clone()),
                (None, Some(id), Some(token)) => DiscordSink::channel(id.clone(), token.clone()),
                _ => {
                    return Err(RelayError::Config(
                        "discord sink needs webhook_url or channel_id + bot_token".into(),
                    )
                    .into())
                }
            }
            .with_timeout(d.timeout_secs)
            .with_style(d.style);

            b = match &d.quota {
                Some(q) => {
                    let tracker = match &q.usage_file {
                        Some(p) => UsageTracker::load(p, q.max_posts, q.window_secs),
                        None => UsageTracker::in_memory(q.max_posts, q.window_secs),
                    };
                    b.sink(Box::new(QuotaSink::new(sink, tracker)))
                }
                None => b.sink(Box::new(sink)),
            };
        }

        let p = b.build();
        info!(
            capacity = p.dedup.capacity(),
            journal = ?p.journal.as_ref().map(|j| j.path().display().to_string()),
            sinks = ?p.sink_names(),
            "pipeline ready"
        );
        Ok(p)
    }

    pub async fn process(&mut self, event: HeadlineEvent) -> DispatchResult {
        let now = chrono::Local::now().naive_local();
        self.process_at(event, now).await
    }

    pub async fn process_at(&mut self, event: HeadlineEvent, now: NaiveDateTime) -> DispatchResult {
        counter!("relay_events_total").increment(1);

        let text = normalize_text(&event.text);
        if text.is_empty() || is_time_of_day(&text) {
            counter!("relay_noise_total").increment(1);
            trace!(raw = %event.text, "noise dropped");
            return DispatchResult::Noise;
        }

        let full_timestamp = match normalize(&event.raw_timestamp, now) {
            Ok(ts) => ts,
            Err(e) => {
                counter!("relay_malformed_total").increment(1);
                warn!(error = %e, source = %event.source_tag, "dropping event");
                return DispatchResult::Malformed(event.raw_timestamp);
            }
        };

        if !self.dedup.accept(&text) {
            counter!("relay_duplicate_total").increment(1);
            trace!(source = %event.source_tag, "duplicate suppressed");
            return DispatchResult::Duplicate;
        }
        gauge!("relay_dedup_window_size").set(self.dedup.len() as f64);

        let ev = NormalizedEvent {
            full_timestamp,
            text,
            source_tag: event.source_tag,
        };

        let journaled = match self.journal.as_mut() {
            Some(j) => match j.append(&ev) {
                Ok(()) => true,
                Err(e) => {
                    counter!("relay_journal_errors_total").increment(1);
                    warn!(error = %e, "journal append failed; dispatching anyway");
                    false
                }
            },
            None => false,
        };

        let (mut delivered, mut failed) = (0usize, 0usize);
        for sink in &self.sinks {
            let msg = render(&ev, sink.style(), &self.colors);
            match sink.send(&msg).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    counter!("relay_sink_errors_total", "sink" => sink.name().to_string())
                        .increment(1);
                    warn!(sink = sink.name(), error = %format!("{e:#}"), "sink dispatch failed");
                }
            }
        }

        counter!("relay_dispatched_total").increment(1);
        debug!(
            ts = %ev.timestamp_str(),
            source = %ev.source_tag,
            delivered,
            failed,
            "headline dispatched"
        );

        DispatchResult::Dispatched(DispatchReport {
            event: ev,
            journaled,
            delivered,
            failed,
        })
    }

    /// Forget every seen text, e.g. after the journal was rotated.
    pub fn reset_dedup(&mut self) {
        info!(dropped = self.dedup.len(), "dedup window cleared");
        self.dedup.clear();
        counter!("relay_dedup_resets_total").increment(1);
        gauge!("relay_dedup_window_size").set(0.0);
    }

    pub fn dedup(&self) -> &DedupWindow {
        &self.dedup
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.iter().map(|s| s.name().to_string()).collect()
    }

    /// Flush and close the journal.
    pub fn shutdown(mut self) -> Result<()> {
        if let Some(mut j) = self.journal.take() {
            j.flush()?;
            info!(path = %j.path().display(), "journal closed");
        }
        Ok(())
    }
}
