// src/ingest/providers/text_dump.rs
//! Re-reads a text dump of a feed window (rewritten in place by an external
//! UI dumper) and reports every headline-looking entry on each poll. The
//! pipeline's dedup window is what turns the repeated snapshots into
//! one-shot events.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::extract::extract_events;
use crate::ingest::types::{HeadlineProducer, ProducerPoll};

pub struct TextDumpProducer {
    path: PathBuf,
    source_tag: String,
    interval: Duration,
}

impl TextDumpProducer {
    pub fn new(path: impl AsRef<Path>, source_tag: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            source_tag: source_tag.to_string(),
            interval: Duration::from_secs(1),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub async fn snapshot(&self) -> Result<ProducerPoll> {
        let dump = match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "dump not written yet");
                return Ok(ProducerPoll::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading dump {}", self.path.display()))
            }
        };
        let events = extract_events(&dump, &self.source_tag);
        counter!("relay_producer_events_total", "producer" => "text_dump").increment(events.len() as u64);
        Ok(ProducerPoll::events(events))
    }
}

#[async_trait]
impl HeadlineProducer for TextDumpProducer {
    async fn poll(&mut self) -> Result<Option<ProducerPoll>> {
        self.snapshot().await.map(Some)
    }

    fn poll_interval(&self) -> Duration {
        self.interval
    }

    fn name(&self) -> &'static str {
        "text_dump"
    }
}
