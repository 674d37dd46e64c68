// src/ingest/types.rs
use anyhow::Result;
use chrono::NaiveDateTime;
use std::time::Duration;

use crate::ingest::timestamp::format_timestamp;

/// Raw tuple handed over by a producer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct HeadlineEvent {
    pub raw_timestamp: String, // "HH:MM:SS", no date
    pub text: String,
    pub source_tag: String, // e.g. "RTRS", "FLY", "SQUAWK"
}

impl HeadlineEvent {
    pub fn new(
        raw_timestamp: impl Into<String>,
        text: impl Into<String>,
        source_tag: impl Into<String>,
    ) -> Self {
        Self {
            raw_timestamp: raw_timestamp.into(),
            text: text.into(),
            source_tag: source_tag.into(),
        }
    }
}

/// An accepted event with its date attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub full_timestamp: NaiveDateTime,
    pub text: String,
    pub source_tag: String,
}

impl NormalizedEvent {
    /// `YYYY-MM-DD HH:MM:SS`
    pub fn timestamp_str(&self) -> String {
        format_timestamp(&self.full_timestamp)
    }
}

/// What one producer poll yielded.
#[derive(Debug, Default)]
pub struct ProducerPoll {
    pub events: Vec<HeadlineEvent>,
    /// The backing source was rotated or truncated; dedup state is stale.
    pub reset: bool,
}

impl ProducerPoll {
    pub fn events(events: Vec<HeadlineEvent>) -> Self {
        Self {
            events,
            reset: false,
        }
    }
}

#[async_trait::async_trait]
pub trait HeadlineProducer: Send {
    /// `Ok(None)` means the producer is exhausted.
    async fn poll(&mut self) -> Result<Option<ProducerPoll>>;

    /// Pause between polls. Zero for producers whose `poll` already waits.
    fn poll_interval(&self) -> Duration {
        Duration::ZERO
    }

    fn name(&self) -> &'static str;
}
