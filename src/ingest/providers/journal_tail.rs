// src/ingest/providers/journal_tail.rs
//! Follows a headlines CSV written by other monitors and re-emits its new
//! rows. Detects truncation/rotation by the file shrinking below the read
//! offset.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::timestamp::time_of_day;
use crate::ingest::types::{HeadlineEvent, HeadlineProducer, ProducerPoll};
use crate::journal::parse_records;

pub struct JournalTail {
    path: PathBuf,
    offset: u64,
    carry: Vec<u8>,
    default_tag: String,
    interval: Duration,
}

impl JournalTail {
    /// Replay the whole file, then follow.
    pub fn from_start(path: impl AsRef<Path>, default_tag: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            offset: 0,
            carry: Vec::new(),
            default_tag: default_tag.to_string(),
            interval: Duration::from_millis(500),
        }
    }

    /// Skip what is already there, like `tail -f`.
    pub fn from_end(path: impl AsRef<Path>, default_tag: &str) -> Result<Self> {
        let mut tail = Self::from_start(path, default_tag);
        tail.offset = match fs::metadata(&tail.path) {
            Ok(m) => m.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => {
                return Err(e).with_context(|| format!("stat {}", tail.path.display()))
            }
        };
        Ok(tail)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// One synchronous read step.
    pub fn poll_now(&mut self) -> Result<ProducerPoll> {
        let len = match fs::metadata(&self.path) {
            Ok(m) => m.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => return Err(e).with_context(|| format!("stat {}", self.path.display())),
        };

        if len < self.offset {
            tracing::warn!(
                path = %self.path.display(),
                offset = self.offset,
                len,
                "journal shrank; treating as rotation"
            );
            counter!("relay_journal_rotations_total").increment(1);
            self.offset = len;
            self.carry.clear();
            return Ok(ProducerPoll {
                events: Vec::new(),
                reset: true,
            });
        }
        if len == self.offset {
            return Ok(ProducerPoll::default());
        }

        let mut file =
            File::open(&self.path).with_context(|| format!("open {}", self.path.display()))?;
        file.seek(SeekFrom::Start(self.offset))?;
        let mut buf = Vec::with_capacity((len - self.offset) as usize);
        let read = file.take(len - self.offset).read_to_end(&mut buf)?;
        self.offset += read as u64;
        self.carry.extend_from_slice(&buf);

        // Only complete lines; a row still being written stays in `carry`.
        let Some(last_nl) = self.carry.iter().rposition(|&b| b == b'\n') else {
            return Ok(ProducerPoll::default());
        };
        let records = parse_records(&self.carry[..=last_nl])?;
        self.carry.drain(..=last_nl);

        let events = records
            .into_iter()
            .map(|r| {
                let raw = time_of_day(&r.full_timestamp)
                    .unwrap_or(r.full_timestamp.as_str())
                    .to_string();
                let tag = if r.source_tag.is_empty() {
                    self.default_tag.clone()
                } else {
                    r.source_tag
                };
                HeadlineEvent::new(raw, r.text, tag)
            })
            .collect::<Vec<_>>();
        counter!("relay_producer_events_total", "producer" => "journal_tail").increment(events.len() as u64);
        Ok(ProducerPoll::events(events))
    }
}

#[async_trait]
impl HeadlineProducer for JournalTail {
    async fn poll(&mut self) -> Result<Option<ProducerPoll>> {
        self.poll_now().map(Some)
    }

    fn poll_interval(&self) -> Duration {
        self.interval
    }

    fn name(&self) -> &'static str {
        "journal_tail"
    }
}
