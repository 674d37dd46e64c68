// src/ingest/providers/lines.rs
//! Line-oriented producer for piping another monitor's output into the
//! relay: `HH:MM:SS<TAB>text[<TAB>TAG]`, one event per line.
//!
//! In transcript mode lines carry no timestamp; consecutive lines are
//! merged until the source goes quiet and stamped with the local clock.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::ingest::aggregate::HeadlineAggregator;
use crate::ingest::types::{HeadlineEvent, HeadlineProducer, ProducerPoll};

/// Parse one producer line. `None` for blank lines or a line that has no
/// text after its timestamp.
pub fn parse_line(line: &str, default_tag: &str) -> Option<HeadlineEvent> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let mut fields = line.split('\t');
    let first = fields.next()?.trim();
    let (ts, text, tag) = match fields.next() {
        Some(text) => (first, text.trim(), fields.next().map(str::trim)),
        None => {
            let (ts, text) = first.split_once(' ')?;
            (ts, text.trim(), None)
        }
    };
    if text.is_empty() {
        return None;
    }
    let tag = tag.filter(|t| !t.is_empty()).unwrap_or(default_tag);
    Some(HeadlineEvent::new(ts, text, tag))
}

pub struct LineProducer<R> {
    lines: Lines<R>,
    default_tag: String,
    transcript: Option<(HeadlineAggregator, Duration)>,
    eof: bool,
}

impl LineProducer<BufReader<Stdin>> {
    pub fn stdin(default_tag: &str) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), default_tag)
    }
}

impl<R: AsyncBufRead + Unpin + Send> LineProducer<R> {
    pub fn new(reader: R, default_tag: &str) -> Self {
        Self {
            lines: reader.lines(),
            default_tag: default_tag.to_string(),
            transcript: None,
            eof: false,
        }
    }

    /// Merge untimestamped lines separated by less than `gap`.
    pub fn transcript(mut self, gap: Duration) -> Self {
        self.transcript = Some((HeadlineAggregator::new(gap), gap));
        self
    }

    async fn next_timed(&mut self) -> Result<Option<ProducerPoll>> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            match parse_line(&line, &self.default_tag) {
                Some(ev) => return Ok(Some(ProducerPoll::events(vec![ev]))),
                None if line.trim().is_empty() => continue,
                None => tracing::warn!(line = %line, "unparseable producer line"),
            }
        }
    }

    async fn next_transcript(&mut self) -> Result<Option<ProducerPoll>> {
        if self.eof {
            return Ok(None);
        }
        let tag = self.default_tag.clone();
        let Some((agg, gap)) = self.transcript.as_mut() else {
            return Ok(None);
        };
        loop {
            match tokio::time::timeout(*gap, self.lines.next_line()).await {
                Err(_elapsed) => {
                    if agg.should_flush() {
                        if let Some(text) = agg.flush() {
                            return Ok(Some(ProducerPoll::events(vec![stamped(text, &tag)])));
                        }
                    }
                }
                Ok(Ok(Some(line))) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        agg.add_line(line);
                    }
                }
                Ok(Ok(None)) => {
                    self.eof = true;
                    let events = agg.flush().map(|t| stamped(t, &tag)).into_iter().collect();
                    return Ok(Some(ProducerPoll::events(events)));
                }
                Ok(Err(e)) => return Err(e.into()),
            }
        }
    }
}

fn stamped(text: String, tag: &str) -> HeadlineEvent {
    let now = chrono::Local::now().format("%H:%M:%S").to_string();
    HeadlineEvent::new(now, text, tag)
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> HeadlineProducer for LineProducer<R> {
    async fn poll(&mut self) -> Result<Option<ProducerPoll>> {
        if self.transcript.is_some() {
            self.next_transcript().await
        } else {
            self.next_timed().await
        }
    }

    fn name(&self) -> &'static str {
        "lines"
    }
}
