// src/ingest/aggregate.rs
use std::time::{Duration, Instant};

/// Buffers fragments (e.g. transcript lines) and releases them as one
/// item once the source has been quiet for `flush_interval`.
#[derive(Debug)]
pub struct HeadlineAggregator {
    flush_interval: Duration,
    buffer: Vec<String>,
    last_line_at: Option<Instant>,
}

impl HeadlineAggregator {
    pub fn new(flush_interval: Duration) -> Self {
        Self {
            flush_interval,
            buffer: Vec::new(),
            last_line_at: None,
        }
    }

    pub fn add_line(&mut self, line: impl Into<String>) {
        self.add_line_at(line, Instant::now());
    }

    pub fn add_line_at(&mut self, line: impl Into<String>, now: Instant) {
        self.buffer.push(line.into());
        self.last_line_at = Some(now);
    }

    pub fn should_flush(&self) -> bool {
        self.should_flush_at(Instant::now())
    }

    pub fn should_flush_at(&self, now: Instant) -> bool {
        match self.last_line_at {
            Some(at) if !self.buffer.is_empty() => {
                now.saturating_duration_since(at) > self.flush_interval
            }
            _ => false,
        }
    }

    /// Drain the buffer joined by newlines. `None` when empty.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let combined = self.buffer.join("\n");
        self.buffer.clear();
        Some(combined)
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for HeadlineAggregator {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flushes_only_after_idle_gap() {
        let t0 = Instant::now();
        let mut agg = HeadlineAggregator::new(Duration::from_secs(5));
        assert!(!agg.should_flush_at(t0));

        agg.add_line_at("BOE'S BAILEY:", t0);
        agg.add_line_at("INFLATION PERSISTENCE STILL A CONCERN", t0 + Duration::from_secs(2));
        assert!(!agg.should_flush_at(t0 + Duration::from_secs(6)));
        assert!(agg.should_flush_at(t0 + Duration::from_secs(8)));

        assert_eq!(
            agg.flush().as_deref(),
            Some("BOE'S BAILEY:\nINFLATION PERSISTENCE STILL A CONCERN")
        );
        assert_eq!(agg.pending(), 0);
        assert!(agg.flush().is_none());
        assert!(!agg.should_flush_at(t0 + Duration::from_secs(60)));
    }
}
