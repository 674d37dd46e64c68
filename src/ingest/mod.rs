// src/ingest/mod.rs
pub mod aggregate;
pub mod dedup;
pub mod extract;
pub mod providers;
pub mod timestamp;
pub mod types;

use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::ingest::types::{HeadlineProducer, ProducerPoll};
use crate::pipeline::{DispatchResult, Pipeline};

/// Dedup key and journal text. Only NBSPs become plain spaces and the ends
/// are trimmed; inner spacing, markup and length are kept verbatim.
pub fn normalize_text(s: &str) -> String {
    s.replace('\u{a0}', " ").trim().to_string()
}

/// `HH:MM:SS` on its own: a timestamp cell picked up as text.
pub fn is_time_of_day(s: &str) -> bool {
    static RE_TOD: OnceCell<Regex> = OnceCell::new();
    RE_TOD
        .get_or_init(|| Regex::new(r"^\d{2}:\d{2}:\d{2}$").unwrap())
        .is_match(s)
}

/// Outcome counts of feeding one or more polls into a pipeline.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    pub dispatched: usize,
    pub duplicates: usize,
    pub noise: usize,
    pub malformed: usize,
    pub resets: usize,
}

impl FeedStats {
    fn absorb(&mut self, other: FeedStats) {
        self.dispatched += other.dispatched;
        self.duplicates += other.duplicates;
        self.noise += other.noise;
        self.malformed += other.malformed;
        self.resets += other.resets;
    }
}

/// Push one poll through the pipeline, clearing dedup state first when the
/// source reports a rotation.
pub async fn feed(pipeline: &mut Pipeline, poll: ProducerPoll) -> FeedStats {
    let mut stats = FeedStats::default();
    if poll.reset {
        pipeline.reset_dedup();
        stats.resets += 1;
    }
    for ev in poll.events {
        match pipeline.process(ev).await {
            DispatchResult::Dispatched(_) => stats.dispatched += 1,
            DispatchResult::Duplicate => stats.duplicates += 1,
            DispatchResult::Noise => stats.noise += 1,
            DispatchResult::Malformed(_) => stats.malformed += 1,
        }
    }
    stats
}

/// Poll `producer` until it is exhausted or Ctrl-C arrives. Does not shut
/// the pipeline down; the caller owns that.
pub async fn run_producer<P>(producer: &mut P, pipeline: &mut Pipeline) -> FeedStats
where
    P: HeadlineProducer + ?Sized,
{
    let mut total = FeedStats::default();
    info!(producer = producer.name(), "producer started");

    loop {
        let polled = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            res = producer.poll() => res,
        };

        match polled {
            Ok(Some(poll)) => {
                let stats = feed(pipeline, poll).await;
                if stats.dispatched > 0 || stats.resets > 0 {
                    debug!(?stats, "poll processed");
                }
                total.absorb(stats);
            }
            Ok(None) => {
                info!(producer = producer.name(), "producer exhausted");
                break;
            }
            Err(e) => {
                warn!(error = ?e, producer = producer.name(), "producer error");
                counter!("relay_producer_errors_total").increment(1);
            }
        }

        let pause = producer.poll_interval();
        if !pause.is_zero() {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted");
                    break;
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    info!(
        dispatched = total.dispatched,
        duplicates = total.duplicates,
        noise = total.noise,
        malformed = total.malformed,
        resets = total.resets,
        "producer stopped"
    );
    total
}
