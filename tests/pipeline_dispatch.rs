// tests/pipeline_dispatch.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::{Arc, Mutex};

use headline_relay::journal::{read_records, Journal};
use headline_relay::notify::quota::{QuotaSink, UsageTracker};
use headline_relay::notify::{RenderStyle, RenderedMessage, Sink};
use headline_relay::{DispatchResult, HeadlineEvent, Pipeline};

#[derive(Clone, Default)]
struct RecordingSink {
    msgs: Arc<Mutex<Vec<RenderedMessage>>>,
    style: RenderStyle,
}

impl RecordingSink {
    fn clock() -> Self {
        Self {
            style: RenderStyle::Clock,
            ..Self::default()
        }
    }

    fn texts(&self) -> Vec<String> {
        self.msgs.lock().unwrap().iter().map(|m| m.text.clone()).collect()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn send(&self, msg: &RenderedMessage) -> Result<()> {
        self.msgs.lock().unwrap().push(msg.clone());
        Ok(())
    }

    fn style(&self) -> RenderStyle {
        self.style
    }

    fn name(&self) -> &str {
        "recording"
    }
}

struct FailingSink;

#[async_trait]
impl Sink for FailingSink {
    async fn send(&self, _msg: &RenderedMessage) -> Result<()> {
        Err(anyhow!("HTTP 500"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

#[tokio::test]
async fn midnight_rollover_scenario() {
    let sink = RecordingSink::default();
    let mut p = Pipeline::builder(800).sink(Box::new(sink.clone())).build();

    let res = p
        .process_at(
            HeadlineEvent::new("23:59:59", "Fed holds rates", "RTRS"),
            at(2025, 1, 2, 0, 1, 0),
        )
        .await;

    let DispatchResult::Dispatched(report) = res else {
        panic!("expected dispatch, got {res:?}");
    };
    assert_eq!(report.event.timestamp_str(), "2025-01-01 23:59:59");
    assert_eq!(sink.texts(), vec!["2025-01-01 23:59:59 | Fed holds rates"]);
}

#[tokio::test]
async fn repeated_row_yields_one_log_row_and_one_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("headlines.csv");
    let sink = RecordingSink::clock();
    let mut p = Pipeline::builder(800)
        .journal(Journal::open(&log).unwrap())
        .sink(Box::new(sink.clone()))
        .build();

    let now = at(2025, 3, 6, 10, 0, 5);
    let mut outcomes = Vec::new();
    for _ in 0..3 {
        outcomes.push(
            p.process_at(HeadlineEvent::new("10:00:00", "ECB cuts", "RTRS"), now)
                .await,
        );
    }
    p.shutdown().unwrap();

    assert!(outcomes[0].is_dispatched());
    assert_eq!(outcomes[1], DispatchResult::Duplicate);
    assert_eq!(outcomes[2], DispatchResult::Duplicate);

    let rows = read_records(&log).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].full_timestamp, "2025-03-06 10:00:00");
    assert_eq!(rows[0].text, "ECB cuts");
    assert_eq!(rows[0].source_tag, "RTRS");

    let msgs = sink.msgs.lock().unwrap().clone();
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].text, "[10:00] ECB cuts");
    assert_eq!(msgs[0].color, Some(0xFFA500));
}

#[tokio::test]
async fn noise_and_malformed_do_not_touch_the_window() {
    let sink = RecordingSink::default();
    let mut p = Pipeline::builder(800).sink(Box::new(sink.clone())).build();
    let now = at(2025, 3, 6, 12, 0, 0);

    assert_eq!(
        p.process_at(HeadlineEvent::new("11:00:00", "   ", "RTRS"), now).await,
        DispatchResult::Noise
    );
    assert_eq!(
        p.process_at(HeadlineEvent::new("11:00:00", "11:00:00", "RTRS"), now).await,
        DispatchResult::Noise
    );
    assert_eq!(
        p.process_at(HeadlineEvent::new("25:00:00", "Gold spikes", "RTRS"), now).await,
        DispatchResult::Malformed("25:00:00".into())
    );
    assert!(p.dedup().is_empty());

    // The malformed sighting did not burn the text.
    assert!(p
        .process_at(HeadlineEvent::new("11:00:01", "Gold spikes", "RTRS"), now)
        .await
        .is_dispatched());
    assert_eq!(sink.texts().len(), 1);
}

#[tokio::test]
async fn only_exact_text_counts_as_a_repeat() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("headlines.csv");
    let mut p = Pipeline::builder(800)
        .journal(Journal::open(&log).unwrap())
        .build();
    let now = at(2025, 3, 6, 12, 0, 0);

    assert!(p
        .process_at(HeadlineEvent::new("11:00:00", "Fed holds rates", "RTRS"), now)
        .await
        .is_dispatched());
    assert!(p
        .process_at(HeadlineEvent::new("11:00:00", "Fed  holds rates", "RTRS"), now)
        .await
        .is_dispatched());
    // Surrounding whitespace and NBSPs are the only things ignored.
    assert_eq!(
        p.process_at(HeadlineEvent::new("11:00:00", "\u{a0}Fed holds rates ", "RTRS"), now)
            .await,
        DispatchResult::Duplicate
    );

    let quote = "USD/JPY <bid> 150.10 offered";
    assert!(p
        .process_at(HeadlineEvent::new("11:00:01", quote, "FLY"), now)
        .await
        .is_dispatched());

    let long_a = format!("{}A", "X".repeat(1_505));
    let long_b = format!("{}B", "X".repeat(1_505));
    for long in [&long_a, &long_b] {
        assert!(p
            .process_at(HeadlineEvent::new("11:00:02", long.as_str(), "RTRS"), now)
            .await
            .is_dispatched());
    }
    p.shutdown().unwrap();

    let texts: Vec<String> = read_records(&log).unwrap().into_iter().map(|r| r.text).collect();
    assert_eq!(
        texts,
        vec![
            "Fed holds rates".to_string(),
            "Fed  holds rates".to_string(),
            quote.to_string(),
            long_a,
            long_b,
        ]
    );
}

#[tokio::test]
async fn sink_failure_is_reported_not_retried() {
    let ok = RecordingSink::default();
    let mut p = Pipeline::builder(800)
        .sink(Box::new(FailingSink))
        .sink(Box::new(ok.clone()))
        .build();
    let now = at(2025, 3, 6, 12, 0, 0);

    let DispatchResult::Dispatched(r) = p
        .process_at(HeadlineEvent::new("11:59:00", "BoJ intervenes", "RTRS"), now)
        .await
    else {
        panic!("expected dispatch");
    };
    assert_eq!((r.delivered, r.failed), (1, 1));
    assert!(!r.journaled);

    // Not resurfaced on the next sighting.
    assert_eq!(
        p.process_at(HeadlineEvent::new("11:59:00", "BoJ intervenes", "RTRS"), now)
            .await,
        DispatchResult::Duplicate
    );
    assert_eq!(ok.texts().len(), 1);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn journal_failure_still_dispatches() {
    // Every write to /dev/full fails with ENOSPC.
    let sink = RecordingSink::default();
    let mut p = Pipeline::builder(800)
        .journal(Journal::open("/dev/full").unwrap())
        .sink(Box::new(sink.clone()))
        .build();

    let DispatchResult::Dispatched(r) = p
        .process_at(
            HeadlineEvent::new("09:00:00", "Payrolls beat", "RTRS"),
            at(2025, 3, 7, 9, 0, 1),
        )
        .await
    else {
        panic!("expected dispatch");
    };
    assert!(!r.journaled);
    assert_eq!(r.delivered, 1);
    assert_eq!(sink.texts().len(), 1);
}

#[tokio::test]
async fn capacity_eviction_reopens_oldest_text() {
    let mut p = Pipeline::builder(800).build();
    let now = at(2025, 3, 6, 12, 0, 0);
    for i in 0..801 {
        let ev = HeadlineEvent::new("11:00:00", format!("item {i}"), "RTRS");
        assert!(p.process_at(ev, now).await.is_dispatched());
    }
    assert_eq!(p.dedup().len(), 800);
    assert!(p
        .process_at(HeadlineEvent::new("11:00:00", "item 0", "RTRS"), now)
        .await
        .is_dispatched());
    assert_eq!(
        p.process_at(HeadlineEvent::new("11:00:00", "item 800", "RTRS"), now)
            .await,
        DispatchResult::Duplicate
    );
}

#[tokio::test]
async fn quota_caps_posts_but_not_the_journal() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("headlines.csv");
    let inner = RecordingSink::default();
    let quota = QuotaSink::new(inner.clone(), UsageTracker::in_memory(2, 3600));
    let mut p = Pipeline::builder(800)
        .journal(Journal::open(&log).unwrap())
        .sink(Box::new(quota))
        .build();
    let now = at(2025, 3, 6, 12, 0, 0);

    let mut failed = 0;
    for i in 0..3 {
        if let DispatchResult::Dispatched(r) = p
            .process_at(HeadlineEvent::new("11:00:00", format!("h{i}"), "FLY"), now)
            .await
        {
            failed += r.failed;
        }
    }
    p.shutdown().unwrap();

    assert_eq!(inner.texts().len(), 2);
    assert_eq!(failed, 1);
    assert_eq!(read_records(&log).unwrap().len(), 3);
}

#[tokio::test]
async fn seeded_window_suppresses_logged_headlines() {
    let mut p = Pipeline::builder(800)
        .seed(vec!["Already logged".to_string()])
        .build();
    let now = at(2025, 3, 6, 12, 0, 0);
    assert_eq!(
        p.process_at(HeadlineEvent::new("11:00:00", "Already logged", "RTRS"), now)
            .await,
        DispatchResult::Duplicate
    );
}

#[tokio::test]
async fn restart_from_config_warms_window_from_journal() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = headline_relay::RelayConfig::default();
    cfg.log_path = dir.path().join("headlines.csv");
    cfg.console.enabled = false;

    let now = at(2025, 3, 6, 12, 0, 0);
    let mut first = Pipeline::from_config(&cfg).unwrap();
    assert!(first
        .process_at(HeadlineEvent::new("11:00:00", "Fed holds rates", "RTRS"), now)
        .await
        .is_dispatched());
    first.shutdown().unwrap();

    let mut second = Pipeline::from_config(&cfg).unwrap();
    assert!(second.sink_names().is_empty());
    assert_eq!(second.dedup().len(), 1);
    assert_eq!(
        second
            .process_at(HeadlineEvent::new("11:00:00", "Fed holds rates", "RTRS"), now)
            .await,
        DispatchResult::Duplicate
    );
    second.shutdown().unwrap();
    assert_eq!(read_records(&cfg.log_path).unwrap().len(), 1);
}
