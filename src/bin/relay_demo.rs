//! Demo that pushes a few desk headlines through a console-only pipeline:
//! a midnight rollover, repeated UI re-renders, and timestamp noise.

use chrono::NaiveDate;
use headline_relay::notify::console::ConsoleSink;
use headline_relay::notify::RenderStyle;
use headline_relay::{DispatchResult, HeadlineEvent, Pipeline};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut pipeline = Pipeline::builder(800)
        .sink(Box::new(ConsoleSink::new(RenderStyle::Full)))
        .sink(Box::new(ConsoleSink::new(RenderStyle::Clock)))
        .build();

    let Some(now) = NaiveDate::from_ymd_opt(2025, 1, 2).and_then(|d| d.and_hms_opt(0, 1, 0)) else {
        return;
    };

    let seq = [
        HeadlineEvent::new("23:59:59", "Fed holds rates", "RTRS"),
        HeadlineEvent::new("00:00:30", "ECB cuts", "RTRS"),
        HeadlineEvent::new("00:00:30", "ECB cuts", "RTRS"),
        HeadlineEvent::new("00:00:30", "ECB cuts", "RTRS"),
        HeadlineEvent::new("00:00:31", "00:00:31", "RTRS"),
        HeadlineEvent::new("0:61", "Garbled row", "FLY"),
    ];

    for ev in seq {
        let outcome = match pipeline.process_at(ev, now).await {
            DispatchResult::Dispatched(r) => format!("dispatched to {} sink(s)", r.delivered),
            DispatchResult::Duplicate => "duplicate".to_string(),
            DispatchResult::Noise => "noise".to_string(),
            DispatchResult::Malformed(raw) => format!("malformed timestamp {raw:?}"),
        };
        tracing::info!("{outcome}");
    }

    if let Err(e) = pipeline.shutdown() {
        tracing::warn!("shutdown: {e}");
    }
    eprintln!("relay-demo done");
}
