// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod error;
pub mod ingest;
pub mod journal;
pub mod notify;
pub mod pipeline;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::RelayConfig;
pub use crate::error::RelayError;
pub use crate::ingest::types::{HeadlineEvent, HeadlineProducer, NormalizedEvent, ProducerPoll};
pub use crate::pipeline::{DispatchReport, DispatchResult, Pipeline};
