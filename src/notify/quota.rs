// src/notify/quota.rs
use anyhow::Result;
use chrono::Utc;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use super::{RenderStyle, RenderedMessage, Sink};
use crate::error::RelayError;

pub const DEFAULT_MAX_POSTS: usize = 100;
pub const DEFAULT_WINDOW_SECS: u64 = 24 * 3600;

/// Rolling count of posting attempts, optionally persisted as a JSON array
/// of unix timestamps so the budget survives restarts.
#[derive(Debug)]
pub struct UsageTracker {
    path: Option<PathBuf>,
    max_attempts: usize,
    window_secs: u64,
    attempts: VecDeque<f64>,
}

impl UsageTracker {
    pub fn in_memory(max_attempts: usize, window_secs: u64) -> Self {
        Self {
            path: None,
            max_attempts,
            window_secs,
            attempts: VecDeque::new(),
        }
    }

    /// Unreadable or corrupt files start from an empty history.
    pub fn load(path: impl Into<PathBuf>, max_attempts: usize, window_secs: u64) -> Self {
        let path = path.into();
        let attempts = match std::fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str::<Vec<f64>>(&s)
                .map(VecDeque::from)
                .unwrap_or_else(|e| {
                    tracing::warn!(path = %path.display(), error = %e, "usage file unreadable; starting empty");
                    VecDeque::new()
                }),
            Err(_) => VecDeque::new(),
        };
        let mut t = Self {
            path: Some(path),
            max_attempts,
            window_secs,
            attempts,
        };
        t.prune(now_secs());
        t
    }

    pub fn prune(&mut self, now: f64) {
        let window = self.window_secs as f64;
        while let Some(&first) = self.attempts.front() {
            if now - first > window {
                self.attempts.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn can_post(&mut self, now: f64) -> bool {
        self.prune(now);
        self.attempts.len() < self.max_attempts
    }

    pub fn record_post(&mut self, now: f64) {
        self.attempts.push_back(now);
        self.save();
    }

    pub fn used(&self) -> usize {
        self.attempts.len()
    }

    fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(dir) {
                tracing::warn!("usage dir: {e:#}");
            }
        }
        let body = serde_json::to_vec(&self.attempts).unwrap_or_default();
        if let Err(e) = std::fs::write(path, body) {
            tracing::warn!("write usage: {e:#}");
        }
    }
}

fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1_000.0
}

/// Wraps a sink with a posting budget. Attempts count whether or not the
/// inner send succeeds.
pub struct QuotaSink<S> {
    inner: S,
    tracker: Mutex<UsageTracker>,
    name: String,
}

impl<S: Sink> QuotaSink<S> {
    pub fn new(inner: S, tracker: UsageTracker) -> Self {
        let name = format!("{}+quota", inner.name());
        Self {
            inner,
            tracker: Mutex::new(tracker),
            name,
        }
    }

    fn reserve(&self, now: f64) -> std::result::Result<(), RelayError> {
        let mut t = self.tracker.lock().unwrap_or_else(|p| p.into_inner());
        if !t.can_post(now) {
            return Err(RelayError::QuotaExhausted {
                max: t.max_attempts,
                window_secs: t.window_secs,
            });
        }
        t.record_post(now);
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: Sink> Sink for QuotaSink<S> {
    async fn send(&self, msg: &RenderedMessage) -> Result<()> {
        self.reserve(now_secs())?;
        self.inner.send(msg).await
    }

    fn style(&self) -> RenderStyle {
        self.inner.style()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
