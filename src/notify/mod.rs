// src/notify/mod.rs
pub mod console;
pub mod discord;
pub mod quota;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ingest::types::NormalizedEvent;

pub const COLOR_ORANGE: u32 = 0xFFA500;
pub const COLOR_GREEN: u32 = 0x00FF00;
pub const COLOR_RED: u32 = 0xE74C3C;

/// How a sink wants the line laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStyle {
    /// `[HH:MM] text`
    Clock,
    /// `YYYY-MM-DD HH:MM:SS | text`
    #[default]
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub text: String,
    pub color: Option<u32>,
    pub source_tag: String,
}

/// Embed colors per source tag (case-insensitive).
#[derive(Debug, Clone)]
pub struct ColorMap {
    by_tag: HashMap<String, u32>,
    fallback: u32,
}

impl ColorMap {
    pub fn new(fallback: u32) -> Self {
        Self {
            by_tag: HashMap::new(),
            fallback,
        }
    }

    pub fn with(mut self, tag: &str, color: u32) -> Self {
        self.insert(tag, color);
        self
    }

    pub fn insert(&mut self, tag: &str, color: u32) {
        self.by_tag.insert(tag.trim().to_ascii_uppercase(), color);
    }

    pub fn color_for(&self, tag: &str) -> u32 {
        self.by_tag
            .get(&tag.trim().to_ascii_uppercase())
            .copied()
            .unwrap_or(self.fallback)
    }
}

impl Default for ColorMap {
    fn default() -> Self {
        Self::new(COLOR_RED)
            .with("RTRS", COLOR_ORANGE)
            .with("SQUAWK", COLOR_GREEN)
    }
}

pub fn render(ev: &NormalizedEvent, style: RenderStyle, colors: &ColorMap) -> RenderedMessage {
    let text = match style {
        RenderStyle::Clock => format!("[{}] {}", ev.full_timestamp.format("%H:%M"), ev.text),
        RenderStyle::Full => format!("{} | {}", ev.timestamp_str(), ev.text),
    };
    RenderedMessage {
        text,
        color: Some(colors.color_for(&ev.source_tag)),
        source_tag: ev.source_tag.clone(),
    }
}

/// Downstream destination. Failures are reported by the caller and never
/// retried.
#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    async fn send(&self, msg: &RenderedMessage) -> Result<()>;

    fn style(&self) -> RenderStyle {
        RenderStyle::Full
    }

    fn name(&self) -> &str;
}
