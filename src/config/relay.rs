// src/config/relay.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ingest::dedup::DEFAULT_CACHE_SIZE;
use crate::notify::quota::{DEFAULT_MAX_POSTS, DEFAULT_WINDOW_SECS};
use crate::notify::{ColorMap, RenderStyle, COLOR_GREEN, COLOR_ORANGE, COLOR_RED};

pub const DEFAULT_RELAY_CONFIG_PATH: &str = "config/relay.toml";

pub const ENV_RELAY_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";
pub const ENV_RELAY_LOG_PATH: &str = "RELAY_LOG_PATH";
pub const ENV_RELAY_CACHE_SIZE: &str = "RELAY_CACHE_SIZE";
pub const ENV_DISCORD_WEBHOOK_URL: &str = "DISCORD_WEBHOOK_URL";
pub const ENV_DISCORD_CHANNEL_ID: &str = "DISCORD_CHANNEL_ID";
pub const ENV_DISCORD_BOT_TOKEN: &str = "DISCORD_BOT_TOKEN";

/// Marker meaning "read this secret from the environment".
const ENV_SENTINEL: &str = "ENV";

fn default_log_path() -> PathBuf {
    PathBuf::from("headlines.csv")
}
fn default_true() -> bool {
    true
}
fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}
fn default_tag() -> String {
    "RTRS".to_string()
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_timeout_secs() -> u64 {
    5
}
fn default_discord_style() -> RenderStyle {
    RenderStyle::Clock
}
fn default_max_posts() -> usize {
    DEFAULT_MAX_POSTS
}
fn default_window_secs() -> u64 {
    DEFAULT_WINDOW_SECS
}
fn default_fallback_color() -> u32 {
    COLOR_RED
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// CSV journal of accepted headlines.
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    #[serde(default = "default_true")]
    pub journal_enabled: bool,
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    /// Tag for producers that do not supply one.
    #[serde(default = "default_tag")]
    pub default_source_tag: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Warm the dedup window from the tail of the journal at startup.
    #[serde(default = "default_true")]
    pub seed_from_journal: bool,
    /// e.g. "127.0.0.1:9185"; exporter disabled when absent.
    #[serde(default)]
    pub metrics_addr: Option<String>,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub discord: Option<DiscordConfig>,
    /// Embed color per source tag, e.g. `RTRS = 0xFFA500`.
    #[serde(default)]
    pub colors: HashMap<String, u32>,
    #[serde(default = "default_fallback_color")]
    pub fallback_color: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub style: RenderStyle,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            style: RenderStyle::Full,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Webhook URL or "ENV" (reads DISCORD_WEBHOOK_URL).
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Bot token or "ENV" (reads DISCORD_BOT_TOKEN).
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default = "default_discord_style")]
    pub style: RenderStyle,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub quota: Option<QuotaConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "default_max_posts")]
    pub max_posts: usize,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default)]
    pub usage_file: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            journal_enabled: true,
            cache_size: default_cache_size(),
            default_source_tag: default_tag(),
            poll_interval_ms: default_poll_interval_ms(),
            seed_from_journal: true,
            metrics_addr: None,
            console: ConsoleConfig::default(),
            discord: None,
            colors: HashMap::new(),
            fallback_color: default_fallback_color(),
        }
    }
}

impl RelayConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: RelayConfig = toml::from_str(s).context("parsing relay config")?;
        Ok(cfg)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading relay config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    /// Resolve the file via env var + fallbacks, then apply env overrides
    /// and secrets:
    /// 1) $RELAY_CONFIG_PATH (must exist)
    /// 2) config/relay.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_RELAY_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("RELAY_CONFIG_PATH points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_RELAY_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_RELAY_CONFIG_PATH)?
        } else {
            Self::default()
        };
        cfg.finalize(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    /// Load an explicit file, then apply env overrides and secrets.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut cfg = Self::load_from_file(path)?;
        cfg.finalize(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    /// Overrides, secret resolution and sanitizing. `env` is the variable
    /// lookup (the process environment outside tests).
    pub fn finalize<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |k: &str| env(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(p) = env(ENV_RELAY_LOG_PATH) {
            self.log_path = PathBuf::from(p);
        }
        if let Some(n) = env(ENV_RELAY_CACHE_SIZE) {
            self.cache_size = n
                .parse()
                .map_err(|_| anyhow!("{ENV_RELAY_CACHE_SIZE} must be an integer, got {n:?}"))?;
        }

        // Env-only Discord setup.
        if self.discord.is_none()
            && (env(ENV_DISCORD_WEBHOOK_URL).is_some() || env(ENV_DISCORD_CHANNEL_ID).is_some())
        {
            self.discord = Some(DiscordConfig {
                style: default_discord_style(),
                timeout_secs: default_timeout_secs(),
                ..DiscordConfig::default()
            });
        }

        if let Some(d) = self.discord.as_mut() {
            d.webhook_url = resolve_secret(d.webhook_url.take(), ENV_DISCORD_WEBHOOK_URL, &env)?;
            if d.webhook_url.is_none() {
                d.webhook_url = env(ENV_DISCORD_WEBHOOK_URL);
            }
            if d.channel_id.is_none() {
                d.channel_id = env(ENV_DISCORD_CHANNEL_ID);
            }
            d.bot_token = resolve_secret(d.bot_token.take(), ENV_DISCORD_BOT_TOKEN, &env)?;
            if d.bot_token.is_none() {
                d.bot_token = env(ENV_DISCORD_BOT_TOKEN);
            }

            let channel_ready = d.channel_id.is_some() && d.bot_token.is_some();
            if d.webhook_url.is_none() && !channel_ready {
                return Err(anyhow!(
                    "discord sink needs webhook_url or channel_id + bot_token"
                ));
            }
        }

        if self.cache_size == 0 {
            tracing::warn!("cache_size 0 is not usable; falling back to 1");
            self.cache_size = 1;
        }
        if self.default_source_tag.trim().is_empty() {
            self.default_source_tag = default_tag();
        }
        Ok(())
    }

    /// Built-in tag colors, then the `[colors]` table on top.
    pub fn color_map(&self) -> ColorMap {
        let mut colors = ColorMap::new(self.fallback_color)
            .with("RTRS", COLOR_ORANGE)
            .with("SQUAWK", COLOR_GREEN);
        for (tag, c) in &self.colors {
            colors.insert(tag, *c);
        }
        colors
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms.max(10))
    }
}

fn resolve_secret<F>(value: Option<String>, var: &str, env: &F) -> Result<Option<String>>
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Some(v) if v.trim().eq_ignore_ascii_case(ENV_SENTINEL) => env(var)
            .map(Some)
            .ok_or_else(|| anyhow!("Missing {var} env var")),
        Some(v) if v.trim().is_empty() => Ok(None),
        other => Ok(other),
    }
}
