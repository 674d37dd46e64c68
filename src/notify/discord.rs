use anyhow::{Context, Result};
use reqwest::{header::AUTHORIZATION, Client};
use serde::Serialize;
use std::time::Duration;

use super::{RenderStyle, RenderedMessage, Sink};
use crate::error::RelayError;

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

#[derive(Clone, Debug)]
pub enum DiscordTarget {
    /// Incoming webhook URL.
    Webhook(String),
    /// Channel post as a bot user.
    Channel { id: String, token: String },
}

#[derive(Clone)]
pub struct DiscordSink {
    target: DiscordTarget,
    client: Client,
    timeout: Duration,
    style: RenderStyle,
    api_base: String,
}

impl DiscordSink {
    pub fn new(target: DiscordTarget) -> Self {
        Self {
            target,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            style: RenderStyle::Clock,
            api_base: DISCORD_API_BASE.to_string(),
        }
    }

    pub fn webhook(url: impl Into<String>) -> Self {
        Self::new(DiscordTarget::Webhook(url.into()))
    }

    pub fn channel(id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(DiscordTarget::Channel {
            id: id.into(),
            token: token.into(),
        })
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_style(mut self, style: RenderStyle) -> Self {
        self.style = style;
        self
    }

    /// Point bot-channel posts at another API root (local stubs).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        match &self.target {
            DiscordTarget::Webhook(url) => url.clone(),
            DiscordTarget::Channel { id, .. } => {
                format!("{}/channels/{}/messages", self.api_base, id)
            }
        }
    }
}

#[async_trait::async_trait]
impl Sink for DiscordSink {
    async fn send(&self, msg: &RenderedMessage) -> Result<()> {
        let payload = DiscordMessagePayload::embed(msg);

        let mut req = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .json(&payload);
        if let DiscordTarget::Channel { token, .. } = &self.target {
            req = req.header(AUTHORIZATION, format!("Bot {token}"));
        }

        let rsp = req.send().await.context("discord request failed")?;
        let status = rsp.status();
        if !status.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            return Err(RelayError::Sink {
                sink: self.name().to_string(),
                message: format!("HTTP {status}: {body}"),
            }
            .into());
        }
        Ok(())
    }

    fn style(&self) -> RenderStyle {
        self.style
    }

    fn name(&self) -> &str {
        match self.target {
            DiscordTarget::Webhook(_) => "discord_webhook",
            DiscordTarget::Channel { .. } => "discord_channel",
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct DiscordEmbed {
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<u32>,
}

#[derive(Debug, Serialize, PartialEq)]
struct DiscordMessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl DiscordMessagePayload {
    fn embed(msg: &RenderedMessage) -> Self {
        Self {
            content: None,
            embeds: vec![DiscordEmbed {
                description: msg.text.clone(),
                color: msg.color,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_single_colored_embed() {
        let msg = RenderedMessage {
            text: "[10:00] ECB cuts".into(),
            color: Some(0xFFA500),
            source_tag: "RTRS".into(),
        };
        let v = serde_json::to_value(DiscordMessagePayload::embed(&msg)).unwrap();
        assert_eq!(
            v,
            serde_json::json!({ "embeds": [{ "description": "[10:00] ECB cuts", "color": 16753920 }] })
        );
    }

    #[test]
    fn channel_endpoint_uses_api_base() {
        let sink = DiscordSink::channel("855359994547011604", "t").with_api_base("http://127.0.0.1:9/api/");
        assert_eq!(
            sink.endpoint(),
            "http://127.0.0.1:9/api/channels/855359994547011604/messages"
        );
        assert_eq!(sink.name(), "discord_channel");
        assert_eq!(DiscordSink::webhook("https://hook").endpoint(), "https://hook");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        // Port 9 (discard) is not listening in test environments.
        let sink = DiscordSink::webhook("http://127.0.0.1:9/hook").with_timeout(2);
        let msg = RenderedMessage {
            text: "x".into(),
            color: None,
            source_tag: "RTRS".into(),
        };
        assert!(sink.send(&msg).await.is_err());
    }

    /// Reads one HTTP/1.1 request (headers plus content-length body).
    async fn read_request(sock: &mut tokio::net::TcpStream) -> String {
        use tokio::io::AsyncReadExt;
        let mut req = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = sock.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            req.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&req).to_ascii_lowercase();
            if let Some(end) = text.find("\r\n\r\n") {
                let body_len = text[..end]
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if req.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&req).into_owned()
    }

    #[tokio::test]
    async fn server_error_fails_once_and_carries_bot_auth() {
        use tokio::io::AsyncWriteExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Ok(Ok((mut sock, _))) =
                tokio::time::timeout(Duration::from_millis(500), listener.accept()).await
            {
                seen.push(read_request(&mut sock).await);
                sock.write_all(
                    b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 4\r\nconnection: close\r\n\r\noops",
                )
                .await
                .unwrap();
            }
            seen
        });

        let sink = DiscordSink::channel("42", "secret-token")
            .with_api_base(format!("http://{addr}/api/v10"))
            .with_timeout(2);
        let msg = RenderedMessage {
            text: "[10:00] ECB cuts".into(),
            color: Some(0xFFA500),
            source_tag: "RTRS".into(),
        };
        let err = sink.send(&msg).await.unwrap_err();
        match err.downcast_ref::<RelayError>() {
            Some(RelayError::Sink { sink, message }) => {
                assert_eq!(sink, "discord_channel");
                assert!(message.contains("HTTP 500"), "{message}");
            }
            other => panic!("unexpected error: {other:?} / {err:#}"),
        }

        let seen = server.await.unwrap();
        assert_eq!(seen.len(), 1, "request was retried");
        assert!(seen[0].starts_with("POST /api/v10/channels/42/messages "));
        assert!(seen[0]
            .to_ascii_lowercase()
            .contains("authorization: bot secret-token"));
        assert!(seen[0].contains("\"description\":\"[10:00] ECB cuts\""));
    }
}
