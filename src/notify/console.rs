use anyhow::Result;

use super::{RenderStyle, RenderedMessage, Sink};

/// Prints accepted headlines to stdout, one per line.
pub struct ConsoleSink {
    style: RenderStyle,
}

impl ConsoleSink {
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new(RenderStyle::Full)
    }
}

#[async_trait::async_trait]
impl Sink for ConsoleSink {
    async fn send(&self, msg: &RenderedMessage) -> Result<()> {
        println!("{}", msg.text);
        Ok(())
    }

    fn style(&self) -> RenderStyle {
        self.style
    }

    fn name(&self) -> &str {
        "console"
    }
}
