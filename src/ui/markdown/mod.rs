//! Render pipeline from raw assistant text to HTML markup.
//!
//! While a turn streams, [`Renderer::render_streaming`] renders the whole
//! accumulated buffer and swaps every chart block, finished or not, for a
//! loading placeholder. Once the turn settles, [`Renderer::render_final`]
//! renders the same text with chart blocks materialized.

mod chart;
mod code;
mod fence;
mod render;


use std::time::Duration;

pub use chart::{ChartRenderer, HtmlChartRenderer};
pub(crate) use render::escape_html;

use crate::core::message::Message;
use fence::{normalize_fences, split_chart_blocks, Segment};
use render::{render_markup, MarkupConfig};

pub const DEFAULT_DOWNLOAD_PREFIX: &str = "/api/download/";
pub const CHART_PENDING_LINE: &str = "[rendering chart...]\n";

/// Text-only rendering for line-oriented surfaces. Prose is kept as written
/// and every chart block becomes [`CHART_PENDING_LINE`], followed by a summary
/// line once the block is closed.
///
/// While `settled` is false a trailing run of backticks is held back, since it
/// may turn out to open a chart. As `raw` grows, each result extends the
/// previous one.
pub fn plain_text(raw: &str, settled: bool) -> String {
    let segments = split_chart_blocks(raw);
    let last = segments.len().saturating_sub(1);
    let mut out = String::with_capacity(raw.len());

    for (index, segment) in segments.into_iter().enumerate() {
        match segment {
            Segment::Text(text) if !settled && index == last => {
                out.push_str(text.trim_end_matches('`'));
            }
            Segment::Text(text) => out.push_str(text),
            Segment::Chart { body, closed } => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(CHART_PENDING_LINE);
                if closed {
                    out.push_str(&chart::summary_line(body));
                }
            }
        }
    }
    out
}

/// Markup for one message, kept next to the text it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub raw: String,
    pub markup: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingRender {
    pub markup: String,
    /// True when at least one chart placeholder was emitted.
    pub has_placeholder: bool,
}

pub struct Renderer {
    syntax_highlighting: bool,
    download_prefix: String,
    charts: Box<dyn ChartRenderer>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            syntax_highlighting: true,
            download_prefix: DEFAULT_DOWNLOAD_PREFIX.to_string(),
            charts: Box::new(HtmlChartRenderer),
        }
    }
}

impl Renderer {
    pub fn with_download_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.download_prefix = prefix.into();
        self
    }

    pub fn with_syntax_highlighting(mut self, enabled: bool) -> Self {
        self.syntax_highlighting = enabled;
        self
    }

    pub fn with_chart_renderer(mut self, charts: Box<dyn ChartRenderer>) -> Self {
        self.charts = charts;
        self
    }

    pub fn download_prefix(&self) -> &str {
        &self.download_prefix
    }

    fn config(&self, materialize_charts: bool) -> MarkupConfig<'_> {
        MarkupConfig {
            syntax_enabled: self.syntax_highlighting,
            charts: materialize_charts.then_some(self.charts.as_ref()),
            download_prefix: &self.download_prefix,
        }
    }

    /// Renders an in-flight buffer. `chart_elapsed` is how long the first
    /// placeholder of this turn has been on screen.
    pub fn render_streaming(&self, raw: &str, chart_elapsed: Option<Duration>) -> StreamingRender {
        let cfg = self.config(false);
        let mut markup = String::with_capacity(raw.len() * 2);
        let mut has_placeholder = false;

        for segment in split_chart_blocks(raw) {
            match segment {
                Segment::Text(text) => markup.push_str(&render_markup(text, &cfg)),
                Segment::Chart { .. } => {
                    markup.push_str(&chart::placeholder(chart_elapsed.unwrap_or_default()));
                    has_placeholder = true;
                }
            }
        }

        StreamingRender {
            markup,
            has_placeholder,
        }
    }

    /// Renders a settled assistant message with charts materialized.
    pub fn render_final(&self, raw: &str) -> String {
        render_markup(&normalize_fences(raw), &self.config(true))
    }

    /// User text is shown verbatim.
    pub fn render_user(&self, text: &str) -> String {
        format!("<p>{}</p>\n", escape_html(text).replace('\n', "<br>\n"))
    }

    pub fn render_message(&self, message: &Message) -> RenderedMessage {
        let markup = if message.is_user() {
            self.render_user(&message.content)
        } else {
            self.render_final(&message.content)
        };
        RenderedMessage {
            raw: message.content.clone(),
            markup,
        }
    }
}
