use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use super::render::escape_html;

/// Turns a parsed chart description into markup. The default implementation
/// emits a figure carrying the description for a client-side charting
/// library to pick up.
pub trait ChartRenderer {
    fn render(&self, spec: &Value) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlChartRenderer;

impl ChartRenderer for HtmlChartRenderer {
    fn render(&self, spec: &Value) -> String {
        let compact = spec.to_string();
        let pretty = serde_json::to_string_pretty(spec).unwrap_or_else(|_| compact.clone());
        let title = chart_title(spec)
            .map(|title| format!("<figcaption>{}</figcaption>", escape_html(title)))
            .unwrap_or_default();

        format!(
            "<div class=\"chart-block\"><figure class=\"chart\" data-chart=\"{}\">{}</figure>\
             <details class=\"chart-data\"><summary>View data</summary>\
             <pre><code class=\"language-json\">{}</code></pre></details></div>\n",
            escape_html(&compact),
            title,
            escape_html(&pretty),
        )
    }
}

fn chart_title(spec: &Value) -> Option<&str> {
    spec.pointer("/layout/title/text")
        .or_else(|| spec.pointer("/layout/title"))
        .and_then(Value::as_str)
}

/// One-line stand-in for a finished chart on a text-only surface.
pub(super) fn summary_line(body: &str) -> String {
    match serde_json::from_str::<Value>(body.trim()) {
        Ok(spec) => match chart_title(&spec) {
            Some(title) => format!("[chart: {title}]\n"),
            None => "[chart]\n".to_string(),
        },
        Err(_) => "[chart could not be rendered]\n".to_string(),
    }
}

/// Parses `body` and hands it to `renderer`. Malformed payloads are logged and
/// produce a failure block in place of the chart.
pub(super) fn materialize(body: &str, renderer: &dyn ChartRenderer) -> String {
    match serde_json::from_str::<Value>(body.trim()) {
        Ok(spec) => renderer.render(&spec),
        Err(err) => {
            warn!(error = %err, "chart payload is not valid JSON; leaving it unrendered");
            "<div class=\"chart chart-error\">Chart could not be rendered.</div>\n".to_string()
        }
    }
}

/// Loading stand-in for a chart that is still streaming. The negative
/// animation delay keeps the spinner phase continuous across re-renders.
pub(super) fn placeholder(elapsed: Duration) -> String {
    format!(
        "<div class=\"chart-placeholder\"><div class=\"chart-spinner\" \
         style=\"animation-delay: -{}ms\"></div><span>Rendering chart...</span></div>\n",
        elapsed.as_millis()
    )
}
