use pulldown_cmark::CodeBlockKind;

use super::fence::CHART_TAG;
use super::render::escape_html;
use crate::utils::syntax::highlight_code_block;

pub(super) fn language_hint_from_codeblock_kind(kind: &CodeBlockKind<'_>) -> String {
    match kind {
        CodeBlockKind::Indented => String::new(),
        CodeBlockKind::Fenced(info) => info.split_ascii_whitespace().next().unwrap_or("").into(),
    }
}

/// A block is a chart when it is tagged `chart`, or when an untagged or JSON
/// block opens with a `data` or `type` key.
pub(super) fn is_chart_block(lang: &str, code: &str) -> bool {
    if lang.eq_ignore_ascii_case(CHART_TAG) {
        return true;
    }
    if !(lang.is_empty() || lang.eq_ignore_ascii_case("json")) {
        return false;
    }
    let Some(rest) = code.trim_start().strip_prefix('{') else {
        return false;
    };
    let rest = rest.trim_start();
    rest.starts_with("\"data\"") || rest.starts_with("\"type\"")
}

pub(super) fn render_code_block(lang: &str, code: &str, syntax_enabled: bool) -> String {
    let code = detab(code);
    let class = if lang.is_empty() {
        String::new()
    } else {
        format!(" class=\"language-{}\"", escape_html(lang))
    };

    let body = syntax_enabled
        .then(|| highlight_code_block(lang, &code))
        .flatten()
        .unwrap_or_else(|| escape_html(&code));

    format!("<pre><code{class}>{body}</code></pre>\n")
}

fn detab(s: &str) -> String {
    s.replace('\t', "    ")
}
