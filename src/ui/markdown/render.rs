use pulldown_cmark::{html, Event, Options, Parser, Tag, TagEnd};

use super::chart::{self, ChartRenderer};
use super::code::{is_chart_block, language_hint_from_codeblock_kind, render_code_block};

pub(super) struct MarkupConfig<'a> {
    pub syntax_enabled: bool,
    /// Chart blocks are materialized only when a renderer is given.
    pub charts: Option<&'a dyn ChartRenderer>,
    pub download_prefix: &'a str,
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String cannot fail.
    let _ = pulldown_cmark_escape::escape_html(&mut out, text);
    out
}

/// Matches both relative links (`/api/download/x.csv`) and absolute ones whose
/// path starts with the prefix.
pub(super) fn is_download_link(dest: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    if dest.starts_with(prefix) {
        return true;
    }
    let Some(scheme_end) = dest.find("://") else {
        return false;
    };
    let after_scheme = &dest[scheme_end + 3..];
    after_scheme
        .find('/')
        .is_some_and(|slash| after_scheme[slash..].starts_with(prefix))
}

fn render_block(lang: &str, code: &str, cfg: &MarkupConfig<'_>) -> String {
    match cfg.charts {
        Some(renderer) if is_chart_block(lang, code) => chart::materialize(code, renderer),
        _ => render_code_block(lang, code, cfg.syntax_enabled),
    }
}

/// Renders markdown to HTML. Code blocks go through the highlighter (or the
/// chart renderer), download links become buttons, and raw HTML in the source
/// is shown as text.
pub(super) fn render_markup(src: &str, cfg: &MarkupConfig<'_>) -> String {
    let mut events: Vec<Event<'_>> = Vec::new();
    let mut code_block: Option<(String, String)> = None;
    let mut link_stack: Vec<bool> = Vec::new();

    for event in Parser::new_ext(src, markdown_options()) {
        if let Some((lang, code)) = code_block.as_mut() {
            match event {
                Event::Text(text) => code.push_str(&text),
                Event::End(TagEnd::CodeBlock) => {
                    events.push(Event::Html(render_block(lang, code, cfg).into()));
                    code_block = None;
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                code_block = Some((language_hint_from_codeblock_kind(&kind), String::new()));
            }
            Event::Start(Tag::Link { dest_url, .. })
                if is_download_link(&dest_url, cfg.download_prefix) =>
            {
                link_stack.push(true);
                events.push(Event::InlineHtml(
                    format!(
                        "<a class=\"download-btn\" href=\"{}\" download>",
                        escape_html(&dest_url)
                    )
                    .into(),
                ));
            }
            Event::Start(tag @ Tag::Link { .. }) => {
                link_stack.push(false);
                events.push(Event::Start(tag));
            }
            Event::End(TagEnd::Link) => {
                if link_stack.pop() == Some(true) {
                    events.push(Event::InlineHtml("</a>".into()));
                } else {
                    events.push(Event::End(TagEnd::Link));
                }
            }
            Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
            other => events.push(other),
        }
    }

    let mut out = String::with_capacity(src.len() + src.len() / 2);
    html::push_html(&mut out, events.into_iter());
    out
}
