//! Explicit scanner for fenced chart blocks.
//!
//! Assistant output embeds charts as fenced blocks tagged `chart`. Upstream
//! text generation sometimes glues the opening or closing fence onto the end
//! of a prose line, so chart fences are recognized anywhere in a line and
//! re-emitted on their own lines. Other fences are only recognized at the
//! start of a line and are skipped whole, so their contents are never
//! mistaken for chart markers.

use memchr::memmem;

const FENCE: &[u8] = b"```";
pub(crate) const CHART_TAG: &str = "chart";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Text(&'a str),
    Chart { body: &'a str, closed: bool },
}

fn backtick_run(src: &str, pos: usize) -> usize {
    src.as_bytes()[pos..]
        .iter()
        .take_while(|b| **b == b'`')
        .count()
}

fn at_line_start(src: &str, pos: usize) -> bool {
    let line_start = src[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let indent = &src[line_start..pos];
    indent.len() <= 3 && indent.bytes().all(|b| b == b' ')
}

/// If a chart fence opens at `pos`, returns the byte offset where its body
/// starts. A trailing, still-arriving tag that is a prefix of `chart` counts
/// so a half-received marker is never flashed as a plain code block.
fn chart_body_start(src: &str, pos: usize) -> Option<usize> {
    let ticks = backtick_run(src, pos);
    let rest = &src[pos + ticks..];
    let (info, consumed) = match rest.find('\n') {
        Some(i) => (&rest[..i], i + 1),
        None => (rest, rest.len()),
    };
    let tag = info.split_whitespace().next()?;
    let complete_line = consumed > info.len();
    let is_chart = tag.eq_ignore_ascii_case(CHART_TAG)
        || (!complete_line
            && tag.len() < CHART_TAG.len()
            && CHART_TAG.starts_with(&tag.to_ascii_lowercase()));
    is_chart.then_some(pos + ticks + consumed)
}

fn find_fence(src: &str, from: usize) -> Option<usize> {
    memmem::find(&src.as_bytes()[from..], FENCE).map(|i| from + i)
}

/// Finds the fence closing a block opened with `min_ticks` backticks: at line
/// start, at least as long, and with nothing but whitespace after it.
fn find_closing_fence(src: &str, from: usize, min_ticks: usize) -> Option<usize> {
    let mut search = from;
    while let Some(pos) = find_fence(src, search) {
        let ticks = backtick_run(src, pos);
        let trailing = src[pos + ticks..].split('\n').next().unwrap_or("");
        if ticks >= min_ticks && at_line_start(src, pos) && trailing.trim().is_empty() {
            return Some(pos);
        }
        search = pos + ticks;
    }
    None
}

/// Splits `src` into prose and chart blocks. A chart block without a closing
/// fence runs to the end of the input.
pub(crate) fn split_chart_blocks(src: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    let mut search = 0;

    while let Some(pos) = find_fence(src, search) {
        if let Some(body_start) = chart_body_start(src, pos) {
            if pos > cursor {
                segments.push(Segment::Text(&src[cursor..pos]));
            }
            match find_fence(src, body_start) {
                Some(close) => {
                    segments.push(Segment::Chart {
                        body: &src[body_start..close],
                        closed: true,
                    });
                    cursor = close + backtick_run(src, close);
                    search = cursor;
                }
                None => {
                    segments.push(Segment::Chart {
                        body: &src[body_start.min(src.len())..],
                        closed: false,
                    });
                    return segments;
                }
            }
        } else if at_line_start(src, pos) {
            let info_end = src[pos..]
                .find('\n')
                .map(|i| pos + i + 1)
                .unwrap_or(src.len());
            match find_closing_fence(src, info_end, backtick_run(src, pos)) {
                Some(close) => search = close + backtick_run(src, close),
                None => break,
            }
        } else {
            search = pos + backtick_run(src, pos);
        }
    }

    if cursor < src.len() {
        segments.push(Segment::Text(&src[cursor..]));
    }
    segments
}

/// Rewrites `src` so every chart fence sits on its own line.
pub(crate) fn normalize_fences(src: &str) -> String {
    let segments = split_chart_blocks(src);
    let mut out = String::with_capacity(src.len() + 16);
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Chart { body, closed } => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str("```");
                out.push_str(CHART_TAG);
                out.push('\n');
                out.push_str(body);
                if closed {
                    if !body.is_empty() && !body.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push_str("```\n");
                }
            }
        }
    }
    out
}
