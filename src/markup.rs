//! Constrained markup rendering for reply text.
//!
//! Replies use a small subset of markdown: `**bold**`, `**Heading**:` lines, `-`/`•` bullets,
//! `1.`/`1)` numbered items, and blank-line separated paragraphs.  [`render`] turns raw reply
//! text into [`DisplayBlock`]s; [`to_html`] turns blocks into an HTML fragment
//! for web front ends.
//!
//! Text is escaped before any structure is recognized, so markup supplied in a reply can never
//! become markup in the output.

use crate::types::{BlockKind, DisplayBlock, Inline};

/// Escapes the three HTML-sensitive characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Reverses [`escape_html`].
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Splits one escaped line into text and bold runs.
///
/// A bold run is the shortest `**X**` with at least one character in `X`.  An opening `**`
/// without a partner is left as literal asterisks.
pub fn parse_inlines(line: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut text = String::new();
    let mut rest = line;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("**") {
            if let Some(first) = after.chars().next() {
                let search_from = first.len_utf8();
                if let Some(end) = after[search_from..].find("**") {
                    let end = search_from + end;
                    if !text.is_empty() {
                        out.push(Inline::Text(std::mem::take(&mut text)));
                    }
                    out.push(Inline::Bold(after[..end].to_string()));
                    rest = &after[end + 2..];
                    continue;
                }
            }
        }
        // No match here: emit one character literally and try again from the next.
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            text.push(c);
        }
        rest = chars.as_str();
    }
    if !text.is_empty() {
        out.push(Inline::Text(text));
    }
    out
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

enum Line<'a> {
    Blank,
    Item(ListKind, &'a str),
    Plain(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    if line.trim().is_empty() {
        return Line::Blank;
    }
    if let Some(item) = bullet_item(line) {
        return Line::Item(ListKind::Unordered, item);
    }
    if let Some(item) = numbered_item(line) {
        return Line::Item(ListKind::Ordered, item);
    }
    Line::Plain(line)
}

// `\s*[-•]\s+(.*)`
fn bullet_item(line: &str) -> Option<&str> {
    let body = line.trim_start();
    let body = body
        .strip_prefix('-')
        .or_else(|| body.strip_prefix('•'))?;
    item_body(body)
}

// `\s*\d+[.)]\s+(.*)`
fn numbered_item(line: &str) -> Option<&str> {
    let body = line.trim_start();
    let digits = body.len() - body.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let body = &body[digits..];
    let body = body
        .strip_prefix('.')
        .or_else(|| body.strip_prefix(')'))?;
    item_body(body)
}

fn item_body(after_marker: &str) -> Option<&str> {
    let item = after_marker.trim_start();
    if item.len() == after_marker.len() {
        None
    } else {
        Some(item)
    }
}

#[derive(Default)]
struct Builder {
    blocks: Vec<DisplayBlock>,
    lines: Vec<String>,
    list: Option<(ListKind, Vec<Vec<Inline>>)>,
}

impl Builder {
    fn push_item(&mut self, kind: ListKind, item: &str) {
        self.flush_paragraph();
        if let Some((open, items)) = &mut self.list
            && *open == kind
        {
            items.push(parse_inlines(item));
            return;
        }
        self.flush_list();
        self.list = Some((kind, vec![parse_inlines(item)]));
    }

    fn push_plain(&mut self, line: &str) {
        self.flush_list();
        self.lines.push(line.to_string());
    }

    fn blank(&mut self) {
        // A blank line inside a list is swallowed; the list stays open.
        if self.list.is_none() {
            self.flush_paragraph();
        }
    }

    fn flush_list(&mut self) {
        match self.list.take() {
            Some((ListKind::Unordered, items)) => {
                self.blocks.push(DisplayBlock::UnorderedList(items))
            }
            Some((ListKind::Ordered, items)) => self.blocks.push(DisplayBlock::OrderedList(items)),
            None => {}
        }
    }

    fn flush_paragraph(&mut self) {
        if self.lines.is_empty() {
            return;
        }
        let lines = std::mem::take(&mut self.lines);
        if let [line] = lines.as_slice()
            && let Some(heading) = heading_text(line)
        {
            self.blocks.push(DisplayBlock::Heading(heading));
            return;
        }
        let mut inlines = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            if idx > 0 {
                inlines.push(Inline::LineBreak);
            }
            inlines.extend(parse_inlines(line));
        }
        self.blocks.push(DisplayBlock::Paragraph(inlines));
    }

    fn finish(mut self) -> Vec<DisplayBlock> {
        self.flush_list();
        self.flush_paragraph();
        self.blocks
    }
}

// `**Heading**:` with optional whitespace around the colon.
fn heading_text(line: &str) -> Option<String> {
    let body = line.trim().strip_suffix(':')?.trim_end();
    match parse_inlines(body).as_slice() {
        [Inline::Bold(text)] => Some(text.clone()),
        _ => None,
    }
}

/// Renders raw reply text into display blocks.
///
/// Empty input yields no blocks.  The result depends only on `text`, so rendering the same text
/// twice yields identical blocks.
pub fn render(text: &str) -> Vec<DisplayBlock> {
    let escaped = escape_html(text);
    let mut builder = Builder::default();
    for raw in escaped.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw).trim_end();
        match classify(line) {
            Line::Blank => builder.blank(),
            Line::Item(kind, item) => builder.push_item(kind, item),
            Line::Plain(line) => builder.push_plain(line),
        }
    }
    builder.finish()
}

fn inlines_to_html(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(text),
            Inline::Bold(text) => {
                out.push_str("<strong>");
                out.push_str(text);
                out.push_str("</strong>");
            }
            Inline::LineBreak => out.push_str("<br/>"),
        }
    }
}

/// Renders blocks as an HTML fragment.
///
/// Text inside the blocks is already escaped, so the fragment is safe to embed.
pub fn to_html(blocks: &[DisplayBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        match block {
            DisplayBlock::Paragraph(inlines) => {
                out.push_str("<p>");
                inlines_to_html(inlines, &mut out);
                out.push_str("</p>");
            }
            DisplayBlock::Heading(text) => {
                out.push_str("<h4>");
                out.push_str(text);
                out.push_str("</h4>");
            }
            DisplayBlock::UnorderedList(items) | DisplayBlock::OrderedList(items) => {
                let tag = match block.kind() {
                    BlockKind::OrderedList => "ol",
                    _ => "ul",
                };
                out.push('<');
                out.push_str(tag);
                out.push('>');
                for item in items {
                    out.push_str("<li>");
                    inlines_to_html(item, &mut out);
                    out.push_str("</li>");
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
    out
}
