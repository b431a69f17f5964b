//! Terminal output for the chat client.
//!
//! Streamed text is echoed verbatim as it arrives.  Settled replies can be re-rendered from
//! their markup into styled blocks with [`format_blocks`].

use std::io::{self, Stdout, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Error;
use crate::markup::{self, unescape_html};
use crate::observer::{ReplyObserver, StderrObserver};
use crate::store::{Session, SessionId};
use crate::types::{DisplayBlock, Inline, Turn, inline_text};

/// ANSI escape code for bold text (used for emphasis and headings).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for session metadata).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the user's turns).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
pub trait Renderer: Send {
    /// Called with each piece of streamed reply text.
    fn print_chunk(&mut self, text: &str);

    /// Called once a reply has settled.
    fn finish_reply(&mut self);

    /// Prints one turn with its markup rendered.
    fn print_turn(&mut self, turn: &Turn);

    /// Prints an informational message.
    fn print_info(&mut self, text: &str);

    /// Prints an error message.
    fn print_error(&mut self, text: &str);

    /// Prints the session list, marking the active session.
    fn print_sessions(&mut self, sessions: &[Arc<Session>], active: Option<SessionId>);
}

/// Formats rendered blocks for a terminal.
///
/// Escaped entities are decoded back to the characters they stand for.  Bold spans and
/// headings are styled when `use_color` is set; without color, headings keep their colon and
/// bold spans are printed as plain text.
pub fn format_blocks(blocks: &[DisplayBlock], use_color: bool) -> String {
    let mut out = String::new();
    for (idx, block) in blocks.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        match block {
            DisplayBlock::Paragraph(inlines) => {
                format_inlines(&mut out, inlines, use_color, "");
                out.push('\n');
            }
            DisplayBlock::Heading(title) => {
                let title = unescape_html(title);
                if use_color {
                    out.push_str(&format!("{ANSI_BOLD}{title}{ANSI_RESET}\n"));
                } else {
                    out.push_str(&format!("{title}:\n"));
                }
            }
            DisplayBlock::UnorderedList(items) => {
                for item in items {
                    out.push_str("  • ");
                    format_inlines(&mut out, item, use_color, "    ");
                    out.push('\n');
                }
            }
            DisplayBlock::OrderedList(items) => {
                for (number, item) in items.iter().enumerate() {
                    let marker = format!("  {}. ", number + 1);
                    let indent = " ".repeat(marker.len());
                    out.push_str(&marker);
                    format_inlines(&mut out, item, use_color, &indent);
                    out.push('\n');
                }
            }
        }
    }
    out
}

fn format_inlines(out: &mut String, inlines: &[Inline], use_color: bool, indent: &str) {
    if !use_color {
        let text = unescape_html(&inline_text(inlines));
        out.push_str(&text.replace('\n', &format!("\n{indent}")));
        return;
    }
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&unescape_html(text)),
            Inline::Bold(text) => {
                out.push_str(ANSI_BOLD);
                out.push_str(&unescape_html(text));
                out.push_str(ANSI_RESET);
            }
            Inline::LineBreak => {
                out.push('\n');
                out.push_str(indent);
            }
        }
    }
}

/// A renderer that writes to stdout with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    line_start: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            line_start: true,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn styled(&self, style: &str, text: &str) -> String {
        if self.use_color {
            format!("{style}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_chunk(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        print!("{text}");
        self.line_start = text.ends_with('\n');
        self.flush();
    }

    fn finish_reply(&mut self) {
        if !self.line_start {
            println!();
            self.line_start = true;
        }
        self.flush();
    }

    fn print_turn(&mut self, turn: &Turn) {
        if turn.is_user() {
            println!("{}", self.styled(ANSI_CYAN, &format!("> {}", turn.text)));
        } else {
            print!("{}", format_blocks(&markup::render(&turn.text), self.use_color));
        }
        self.line_start = true;
        self.flush();
    }

    fn print_info(&mut self, text: &str) {
        println!("{}", self.styled(ANSI_DIM, text));
        self.line_start = true;
        self.flush();
    }

    fn print_error(&mut self, text: &str) {
        eprintln!("{}", self.styled(ANSI_RED, text));
    }

    fn print_sessions(&mut self, sessions: &[Arc<Session>], active: Option<SessionId>) {
        for session in sessions {
            let marker = if Some(session.id()) == active { "*" } else { " " };
            let turns = self.styled(
                ANSI_DIM,
                &format!("({} turns)", session.transcript().len()),
            );
            println!("{marker} {:>3}  {}  {turns}", session.id(), session.name());
        }
        self.line_start = true;
        self.flush();
    }
}

/// Line printed when a stream dies and the one-shot request takes over.
pub const RETRY_NOTICE: &str = "(stream interrupted, retrying)";

/// A [`ReplyObserver`] that echoes streamed text through a shared [`Renderer`].
///
/// When the stream fails part way, the partial text is closed off with [`RETRY_NOTICE`] so the
/// settled reply printed afterwards is not mistaken for its continuation.
pub struct RenderingObserver<R: Renderer> {
    renderer: Arc<Mutex<R>>,
    verbose: bool,
}

impl<R: Renderer> RenderingObserver<R> {
    pub fn new(renderer: Arc<Mutex<R>>, verbose: bool) -> Self {
        Self { renderer, verbose }
    }

    fn renderer(&self) -> MutexGuard<'_, R> {
        self.renderer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: Renderer> ReplyObserver for RenderingObserver<R> {
    fn on_chunk(&self, _: SessionId, text: &str) {
        self.renderer().print_chunk(text);
    }

    fn on_stream_unavailable(&self, session_id: SessionId, error: &Error) {
        {
            let mut renderer = self.renderer();
            renderer.finish_reply();
            renderer.print_info(RETRY_NOTICE);
        }
        if self.verbose {
            StderrObserver.on_stream_unavailable(session_id, error);
        }
    }

    fn on_fallback_failure(&self, session_id: SessionId, error: &Error) {
        if self.verbose {
            StderrObserver.on_fallback_failure(session_id, error);
        }
    }

    fn on_cancelled(&self, session_id: SessionId) {
        if self.verbose {
            StderrObserver.on_cancelled(session_id);
        }
    }
}
