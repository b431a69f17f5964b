/// A run of inline content inside a block.
///
/// Text is stored HTML-escaped: `&`, `<` and `>` appear as `&amp;`, `&lt;` and `&gt;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    /// Plain (escaped) text.
    Text(String),

    /// Bold (escaped) text, written `**like this**` in the source.
    Bold(String),

    /// An explicit line break between two source lines of one paragraph.
    LineBreak,
}

/// The kind of a [`DisplayBlock`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// A paragraph of one or more lines.
    Paragraph,
    /// A `**Heading**:` line.
    Heading,
    /// A run of `-` or `•` items.
    UnorderedList,
    /// A run of `1.` or `1)` items.
    OrderedList,
}

/// A structural unit of rendered reply text.
///
/// Blocks are derived from a turn's text every time it is displayed and are never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayBlock {
    /// Consecutive plain lines, joined by [`Inline::LineBreak`].
    Paragraph(Vec<Inline>),

    /// The inner text of a bold span that stood alone before a colon.
    Heading(String),

    /// Items of a bulleted list.
    UnorderedList(Vec<Vec<Inline>>),

    /// Items of a numbered list.
    OrderedList(Vec<Vec<Inline>>),
}

impl DisplayBlock {
    /// Returns the kind of this block.
    pub fn kind(&self) -> BlockKind {
        match self {
            DisplayBlock::Paragraph(_) => BlockKind::Paragraph,
            DisplayBlock::Heading(_) => BlockKind::Heading,
            DisplayBlock::UnorderedList(_) => BlockKind::UnorderedList,
            DisplayBlock::OrderedList(_) => BlockKind::OrderedList,
        }
    }

    /// Returns the list items of a list block, or `None` for other kinds.
    pub fn items(&self) -> Option<&[Vec<Inline>]> {
        match self {
            DisplayBlock::UnorderedList(items) | DisplayBlock::OrderedList(items) => Some(items),
            _ => None,
        }
    }
}

/// Concatenates the text of inline runs, rendering line breaks as `\n` and dropping emphasis.
pub fn inline_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) | Inline::Bold(text) => out.push_str(text),
            Inline::LineBreak => out.push('\n'),
        }
    }
    out
}
