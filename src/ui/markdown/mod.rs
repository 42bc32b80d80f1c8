//! Markdown rendering for chat replies.
//!
//! Text is parsed into a [`Document`] with source positions, the node at
//! the streaming edge is marked (see [`tail`]), and the tree is drawn into
//! ratatui lines.

mod code;
mod parser;
mod render;
pub mod tail;
mod tree;
mod wrap;

use ratatui::text::{Line, Span};

pub use code::CopyFeedback;
pub use parser::parse_document;
pub use render::{render_document, Cursor, RenderOptions};
pub use tail::{is_tail, mark_tail, RenderPosition, TailProbe};
pub use tree::{Block, BlockKind, CodeBlockRef, Document, Inline, ListItem, SourcePos, TableCell};

pub(crate) use wrap::wrap_spans;

/// Parses `text` and, while it is still streaming, marks its tail node.
pub fn parse_and_mark(text: &str, streaming: bool) -> Document {
    let mut doc = parse_document(text);
    if streaming {
        mark_tail(&mut doc, &RenderPosition::of(text));
    }
    doc
}

/// Renders message text. With a cursor set, the cursor is drawn after the
/// tail node; an empty reply shows the cursor alone.
pub fn render_markdown(text: &str, opts: &RenderOptions<'_>) -> Vec<Line<'static>> {
    let doc = parse_and_mark(text, opts.cursor.is_some());
    if doc.is_empty() {
        return match opts.cursor {
            Some(cursor) if cursor.visible => vec![Line::from(Span::styled(
                cursor.glyph.to_string(),
                opts.theme.cursor_style,
            ))],
            Some(_) => vec![Line::from(" ")],
            None => Vec::new(),
        };
    }
    render_document(&doc, opts)
}
