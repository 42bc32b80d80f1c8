use std::ops::Range;

use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use super::tree::{Block, BlockKind, Document, Inline, ListItem, SourcePos, TableCell};

/// Maps byte offsets to 1-based line and character columns.
pub(crate) struct LineIndex<'a> {
    text: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(memchr::memchr_iter(b'\n', text.as_bytes()).map(|i| i + 1));
        Self { text, starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }

    /// `(line, column)` for a byte offset.
    pub(crate) fn locate(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        let line = self.line_of(offset);
        let start = self.starts[line - 1];
        let col = self.text[start..offset].chars().count() + 1;
        (line, col)
    }

    /// Byte offset where the line holding `offset` ends, excluding the newline.
    fn line_end(&self, offset: usize) -> usize {
        let line = self.line_of(offset.min(self.text.len()));
        match self.starts.get(line) {
            Some(next) => next - 1,
            None => self.text.len(),
        }
    }

    fn span(&self, range: &Range<usize>) -> SourcePos {
        let mut end = range.end.min(self.text.len());
        let bytes = self.text.as_bytes();
        while end > range.start && matches!(bytes[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        let (start_line, start_col) = self.locate(range.start);
        let (end_line, end_col) = self.locate(end);
        SourcePos {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Like `span`, but a cell followed only by pipes and blanks reaches the
    /// end of its line.
    fn cell_span(&self, range: &Range<usize>) -> SourcePos {
        let mut pos = self.span(range);
        let end = range.end.min(self.text.len());
        let line_end = self.line_end(end);
        if end <= line_end {
            let rest = &self.text[end..line_end];
            if rest.chars().all(|c| c == '|' || c.is_whitespace()) {
                pos.end_col = self.locate(line_end).1;
            }
        }
        pos
    }
}

enum Frame {
    Quote {
        range: Range<usize>,
        blocks: Vec<Block>,
    },
    Paragraph {
        range: Range<usize>,
        inlines: Vec<Inline>,
    },
    Heading {
        range: Range<usize>,
        level: u8,
        inlines: Vec<Inline>,
    },
    List {
        range: Range<usize>,
        start: Option<u64>,
        items: Vec<ListItem>,
    },
    Item {
        range: Range<usize>,
        inlines: Vec<Inline>,
        blocks: Vec<Block>,
    },
    Table {
        range: Range<usize>,
        alignments: Vec<Alignment>,
        header: Vec<TableCell>,
        rows: Vec<Vec<TableCell>>,
        row: Vec<TableCell>,
        in_head: bool,
    },
    Cell {
        range: Range<usize>,
        inlines: Vec<Inline>,
    },
    Code {
        range: Range<usize>,
        language: Option<String>,
        fenced: bool,
        code: String,
    },
    /// Raw HTML block, kept as literal text.
    Html {
        range: Range<usize>,
        text: String,
    },
    Span {
        kind: SpanKind,
        inlines: Vec<Inline>,
    },
}

enum SpanKind {
    Emphasis,
    Strong,
    Strikethrough,
    Link(String),
}

struct Builder<'a> {
    index: LineIndex<'a>,
    blocks: Vec<Block>,
    stack: Vec<Frame>,
    next_code_index: usize,
}

/// Parses message text into a document tree with source positions.
pub fn parse_document(text: &str) -> Document {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut builder = Builder {
        index: LineIndex::new(text),
        blocks: Vec::new(),
        stack: Vec::new(),
        next_code_index: 0,
    };
    for (event, range) in Parser::new_ext(text, options).into_offset_iter() {
        builder.event(event, range);
    }
    while !builder.stack.is_empty() {
        builder.close();
    }
    Document {
        blocks: builder.blocks,
    }
}

impl Builder<'_> {
    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            Event::Start(tag) => self.open(tag, range),
            Event::End(TagEnd::TableHead) => {
                if let Some(Frame::Table { in_head, .. }) = self.stack.last_mut() {
                    *in_head = false;
                }
            }
            Event::End(TagEnd::TableRow) => {
                if let Some(Frame::Table { rows, row, .. }) = self.stack.last_mut() {
                    rows.push(std::mem::take(row));
                }
            }
            Event::End(end) if opens_frame(end) => self.close(),
            Event::End(_) => {}
            Event::Text(text) => {
                if let Some(Frame::Code { code, .. }) = self.stack.last_mut() {
                    code.push_str(&text);
                } else {
                    self.push_inline(Inline::Text(text.into_string()));
                }
            }
            Event::Code(code) => self.push_inline(Inline::Code(code.into_string())),
            Event::Html(html) => {
                if let Some(Frame::Html { text, .. }) = self.stack.last_mut() {
                    text.push_str(&html);
                } else {
                    self.push_inline(Inline::Text(html.into_string()));
                }
            }
            Event::InlineHtml(html) => self.push_inline(Inline::Text(html.into_string())),
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::HardBreak),
            Event::Rule => {
                let pos = self.index.span(&range);
                self.push_block(Block::new(BlockKind::ThematicBreak, pos));
            }
            _ => {}
        }
    }

    fn open(&mut self, tag: Tag<'_>, range: Range<usize>) {
        let frame = match tag {
            Tag::Paragraph => Frame::Paragraph {
                range,
                inlines: Vec::new(),
            },
            Tag::Heading { level, .. } => Frame::Heading {
                range,
                level: heading_level(level),
                inlines: Vec::new(),
            },
            Tag::BlockQuote(_) => Frame::Quote {
                range,
                blocks: Vec::new(),
            },
            Tag::List(start) => Frame::List {
                range,
                start,
                items: Vec::new(),
            },
            Tag::Item => Frame::Item {
                range,
                inlines: Vec::new(),
                blocks: Vec::new(),
            },
            Tag::Table(alignments) => Frame::Table {
                range,
                alignments,
                header: Vec::new(),
                rows: Vec::new(),
                row: Vec::new(),
                in_head: false,
            },
            Tag::TableHead => {
                if let Some(Frame::Table { in_head, .. }) = self.stack.last_mut() {
                    *in_head = true;
                }
                return;
            }
            Tag::TableRow => return,
            Tag::TableCell => Frame::Cell {
                range,
                inlines: Vec::new(),
            },
            Tag::CodeBlock(kind) => {
                let (language, fenced) = match kind {
                    CodeBlockKind::Indented => (None, false),
                    CodeBlockKind::Fenced(info) => (language_from_info(&info), true),
                };
                Frame::Code {
                    range,
                    language,
                    fenced,
                    code: String::new(),
                }
            }
            Tag::Emphasis => Frame::Span {
                kind: SpanKind::Emphasis,
                inlines: Vec::new(),
            },
            Tag::Strong => Frame::Span {
                kind: SpanKind::Strong,
                inlines: Vec::new(),
            },
            Tag::Strikethrough => Frame::Span {
                kind: SpanKind::Strikethrough,
                inlines: Vec::new(),
            },
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => Frame::Span {
                kind: SpanKind::Link(dest_url.into_string()),
                inlines: Vec::new(),
            },
            Tag::HtmlBlock => Frame::Html {
                range,
                text: String::new(),
            },
            // Everything else (footnotes, metadata) keeps its text in the
            // enclosing node.
            _ => return,
        };
        self.stack.push(frame);
    }

    fn close(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame {
            Frame::Paragraph { range, inlines } => {
                let pos = self.index.span(&range);
                self.push_block(Block::new(BlockKind::Paragraph(inlines), pos));
            }
            Frame::Heading {
                range,
                level,
                inlines,
            } => {
                let pos = self.index.span(&range);
                let kind = BlockKind::Heading {
                    level,
                    content: inlines,
                };
                self.push_block(Block::new(kind, pos));
            }
            Frame::Quote { range, blocks } => {
                let pos = self.index.span(&range);
                self.push_block(Block::new(BlockKind::BlockQuote(blocks), pos));
            }
            Frame::List {
                range,
                start,
                items,
            } => {
                let pos = self.index.span(&range);
                self.push_block(Block::new(BlockKind::List { start, items }, pos));
            }
            Frame::Item {
                range,
                inlines,
                blocks,
            } => {
                let item = ListItem {
                    pos: self.index.span(&range),
                    content: inlines,
                    children: blocks,
                    tail: false,
                };
                if let Some(Frame::List { items, .. }) = self.stack.last_mut() {
                    items.push(item);
                }
            }
            Frame::Table {
                range,
                alignments,
                header,
                mut rows,
                row,
                ..
            } => {
                if !row.is_empty() {
                    rows.push(row);
                }
                let pos = self.index.span(&range);
                let kind = BlockKind::Table {
                    alignments,
                    header,
                    rows,
                };
                self.push_block(Block::new(kind, pos));
            }
            Frame::Cell { range, inlines } => {
                let cell = TableCell {
                    pos: self.index.cell_span(&range),
                    content: inlines,
                    tail: false,
                };
                if let Some(Frame::Table {
                    header,
                    row,
                    in_head,
                    ..
                }) = self.stack.last_mut()
                {
                    if *in_head {
                        header.push(cell);
                    } else {
                        row.push(cell);
                    }
                }
            }
            Frame::Code {
                range,
                language,
                fenced,
                code,
            } => {
                let pos = self.index.span(&range);
                let index = self.next_code_index;
                self.next_code_index += 1;
                let kind = BlockKind::CodeBlock {
                    language,
                    code,
                    fenced,
                    index,
                };
                self.push_block(Block::new(kind, pos));
            }
            Frame::Html { range, text } => {
                let pos = self.index.span(&range);
                let block = Block::new(BlockKind::Paragraph(literal_lines(&text)), pos);
                self.push_block(block);
            }
            Frame::Span { kind, inlines } => {
                let inline = match kind {
                    SpanKind::Emphasis => Inline::Emphasis(inlines),
                    SpanKind::Strong => Inline::Strong(inlines),
                    SpanKind::Strikethrough => Inline::Strikethrough(inlines),
                    SpanKind::Link(dest) => Inline::Link {
                        dest,
                        children: inlines,
                    },
                };
                self.push_inline(inline);
            }
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        match self.stack.last_mut() {
            Some(
                Frame::Paragraph { inlines, .. }
                | Frame::Heading { inlines, .. }
                | Frame::Item { inlines, .. }
                | Frame::Cell { inlines, .. }
                | Frame::Span { inlines, .. },
            ) => inlines.push(inline),
            Some(Frame::Code { code, .. }) => code.push_str(&Inline::plain_text(&[inline])),
            _ => {}
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.stack.last_mut() {
            Some(Frame::Quote { blocks, .. } | Frame::Item { blocks, .. }) => blocks.push(block),
            _ => self.blocks.push(block),
        }
    }
}

fn opens_frame(end: TagEnd) -> bool {
    matches!(
        end,
        TagEnd::Paragraph
            | TagEnd::Heading(_)
            | TagEnd::BlockQuote(_)
            | TagEnd::List(_)
            | TagEnd::Item
            | TagEnd::Table
            | TagEnd::TableCell
            | TagEnd::CodeBlock
            | TagEnd::HtmlBlock
            | TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Link
            | TagEnd::Image
    )
}

/// Raw text as one literal run per line.
fn literal_lines(text: &str) -> Vec<Inline> {
    let mut inlines = Vec::new();
    for (i, line) in text.trim_end_matches(['\n', '\r']).lines().enumerate() {
        if i > 0 {
            inlines.push(Inline::HardBreak);
        }
        inlines.push(Inline::Text(line.to_string()));
    }
    inlines
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// First word of a fence info string, if any.
fn language_from_info(info: &str) -> Option<String> {
    info.split_ascii_whitespace()
        .next()
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}
