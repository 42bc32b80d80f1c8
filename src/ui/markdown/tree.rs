//! Document tree produced from message text.

use pulldown_cmark::Alignment;

/// Source span of a node. Lines and columns are 1-based; columns count
/// characters and `end_col` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePos {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link { dest: String, children: Vec<Inline> },
    SoftBreak,
    HardBreak,
}

impl Inline {
    /// Plain text with formatting stripped.
    pub fn plain_text(inlines: &[Inline]) -> String {
        let mut out = String::new();
        for inline in inlines {
            match inline {
                Inline::Text(text) | Inline::Code(text) => out.push_str(text),
                Inline::Emphasis(children)
                | Inline::Strong(children)
                | Inline::Strikethrough(children)
                | Inline::Link { children, .. } => out.push_str(&Inline::plain_text(children)),
                Inline::SoftBreak => out.push(' '),
                Inline::HardBreak => out.push('\n'),
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub pos: SourcePos,
    /// Inline content directly in the item (tight lists).
    pub content: Vec<Inline>,
    pub children: Vec<Block>,
    pub tail: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    pub pos: SourcePos,
    pub content: Vec<Inline>,
    pub tail: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Paragraph(Vec<Inline>),
    Heading {
        level: u8,
        content: Vec<Inline>,
    },
    List {
        start: Option<u64>,
        items: Vec<ListItem>,
    },
    BlockQuote(Vec<Block>),
    Table {
        alignments: Vec<Alignment>,
        header: Vec<TableCell>,
        rows: Vec<Vec<TableCell>>,
    },
    CodeBlock {
        language: Option<String>,
        code: String,
        fenced: bool,
        /// Position among the message's code blocks, in document order.
        index: usize,
    },
    ThematicBreak,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub pos: SourcePos,
    pub tail: bool,
}

impl Block {
    pub fn new(kind: BlockKind, pos: SourcePos) -> Self {
        Self {
            kind,
            pos,
            tail: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
}

/// A fenced or indented code block, as offered for copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlockRef<'a> {
    pub index: usize,
    pub language: Option<&'a str>,
    pub code: &'a str,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn code_blocks(&self) -> Vec<CodeBlockRef<'_>> {
        let mut out = Vec::new();
        collect_code_blocks(&self.blocks, &mut out);
        out
    }

    pub fn tail_count(&self) -> usize {
        let mut count = 0;
        for_each_tail_flag(&self.blocks, &mut |flag| count += usize::from(flag));
        count
    }
}

fn collect_code_blocks<'a>(blocks: &'a [Block], out: &mut Vec<CodeBlockRef<'a>>) {
    for block in blocks {
        match &block.kind {
            BlockKind::CodeBlock {
                language,
                code,
                index,
                ..
            } => out.push(CodeBlockRef {
                index: *index,
                language: language.as_deref(),
                code,
            }),
            BlockKind::List { items, .. } => {
                for item in items {
                    collect_code_blocks(&item.children, out);
                }
            }
            BlockKind::BlockQuote(children) => collect_code_blocks(children, out),
            _ => {}
        }
    }
}

fn for_each_tail_flag(blocks: &[Block], visit: &mut impl FnMut(bool)) {
    for block in blocks {
        visit(block.tail);
        match &block.kind {
            BlockKind::List { items, .. } => {
                for item in items {
                    visit(item.tail);
                    for_each_tail_flag(&item.children, visit);
                }
            }
            BlockKind::BlockQuote(children) => for_each_tail_flag(children, visit),
            BlockKind::Table { header, rows, .. } => {
                for cell in header.iter().chain(rows.iter().flatten()) {
                    visit(cell.tail);
                }
            }
            _ => {}
        }
    }
}
