//! Finds the node that ends at the streaming edge of the text.
//!
//! A reply is re-parsed on every chunk. The node whose source reaches the
//! last line of the text is where the live cursor is drawn; only one node
//! ever qualifies.

use super::tree::{Block, BlockKind, Document, SourcePos};

/// Where the text currently ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPosition {
    /// Number of `\n` plus one.
    pub line_count: usize,
    /// Characters on the last line plus one: the column just past the text.
    pub last_line_columns: usize,
}

impl RenderPosition {
    pub fn of(text: &str) -> Self {
        let line_count = memchr::memchr_iter(b'\n', text.as_bytes()).count() + 1;
        let last_line = text.rsplit('\n').next().unwrap_or("");
        Self {
            line_count,
            last_line_columns: last_line.chars().count() + 1,
        }
    }
}

/// A node as seen by the tail predicate.
#[derive(Debug, Clone, Copy)]
pub enum TailProbe {
    Paragraph(SourcePos),
    Heading(SourcePos),
    /// Only items with inline content of their own are probed.
    ListItem(SourcePos),
    TableCell(SourcePos),
    CodeBlock {
        pos: SourcePos,
        rows: usize,
        fenced: bool,
    },
}

pub fn is_tail(probe: TailProbe, at: &RenderPosition) -> bool {
    match probe {
        TailProbe::Paragraph(pos) | TailProbe::Heading(pos) | TailProbe::ListItem(pos) => {
            pos.start_line == at.line_count
        }
        TailProbe::TableCell(pos) => {
            pos.start_line == at.line_count && pos.end_col == at.last_line_columns
        }
        // The opening fence takes a line of its own.
        TailProbe::CodeBlock {
            pos,
            rows,
            fenced: true,
        } => pos.start_line + rows == at.line_count,
        TailProbe::CodeBlock {
            pos,
            rows,
            fenced: false,
        } => rows > 0 && pos.start_line + rows - 1 == at.line_count,
    }
}

/// Path to a flag inside the tree.
#[derive(Debug, Clone)]
enum Slot {
    Block(Vec<usize>),
    Item(Vec<usize>, usize),
    HeaderCell(Vec<usize>, usize),
    BodyCell(Vec<usize>, usize, usize),
}

/// Clears every tail flag, then sets the flag on the last node in document
/// order that satisfies `is_tail`. Returns whether a node was marked.
pub fn mark_tail(doc: &mut Document, at: &RenderPosition) -> bool {
    clear_flags(&mut doc.blocks);
    let mut last = None;
    find_last(&doc.blocks, &mut Vec::new(), at, &mut last);
    match last {
        Some(slot) => {
            set_flag(&mut doc.blocks, &slot);
            true
        }
        None => false,
    }
}

fn probe_for(block: &Block) -> Option<TailProbe> {
    match &block.kind {
        BlockKind::Paragraph(_) => Some(TailProbe::Paragraph(block.pos)),
        BlockKind::Heading { .. } => Some(TailProbe::Heading(block.pos)),
        BlockKind::CodeBlock { code, fenced, .. } => Some(TailProbe::CodeBlock {
            pos: block.pos,
            rows: code.lines().count(),
            fenced: *fenced,
        }),
        _ => None,
    }
}

fn find_last(
    blocks: &[Block],
    path: &mut Vec<usize>,
    at: &RenderPosition,
    last: &mut Option<Slot>,
) {
    for (i, block) in blocks.iter().enumerate() {
        path.push(i);
        if probe_for(block).is_some_and(|probe| is_tail(probe, at)) {
            *last = Some(Slot::Block(path.clone()));
        }
        match &block.kind {
            BlockKind::List { items, .. } => {
                for (j, item) in items.iter().enumerate() {
                    if !item.content.is_empty() && is_tail(TailProbe::ListItem(item.pos), at) {
                        *last = Some(Slot::Item(path.clone(), j));
                    }
                    path.push(j);
                    find_last(&item.children, path, at, last);
                    path.pop();
                }
            }
            BlockKind::BlockQuote(children) => find_last(children, path, at, last),
            BlockKind::Table { header, rows, .. } => {
                for (c, cell) in header.iter().enumerate() {
                    if is_tail(TailProbe::TableCell(cell.pos), at) {
                        *last = Some(Slot::HeaderCell(path.clone(), c));
                    }
                }
                for (r, row) in rows.iter().enumerate() {
                    for (c, cell) in row.iter().enumerate() {
                        if is_tail(TailProbe::TableCell(cell.pos), at) {
                            *last = Some(Slot::BodyCell(path.clone(), r, c));
                        }
                    }
                }
            }
            _ => {}
        }
        path.pop();
    }
}

fn clear_flags(blocks: &mut [Block]) {
    for block in blocks {
        block.tail = false;
        match &mut block.kind {
            BlockKind::List { items, .. } => {
                for item in items {
                    item.tail = false;
                    clear_flags(&mut item.children);
                }
            }
            BlockKind::BlockQuote(children) => clear_flags(children),
            BlockKind::Table { header, rows, .. } => {
                for cell in header.iter_mut().chain(rows.iter_mut().flatten()) {
                    cell.tail = false;
                }
            }
            _ => {}
        }
    }
}

/// Resolves a block path. Paths alternate block index and, inside lists,
/// item index.
fn block_at<'a>(blocks: &'a mut [Block], path: &[usize]) -> Option<&'a mut Block> {
    let (&first, rest) = path.split_first()?;
    let block = blocks.get_mut(first)?;
    if rest.is_empty() {
        return Some(block);
    }
    match &mut block.kind {
        BlockKind::List { items, .. } => {
            let (&item, rest) = rest.split_first()?;
            block_at(&mut items.get_mut(item)?.children, rest)
        }
        BlockKind::BlockQuote(children) => block_at(children, rest),
        _ => None,
    }
}

fn set_flag(blocks: &mut [Block], slot: &Slot) {
    match slot {
        Slot::Block(path) => {
            if let Some(block) = block_at(blocks, path) {
                block.tail = true;
            }
        }
        Slot::Item(path, item) => {
            if let Some(Block {
                kind: BlockKind::List { items, .. },
                ..
            }) = block_at(blocks, path)
            {
                if let Some(item) = items.get_mut(*item) {
                    item.tail = true;
                }
            }
        }
        Slot::HeaderCell(path, col) => {
            if let Some(Block {
                kind: BlockKind::Table { header, .. },
                ..
            }) = block_at(blocks, path)
            {
                if let Some(cell) = header.get_mut(*col) {
                    cell.tail = true;
                }
            }
        }
        Slot::BodyCell(path, row, col) => {
            if let Some(Block {
                kind: BlockKind::Table { rows, .. },
                ..
            }) = block_at(blocks, path)
            {
                if let Some(cell) = rows.get_mut(*row).and_then(|r| r.get_mut(*col)) {
                    cell.tail = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::markdown::parser::parse_document;
    use crate::ui::markdown::tree::ListItem;

    fn marked(text: &str) -> Document {
        let mut doc = parse_document(text);
        mark_tail(&mut doc, &RenderPosition::of(text));
        doc
    }

    fn tail_item(doc: &Document) -> Option<&ListItem> {
        fn walk(blocks: &[Block]) -> Option<&ListItem> {
            let mut found = None;
            for block in blocks {
                if let BlockKind::List { items, .. } = &block.kind {
                    for item in items {
                        if item.tail {
                            found = Some(item);
                        }
                        if let Some(inner) = walk(&item.children) {
                            found = Some(inner);
                        }
                    }
                }
            }
            found
        }
        walk(&doc.blocks)
    }

    #[test]
    fn render_position_counts_lines_and_columns() {
        assert_eq!(
            RenderPosition::of(""),
            RenderPosition {
                line_count: 1,
                last_line_columns: 1
            }
        );
        assert_eq!(
            RenderPosition::of("ab\ncdé"),
            RenderPosition {
                line_count: 2,
                last_line_columns: 4
            }
        );
        assert_eq!(
            RenderPosition::of("ab\n"),
            RenderPosition {
                line_count: 2,
                last_line_columns: 1
            }
        );
    }

    #[test]
    fn last_paragraph_is_the_tail() {
        let doc = marked("first\n\nsecond");
        assert!(!doc.blocks[0].tail);
        assert!(doc.blocks[1].tail);
        assert_eq!(doc.tail_count(), 1);
    }

    #[test]
    fn blank_trailing_line_has_no_tail() {
        let doc = marked("first\n\nsecond\n\n");
        assert_eq!(doc.tail_count(), 0);
    }

    #[test]
    fn heading_on_the_last_line_is_the_tail() {
        let doc = marked("intro\n\n## Steps");
        assert!(doc.blocks[1].tail);
    }

    #[test]
    fn nested_list_item_wins_over_its_parent() {
        let doc = marked("- one\n- two\n  - three");
        let item = tail_item(&doc).expect("an item is marked");
        assert_eq!(item.pos.start_line, 3);
        assert_eq!(doc.tail_count(), 1);
    }

    #[test]
    fn loose_list_marks_the_paragraph_not_the_item() {
        let doc = marked("- one\n\n- two");
        assert!(tail_item(&doc).is_none());
        assert_eq!(doc.tail_count(), 1);
    }

    #[test]
    fn only_the_final_table_cell_is_marked() {
        let doc = marked("| a | b |\n|---|---|\n| 1 | 2 |");
        let BlockKind::Table { rows, header, .. } = &doc.blocks[0].kind else {
            panic!("expected a table");
        };
        assert!(header.iter().all(|cell| !cell.tail));
        assert!(!rows[0][0].tail);
        assert!(rows[0][1].tail);
        assert_eq!(doc.tail_count(), 1);
    }

    #[test]
    fn open_fence_is_the_tail_while_code_streams() {
        let doc = marked("Here:\n\n```rust\nfn main() {\n    run();");
        let block = &doc.blocks[1];
        assert!(matches!(block.kind, BlockKind::CodeBlock { .. }));
        assert!(block.tail);
    }

    #[test]
    fn empty_open_fence_is_the_tail() {
        let doc = marked("```python");
        assert!(doc.blocks[0].tail);
    }

    #[test]
    fn closed_fence_is_not_the_tail() {
        let doc = marked("```sh\nls\n```");
        assert_eq!(doc.tail_count(), 0);
    }

    #[test]
    fn marking_twice_keeps_a_single_flag() {
        let text = "a\n\nb";
        let mut doc = parse_document(text);
        mark_tail(&mut doc, &RenderPosition::of("a"));
        mark_tail(&mut doc, &RenderPosition::of(text));
        assert_eq!(doc.tail_count(), 1);
        assert!(doc.blocks[1].tail);
    }

    #[test]
    fn quoted_paragraph_can_be_the_tail() {
        let doc = marked("> quoted\n> more");
        let BlockKind::BlockQuote(children) = &doc.blocks[0].kind else {
            panic!("expected a quote");
        };
        assert!(children[0].tail);
        assert_eq!(doc.tail_count(), 1);
        let doc = marked("> one\n>\n> two");
        assert_eq!(doc.tail_count(), 1);
    }

    #[test]
    fn streaming_html_block_stays_visible_and_carries_the_tail() {
        for text in ["Wrap it:\n\n<div", "Wrap it:\n\n<div class=\"box\">\nhel"] {
            let doc = marked(text);
            assert_eq!(doc.blocks.len(), 2, "html dropped for {text:?}");
            assert!(doc.blocks[1].tail, "no tail for {text:?}");
            assert_eq!(doc.tail_count(), 1);
        }
    }
}
