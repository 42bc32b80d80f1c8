use pulldown_cmark::Alignment;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use super::code::{code_body_lines, code_header_line, CopyFeedback};
use super::tree::{Block, BlockKind, Document, Inline, ListItem, TableCell};
use super::wrap::wrap_spans;
use crate::core::message::MessageId;
use crate::ui::theme::Theme;

const RULE_MAX_WIDTH: usize = 40;
const BULLETS: [&str; 3] = ["•", "◦", "▪"];

/// The live cursor drawn at the tail node of a streaming reply.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    pub glyph: &'a str,
    /// Blink phase; a hidden cursor still takes its cell.
    pub visible: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions<'a> {
    pub theme: &'a Theme,
    pub base_style: Style,
    pub syntax_highlighting: bool,
    pub cursor: Option<Cursor<'a>>,
    pub message_id: Option<&'a MessageId>,
    pub copied: Option<&'a CopyFeedback>,
    /// Wrap width in cells; zero disables wrapping.
    pub width: usize,
}

impl<'a> RenderOptions<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self {
            theme,
            base_style: theme.bot_text_style,
            syntax_highlighting: true,
            cursor: None,
            message_id: None,
            copied: None,
            width: 0,
        }
    }

    fn cursor_span(&self) -> Option<Span<'static>> {
        self.cursor.map(|cursor| {
            if cursor.visible {
                Span::styled(cursor.glyph.to_string(), self.theme.cursor_style)
            } else {
                Span::raw(" ".repeat(cursor.glyph.width().max(1)))
            }
        })
    }

    fn is_copied(&self, block_index: usize) -> bool {
        match (self.copied, self.message_id) {
            (Some(feedback), Some(id)) => feedback.applies_to(id, block_index),
            _ => false,
        }
    }
}

/// Line prefixes for nested content: one for the first emitted line, one
/// for every line after it.
#[derive(Clone, Default)]
struct Prefix {
    first: Vec<Span<'static>>,
    rest: Vec<Span<'static>>,
}

impl Prefix {
    fn uniform(spans: Vec<Span<'static>>) -> Self {
        Self {
            first: spans.clone(),
            rest: spans,
        }
    }

    fn width(&self) -> usize {
        self.first.iter().map(|s| s.content.width()).sum()
    }

    fn continuation(&self) -> Self {
        Self::uniform(self.rest.clone())
    }

    fn extend(&self, first: Span<'static>, rest: Span<'static>) -> Self {
        let mut out = self.clone();
        out.first.push(first);
        out.rest.push(rest);
        out
    }
}

pub fn render_document(doc: &Document, opts: &RenderOptions<'_>) -> Vec<Line<'static>> {
    let mut renderer = MarkdownRenderer {
        opts,
        lines: Vec::new(),
        list_depth: 0,
    };
    renderer.blocks(&doc.blocks, &Prefix::default(), opts.base_style, true);
    renderer.lines
}

struct MarkdownRenderer<'o, 'a> {
    opts: &'o RenderOptions<'a>,
    lines: Vec<Line<'static>>,
    list_depth: usize,
}

impl MarkdownRenderer<'_, '_> {
    fn blocks(&mut self, blocks: &[Block], prefix: &Prefix, base: Style, spaced: bool) {
        for (i, block) in blocks.iter().enumerate() {
            let prefix = if i == 0 {
                prefix.clone()
            } else {
                if spaced {
                    self.lines.push(Line::from(prefix.rest.clone()));
                }
                prefix.continuation()
            };
            self.block(block, &prefix, base);
        }
    }

    fn block(&mut self, block: &Block, prefix: &Prefix, base: Style) {
        let theme = self.opts.theme;
        match &block.kind {
            BlockKind::Paragraph(inlines) => self.inline_block(inlines, prefix, base, block.tail),
            BlockKind::Heading { content, .. } => {
                self.inline_block(content, prefix, base.patch(theme.md_heading_style), block.tail)
            }
            BlockKind::List { start, items } => self.list(*start, items, prefix, base),
            BlockKind::BlockQuote(children) => {
                let bar = Span::styled("│ ", theme.md_quote_style);
                let inner = prefix.extend(bar.clone(), bar);
                self.blocks(children, &inner, base.patch(theme.md_quote_style), true);
            }
            BlockKind::Table {
                alignments,
                header,
                rows,
            } => self.table(alignments, header, rows, prefix),
            BlockKind::CodeBlock {
                language,
                code,
                index,
                ..
            } => self.code_block(language.as_deref(), code, *index, prefix, block.tail),
            BlockKind::ThematicBreak => {
                let avail = self.available(prefix).min(RULE_MAX_WIDTH).max(3);
                let mut spans = prefix.first.clone();
                spans.push(Span::styled("─".repeat(avail), theme.md_rule_style));
                self.lines.push(Line::from(spans));
            }
        }
    }

    fn available(&self, prefix: &Prefix) -> usize {
        if self.opts.width == 0 {
            return 0;
        }
        self.opts.width.saturating_sub(prefix.width()).max(1)
    }

    fn inline_block(&mut self, inlines: &[Inline], prefix: &Prefix, style: Style, tail: bool) {
        let mut logical: Vec<Vec<Span<'static>>> = vec![Vec::new()];
        push_inlines(inlines, style, self.opts.theme, &mut logical);
        if tail {
            if let (Some(last), Some(cursor)) = (logical.last_mut(), self.opts.cursor_span()) {
                last.push(cursor);
            }
        }

        let width = self.available(prefix);
        let mut first = true;
        for line in logical {
            for wrapped in wrap_spans(line, width) {
                let mut spans = if first {
                    prefix.first.clone()
                } else {
                    prefix.rest.clone()
                };
                first = false;
                spans.extend(wrapped);
                self.lines.push(Line::from(spans));
            }
        }
    }

    fn list(&mut self, start: Option<u64>, items: &[ListItem], prefix: &Prefix, base: Style) {
        let theme = self.opts.theme;
        let bullet = BULLETS[self.list_depth % BULLETS.len()];
        self.list_depth += 1;
        for (i, item) in items.iter().enumerate() {
            let marker = match start {
                Some(n) => format!("{}. ", n + i as u64),
                None => format!("{bullet} "),
            };
            let hang = " ".repeat(marker.width());
            let item_prefix = if i == 0 {
                prefix.clone()
            } else {
                prefix.continuation()
            };
            let inner = item_prefix.extend(
                Span::styled(marker, theme.md_list_marker_style),
                Span::raw(hang),
            );

            if item.content.is_empty() {
                self.blocks(&item.children, &inner, base, false);
            } else {
                self.inline_block(&item.content, &inner, base, item.tail);
                self.blocks(&item.children, &inner.continuation(), base, false);
            }
        }
        self.list_depth -= 1;
    }

    fn table(
        &mut self,
        alignments: &[Alignment],
        header: &[TableCell],
        rows: &[Vec<TableCell>],
        prefix: &Prefix,
    ) {
        let theme = self.opts.theme;
        let cursor = self.opts.cursor_span();
        let cell_text = |cell: &TableCell| -> String {
            let mut text = Inline::plain_text(&cell.content);
            if cell.tail {
                if let Some(cursor) = &cursor {
                    text.push_str(&cursor.content);
                }
            }
            text
        };

        let header_text: Vec<String> = header.iter().map(cell_text).collect();
        let body_text: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        let columns = body_text
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(header_text.len()))
            .max()
            .unwrap_or(0);
        if columns == 0 {
            return;
        }

        let mut widths = vec![1usize; columns];
        for row in std::iter::once(&header_text).chain(body_text.iter()) {
            for (col, text) in row.iter().enumerate() {
                widths[col] = widths[col].max(text.width());
            }
        }

        let border = theme.md_table_border_style;
        let rule = |left: &str, mid: &str, right: &str| -> Span<'static> {
            let body: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            Span::styled(format!("{left}{}{right}", body.join(mid)), border)
        };

        let mut emitted = 0usize;
        let mut emit = |lines: &mut Vec<Line<'static>>, row: Vec<Span<'static>>| {
            let mut spans = if emitted == 0 {
                prefix.first.clone()
            } else {
                prefix.rest.clone()
            };
            emitted += 1;
            spans.extend(row);
            lines.push(Line::from(spans));
        };

        let row_spans = |cells: &[String], style: Style| -> Vec<Span<'static>> {
            let mut spans = vec![Span::styled("│", border)];
            for col in 0..columns {
                let text = cells.get(col).map(String::as_str).unwrap_or("");
                let align = alignments.get(col).copied().unwrap_or(Alignment::None);
                spans.push(Span::styled(
                    format!(" {} ", pad(text, widths[col], align)),
                    style,
                ));
                spans.push(Span::styled("│", border));
            }
            spans
        };

        emit(&mut self.lines, vec![rule("┌", "┬", "┐")]);
        emit(
            &mut self.lines,
            row_spans(&header_text, self.opts.base_style.patch(theme.md_table_header_style)),
        );
        emit(&mut self.lines, vec![rule("├", "┼", "┤")]);
        for row in &body_text {
            emit(&mut self.lines, row_spans(row, self.opts.base_style));
        }
        emit(&mut self.lines, vec![rule("└", "┴", "┘")]);
    }

    fn code_block(
        &mut self,
        language: Option<&str>,
        code: &str,
        index: usize,
        prefix: &Prefix,
        tail: bool,
    ) {
        let theme = self.opts.theme;
        let header = code_header_line(language, self.opts.is_copied(index), theme);
        let mut body = code_body_lines(code, language, self.opts.syntax_highlighting, theme);
        let cursor = if tail { self.opts.cursor_span() } else { None };
        if let Some(cursor) = cursor {
            match body.last_mut() {
                Some(last) => last.spans.push(cursor),
                None => body.push(Line::from(cursor)),
            }
        } else if body.is_empty() && header.is_none() {
            body.push(Line::default());
        }
        for (row, mut line) in header.into_iter().chain(body).enumerate() {
            let lead = if row == 0 { &prefix.first } else { &prefix.rest };
            let mut spans = lead.clone();
            spans.append(&mut line.spans);
            line.spans = spans;
            self.lines.push(line);
        }
    }
}

fn push_inlines(
    inlines: &[Inline],
    style: Style,
    theme: &Theme,
    lines: &mut Vec<Vec<Span<'static>>>,
) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => push_span(lines, Span::styled(text.clone(), style)),
            Inline::Code(code) => push_span(
                lines,
                Span::styled(code.clone(), style.patch(theme.md_inline_code_style)),
            ),
            Inline::Emphasis(children) => {
                push_inlines(children, style.add_modifier(Modifier::ITALIC), theme, lines)
            }
            Inline::Strong(children) => {
                push_inlines(children, style.add_modifier(Modifier::BOLD), theme, lines)
            }
            Inline::Strikethrough(children) => push_inlines(
                children,
                style.add_modifier(Modifier::CROSSED_OUT),
                theme,
                lines,
            ),
            Inline::Link { dest, children } => {
                push_inlines(children, style.patch(theme.md_link_style), theme, lines);
                if Inline::plain_text(children) != *dest {
                    push_span(
                        lines,
                        Span::styled(format!(" ({dest})"), theme.md_rule_style),
                    );
                }
            }
            Inline::SoftBreak => push_span(lines, Span::styled(" ", style)),
            Inline::HardBreak => lines.push(Vec::new()),
        }
    }
}

fn push_span(lines: &mut Vec<Vec<Span<'static>>>, span: Span<'static>) {
    match lines.last_mut() {
        Some(line) => line.push(span),
        None => lines.push(vec![span]),
    }
}

fn pad(text: &str, width: usize, align: Alignment) -> String {
    let gap = width.saturating_sub(text.width());
    match align {
        Alignment::Right => format!("{}{text}", " ".repeat(gap)),
        Alignment::Center => {
            let left = gap / 2;
            format!("{}{text}{}", " ".repeat(left), " ".repeat(gap - left))
        }
        Alignment::Left | Alignment::None => format!("{text}{}", " ".repeat(gap)),
    }
}
