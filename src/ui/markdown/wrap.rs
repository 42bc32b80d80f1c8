use ratatui::style::Style;
use ratatui::text::Span;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Greedy word wrap over styled spans. Words wider than `width` are split
/// by character. A `width` of zero disables wrapping.
pub(crate) fn wrap_spans(spans: Vec<Span<'static>>, width: usize) -> Vec<Vec<Span<'static>>> {
    if width == 0 {
        return vec![spans];
    }

    let mut lines: Vec<Vec<Span<'static>>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut used = 0usize;

    for (piece, style) in pieces(&spans) {
        let is_space = piece.chars().all(char::is_whitespace);
        let piece_width = piece.width();

        if is_space {
            // Spaces at a break point are dropped.
            if used == 0 && !lines.is_empty() {
                continue;
            }
            if used + piece_width > width {
                lines.push(std::mem::take(&mut current));
                used = 0;
                continue;
            }
            push_piece(&mut current, piece, style);
            used += piece_width;
            continue;
        }

        if used + piece_width > width && used > 0 {
            trim_trailing_space(&mut current);
            lines.push(std::mem::take(&mut current));
            used = 0;
        }

        if piece_width <= width {
            push_piece(&mut current, piece, style);
            used += piece_width;
            continue;
        }

        // Hard split of an overlong word.
        let mut chunk = String::new();
        for ch in piece.chars() {
            let w = ch.width().unwrap_or(0);
            if used + w > width && used > 0 {
                push_piece(&mut current, std::mem::take(&mut chunk), style);
                lines.push(std::mem::take(&mut current));
                used = 0;
            }
            chunk.push(ch);
            used += w;
        }
        if !chunk.is_empty() {
            push_piece(&mut current, chunk, style);
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Splits spans into alternating word and whitespace pieces, keeping styles.
fn pieces(spans: &[Span<'static>]) -> Vec<(String, Style)> {
    let mut out = Vec::new();
    for span in spans {
        let mut buf = String::new();
        let mut buf_is_space = None;
        for ch in span.content.chars() {
            let space = ch.is_whitespace();
            if buf_is_space.is_some_and(|prev| prev != space) {
                out.push((std::mem::take(&mut buf), span.style));
            }
            buf.push(ch);
            buf_is_space = Some(space);
        }
        if !buf.is_empty() {
            out.push((buf, span.style));
        }
    }
    out
}

fn push_piece(line: &mut Vec<Span<'static>>, text: String, style: Style) {
    if text.is_empty() {
        return;
    }
    match line.last_mut() {
        Some(last) if last.style == style => last.content.to_mut().push_str(&text),
        _ => line.push(Span::styled(text, style)),
    }
}

fn trim_trailing_space(line: &mut Vec<Span<'static>>) {
    while let Some(last) = line.last_mut() {
        let trimmed_len = last.content.trim_end().len();
        if trimmed_len == 0 {
            line.pop();
            continue;
        }
        last.content.to_mut().truncate(trimmed_len);
        break;
    }
}
