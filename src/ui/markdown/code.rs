use std::time::{Duration, Instant};

use ratatui::text::{Line, Span};

use crate::core::message::MessageId;
use crate::ui::theme::Theme;

/// Transient "copied" marker shown on one code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFeedback {
    message_id: MessageId,
    block_index: usize,
    ttl: Duration,
    set_at: Instant,
}

impl CopyFeedback {
    pub fn new(message_id: MessageId, block_index: usize, ttl: Duration) -> Self {
        Self::new_at(message_id, block_index, ttl, Instant::now())
    }

    pub fn new_at(message_id: MessageId, block_index: usize, ttl: Duration, now: Instant) -> Self {
        Self {
            message_id,
            block_index,
            ttl,
            set_at: now,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.set_at) >= self.ttl
    }

    pub fn applies_to(&self, message_id: &MessageId, block_index: usize) -> bool {
        &self.message_id == message_id && self.block_index == block_index
    }

    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    pub fn block_index(&self) -> usize {
        self.block_index
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

pub(super) fn detab(s: &str) -> String {
    s.replace('\t', "    ")
}

fn plain_codeblock_lines(code: &str, theme: &Theme) -> Vec<Line<'static>> {
    let mut style = theme.md_codeblock_text_style;
    if let Some(bg) = theme.md_codeblock_bg_color() {
        style = style.bg(bg);
    }
    code.lines()
        .map(|line| Line::from(Span::styled(detab(line), style)))
        .collect()
}

/// Header row above a code block: the language label and, while feedback
/// is live, a "copied" marker. `None` when there is neither.
pub(super) fn code_header_line(
    language: Option<&str>,
    copied: bool,
    theme: &Theme,
) -> Option<Line<'static>> {
    let mut spans = Vec::new();
    if let Some(language) = language {
        spans.push(Span::styled(
            language.to_string(),
            theme.md_codeblock_label_style,
        ));
    }
    if copied {
        let marker = if spans.is_empty() { "✓ copied" } else { "  ✓ copied" };
        spans.push(Span::styled(marker, theme.md_codeblock_copied_style));
    }
    (!spans.is_empty()).then(|| Line::from(spans))
}

/// Body rows of a code block, one per source line.
pub(super) fn code_body_lines(
    code: &str,
    language: Option<&str>,
    syntax_enabled: bool,
    theme: &Theme,
) -> Vec<Line<'static>> {
    if syntax_enabled {
        crate::utils::syntax::highlight_code_block(language.unwrap_or(""), code, theme)
            .unwrap_or_else(|| plain_codeblock_lines(code, theme))
    } else {
        plain_codeblock_lines(code, theme)
    }
}
