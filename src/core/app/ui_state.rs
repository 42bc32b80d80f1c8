use std::time::{Duration, Instant};

use ratatui::style::Style;
use tui_textarea::TextArea;

use crate::core::message::MessageId;
use crate::ui::markdown::CopyFeedback;

const STATUS_TTL: Duration = Duration::from_secs(4);

/// Terminal-side state: input box, scrolling, status line.
pub struct UiState {
    pub textarea: TextArea<'static>,
    /// First transcript row shown when not following the tail.
    pub scroll_offset: u16,
    pub auto_scroll: bool,
    /// Largest valid offset as of the last frame.
    pub max_scroll: u16,
    /// Transcript rows visible in the last frame.
    pub transcript_height: u16,
    pub status: Option<(String, Instant)>,
    pub copy_feedback: Option<CopyFeedback>,
    pub started_at: Instant,
}

impl UiState {
    pub fn new() -> Self {
        let mut textarea = TextArea::default();
        textarea.set_cursor_line_style(Style::default());
        textarea.set_placeholder_text("Type your message");
        Self {
            textarea,
            scroll_offset: 0,
            auto_scroll: true,
            max_scroll: 0,
            transcript_height: 0,
            status: None,
            copy_feedback: None,
            started_at: Instant::now(),
        }
    }

    pub fn input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn clear_input(&mut self) {
        self.textarea.select_all();
        self.textarea.cut();
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some((message.into(), Instant::now()));
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Status text, unless it has expired.
    pub fn current_status(&self, now: Instant) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|(_, set_at)| now.duration_since(*set_at) < STATUS_TTL)
            .map(|(text, _)| text.as_str())
    }

    pub fn enable_auto_scroll(&mut self) {
        self.auto_scroll = true;
        self.scroll_offset = self.max_scroll;
    }

    /// Offset to render with, following the tail when auto-scroll is on.
    pub fn effective_offset(&self) -> u16 {
        if self.auto_scroll {
            self.max_scroll
        } else {
            self.scroll_offset.min(self.max_scroll)
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll_offset = self.effective_offset().saturating_sub(lines);
        self.auto_scroll = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let next = self.effective_offset().saturating_add(lines);
        if next >= self.max_scroll {
            self.enable_auto_scroll();
        } else {
            self.scroll_offset = next;
        }
    }

    pub fn update_scroll_bounds(&mut self, content_rows: usize, visible_rows: u16) {
        self.transcript_height = visible_rows;
        let max = content_rows.saturating_sub(visible_rows as usize);
        self.max_scroll = u16::try_from(max).unwrap_or(u16::MAX);
        if self.auto_scroll {
            self.scroll_offset = self.max_scroll;
        }
    }

    pub fn mark_copied(&mut self, message_id: MessageId, block_index: usize, ttl: Duration) {
        self.copy_feedback = Some(CopyFeedback::new(message_id, block_index, ttl));
    }

    /// Drops feedback whose time is up. Returns true if anything changed.
    pub fn expire_feedback(&mut self, now: Instant) -> bool {
        let expired = self
            .copy_feedback
            .as_ref()
            .is_some_and(|feedback| feedback.is_expired(now));
        if expired {
            self.copy_feedback = None;
        }
        expired
    }

    /// Cursor blink phase: visible for the first half of each second.
    pub fn cursor_visible(&self, now: Instant) -> bool {
        now.duration_since(self.started_at).as_millis() % 1000 < 500
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}
