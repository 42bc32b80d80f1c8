use std::time::Instant;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::core::app::App;
use crate::core::message::{Message, Role};
use crate::ui::markdown::{render_markdown, wrap_spans, Cursor, RenderOptions};
use crate::ui::theme::Theme;

const MAX_INPUT_ROWS: u16 = 6;

const KEY_HINTS: &str = "Enter send • Esc stop • Ctrl+L clear • Ctrl+Y copy code • Ctrl+C quit";

pub fn ui(f: &mut Frame, app: &mut App, theme: &Theme) {
    let input_rows = (app.ui.textarea.lines().len() as u16).clamp(1, MAX_INPUT_ROWS);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(input_rows + 2), // +2 for borders
        ])
        .split(f.area());

    let now = Instant::now();
    f.render_widget(Paragraph::new(title_line(app, theme)), chunks[0]);

    let lines = build_transcript_lines(app, theme, chunks[1].width as usize, now);
    app.ui.update_scroll_bounds(lines.len(), chunks[1].height);
    let transcript = Paragraph::new(lines).scroll((app.ui.effective_offset(), 0));
    f.render_widget(transcript, chunks[1]);

    let status = match app.ui.current_status(now) {
        Some(text) => Span::styled(text.to_string(), theme.status_style),
        None => Span::styled(KEY_HINTS, theme.status_style),
    };
    f.render_widget(Paragraph::new(Line::from(status)), chunks[2]);

    let input_title = if app.is_loading {
        "Waiting for reply (Esc to stop)"
    } else {
        "Your message"
    };
    app.ui.textarea.set_style(theme.input_text_style);
    app.ui.textarea.set_cursor_style(theme.input_cursor_style);
    app.ui.textarea.set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.input_border_style)
            .title(Span::styled(input_title, theme.input_title_style)),
    );
    f.render_widget(&app.ui.textarea, chunks[3]);
}

fn title_line(app: &App, theme: &Theme) -> Line<'static> {
    let settings = app.settings();
    let mut spans = vec![Span::styled(
        format!(
            "diybot v{} • {} ({})",
            env!("CARGO_PKG_VERSION"),
            settings.model,
            settings.transport
        ),
        theme.title_style,
    )];
    if app.is_loading {
        spans.push(Span::styled(" • streaming", theme.streaming_indicator_style));
    }
    Line::from(spans)
}

/// Every transcript row for the given width, already wrapped. The row count
/// is what scrolling is measured against.
pub fn build_transcript_lines(
    app: &App,
    theme: &Theme,
    width: usize,
    now: Instant,
) -> Vec<Line<'static>> {
    if app.store.is_empty() {
        return lead_lines(app, theme, width);
    }

    let settings = app.settings();
    let streaming_id = app.streaming_message_id();
    let mut lines = Vec::new();
    for message in app.store.messages() {
        // A reply stopped before any text arrived leaves nothing to show.
        if message.role == Role::Bot && message.text.as_deref() == Some("") {
            continue;
        }
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.push(label_line(message, theme));

        match message.role {
            Role::Human => push_plain(
                &mut lines,
                message.text_or_empty(),
                theme.human_text_style,
                width,
            ),
            Role::Error => push_plain(
                &mut lines,
                message.text_or_empty(),
                theme.error_text_style,
                width,
            ),
            Role::Bot => {
                let is_streaming = streaming_id == Some(&message.id);
                let opts = RenderOptions {
                    syntax_highlighting: settings.syntax_highlighting,
                    cursor: is_streaming.then(|| Cursor {
                        glyph: &settings.cursor_glyph,
                        visible: app.ui.cursor_visible(now),
                    }),
                    message_id: Some(&message.id),
                    copied: app.ui.copy_feedback.as_ref(),
                    width,
                    ..RenderOptions::new(theme)
                };
                lines.extend(render_markdown(message.text_or_empty(), &opts));
            }
        }
    }
    lines
}

fn label_line(message: &Message, theme: &Theme) -> Line<'static> {
    let style = match message.role {
        Role::Human => theme.human_label_style,
        Role::Bot => theme.bot_label_style,
        Role::Error => theme.error_label_style,
    };
    Line::from(Span::styled(message.label().to_string(), style))
}

fn push_plain(
    lines: &mut Vec<Line<'static>>,
    text: &str,
    style: ratatui::style::Style,
    width: usize,
) {
    for raw in text.split('\n') {
        for wrapped in wrap_spans(vec![Span::styled(raw.to_string(), style)], width) {
            lines.push(Line::from(wrapped));
        }
    }
}

fn lead_copy(model: &str) -> String {
    format!(
        "# Compare GPT-3 and ChatGPT\n\n\
         Step 1: open ChatGPT (https://chat.openai.com) and diybot side by side.\n\n\
         Step 2: ask both the same questions!\n\n\
         # FAQ\n\n\
         **What's the model?**\n\n\
         `{model}`\n\n\
         **What's the prompt?**\n\n\
         The conversation so far, as `Human:` and `Bot:` turns.\n\n\
         **Where do settings live?**\n\n\
         Run `diybot config show`."
    )
}

fn lead_lines(app: &App, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let opts = RenderOptions {
        base_style: theme.lead_text_style,
        syntax_highlighting: false,
        width,
        ..RenderOptions::new(theme)
    };
    render_markdown(&lead_copy(&app.settings().model), &opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app::{apply_action, AppAction, AppActionContext};
    use crate::utils::test_utils::create_test_app;
    use ratatui::{backend::TestBackend, Terminal};

    fn text_of(lines: &[Line<'static>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    fn ctx() -> AppActionContext {
        AppActionContext {
            term_width: 80,
            term_height: 24,
        }
    }

    #[test]
    fn empty_transcript_shows_the_lead_copy() {
        let app = create_test_app();
        let theme = Theme::dark_default();
        let lines = text_of(&build_transcript_lines(&app, &theme, 80, Instant::now()));
        assert_eq!(lines.first().map(String::as_str), Some("Compare GPT-3 and ChatGPT"));
        assert!(lines.iter().any(|line| line == "test-model"));
    }

    #[test]
    fn transcript_labels_each_message() {
        let mut app = create_test_app();
        app.ui.started_at = Instant::now();
        apply_action(&mut app, AppAction::SubmitMessage { text: "hi".into() }, ctx());
        let lines = text_of(&build_transcript_lines(
            &app,
            &Theme::dark_default(),
            80,
            app.ui.started_at,
        ));
        assert_eq!(lines, vec!["You", "hi", "", "Bot", "▋"]);
    }

    #[test]
    fn stopped_empty_reply_is_hidden() {
        let mut app = create_test_app();
        apply_action(&mut app, AppAction::SubmitMessage { text: "hi".into() }, ctx());
        apply_action(&mut app, AppAction::CancelStreaming, ctx());
        let theme = Theme::dark_default();
        let lines = text_of(&build_transcript_lines(&app, &theme, 80, Instant::now()));
        assert_eq!(lines, vec!["You", "hi"]);
    }

    #[test]
    fn long_human_text_wraps_to_the_width() {
        let mut app = create_test_app();
        apply_action(
            &mut app,
            AppAction::SubmitMessage {
                text: "one two three four".into(),
            },
            ctx(),
        );
        let theme = Theme::dark_default();
        let lines = text_of(&build_transcript_lines(&app, &theme, 9, Instant::now()));
        assert_eq!(&lines[..3], &["You", "one two", "three"]);
    }

    #[test]
    fn drawing_a_frame_updates_scroll_bounds() {
        let mut app = create_test_app();
        let theme = Theme::dark_default();
        let mut terminal = Terminal::new(TestBackend::new(40, 12)).expect("terminal");
        terminal.draw(|f| ui(f, &mut app, &theme)).expect("draw");
        // 12 rows minus title, status and a three-row input box.
        assert_eq!(app.ui.transcript_height, 7);
        assert!(app.ui.max_scroll > 0);
    }
}
