use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Theme {
    // Overall background color; also picks the syntax highlighting palette
    pub background_color: Color,

    // Transcript
    pub human_label_style: Style,
    pub human_text_style: Style,
    pub bot_label_style: Style,
    pub bot_text_style: Style,
    pub error_label_style: Style,
    pub error_text_style: Style,
    pub lead_title_style: Style,
    pub lead_text_style: Style,

    // Chrome
    pub title_style: Style,
    pub status_style: Style,
    pub streaming_indicator_style: Style,
    pub input_border_style: Style,
    pub input_title_style: Style,
    pub input_text_style: Style,
    pub input_cursor_style: Style,

    // Markdown
    pub md_heading_style: Style,
    pub md_inline_code_style: Style,
    pub md_link_style: Style,
    pub md_quote_style: Style,
    pub md_rule_style: Style,
    pub md_list_marker_style: Style,
    pub md_table_border_style: Style,
    pub md_table_header_style: Style,
    pub md_codeblock_text_style: Style,
    pub md_codeblock_label_style: Style,
    pub md_codeblock_copied_style: Style,
    pub md_codeblock_bg: Option<Color>,
    pub cursor_style: Style,
}

impl Theme {
    pub fn dark_default() -> Self {
        Theme {
            background_color: Color::Black,

            human_label_style: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            human_text_style: Style::default().fg(Color::Cyan),
            bot_label_style: Style::default()
                .fg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
            bot_text_style: Style::default().fg(Color::White),
            error_label_style: Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
            error_text_style: Style::default().fg(Color::LightRed),
            lead_title_style: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            lead_text_style: Style::default().fg(Color::Gray),

            title_style: Style::default().fg(Color::Gray),
            status_style: Style::default().fg(Color::DarkGray),
            streaming_indicator_style: Style::default().fg(Color::White),
            input_border_style: Style::default().fg(Color::Gray),
            input_title_style: Style::default().fg(Color::Gray),
            input_text_style: Style::default().fg(Color::White),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),

            md_heading_style: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
            md_inline_code_style: Style::default().fg(Color::Yellow),
            md_link_style: Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::UNDERLINED),
            md_quote_style: Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
            md_rule_style: Style::default().fg(Color::DarkGray),
            md_list_marker_style: Style::default().fg(Color::LightGreen),
            md_table_border_style: Style::default().fg(Color::DarkGray),
            md_table_header_style: Style::default().add_modifier(Modifier::BOLD),
            md_codeblock_text_style: Style::default().fg(Color::Gray),
            md_codeblock_label_style: Style::default().fg(Color::DarkGray),
            md_codeblock_copied_style: Style::default().fg(Color::LightGreen),
            md_codeblock_bg: Some(Color::Rgb(30, 30, 30)),
            cursor_style: Style::default().fg(Color::White),
        }
    }

    pub fn md_codeblock_bg_color(&self) -> Option<Color> {
        self.md_codeblock_bg
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark_default()
    }
}
