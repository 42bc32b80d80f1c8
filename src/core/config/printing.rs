use crate::core::config::data::Config;
use crate::core::config::defaults::Settings;

fn show<T: std::fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "(unset)".to_string(),
    }
}

impl Config {
    /// Stored values alongside what they resolve to.
    pub fn render_summary(&self, effective: &Settings) -> String {
        let mut lines = vec!["Current configuration:".to_string()];
        let mut push = |key: &str, stored: String, resolved: String| {
            lines.push(format!("  {key}: {stored} (effective: {resolved})"));
        };
        push("endpoint", show(&self.endpoint), effective.endpoint.clone());
        push("model", show(&self.model), effective.model.clone());
        push(
            "transport",
            show(&self.transport),
            effective.transport.to_string(),
        );
        push(
            "display-name",
            show(&self.display_name),
            effective
                .display_name
                .clone()
                .unwrap_or_else(|| "Bot".to_string()),
        );
        push(
            "cursor-glyph",
            show(&self.cursor_glyph),
            effective.cursor_glyph.clone(),
        );
        push(
            "copy-feedback-ms",
            show(&self.copy_feedback_ms),
            effective.copy_feedback.as_millis().to_string(),
        );
        push(
            "reveal-interval-ms",
            show(&self.reveal_interval_ms),
            effective.reveal_interval.as_millis().to_string(),
        );
        push(
            "syntax-highlighting",
            show(&self.syntax_highlighting),
            if effective.syntax_highlighting { "on" } else { "off" }.to_string(),
        );
        push(
            "openai.base-url",
            show(&self.openai.base_url),
            effective.openai.base_url.clone(),
        );
        push(
            "openai.temperature",
            show(&self.openai.temperature),
            effective.openai.temperature.to_string(),
        );
        push(
            "openai.max-tokens",
            show(&self.openai.max_tokens),
            effective.openai.max_tokens.to_string(),
        );
        lines.join("\n")
    }

    pub fn print_all(&self, effective: &Settings) {
        println!("{}", self.render_summary(effective));
    }
}
