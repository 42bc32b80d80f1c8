use std::time::Duration;

use crate::core::config::data::{Config, Transport};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/completion";
pub const DEFAULT_MODEL: &str = "text-davinci-002";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_CURSOR_GLYPH: &str = "▋";
pub const DEFAULT_COPY_FEEDBACK_MS: u64 = 2000;
pub const DEFAULT_REVEAL_INTERVAL_MS: u64 = 30;

pub const ENDPOINT_ENV: &str = "DIYBOT_ENDPOINT";
pub const MODEL_ENV: &str = "DIYBOT_MODEL";

/// Values given on the command line. They win over everything else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub transport: Option<Transport>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub endpoint: String,
    pub model: String,
    pub transport: Transport,
    pub display_name: Option<String>,
    pub cursor_glyph: String,
    pub copy_feedback: Duration,
    pub reveal_interval: Duration,
    pub syntax_highlighting: bool,
    pub openai: OpenAiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Config::default().resolve_with(&SettingsOverrides::default(), |_| None)
    }
}

impl Config {
    /// Resolves settings from CLI overrides, then the environment, then the
    /// config file, then built-in defaults.
    pub fn resolve(&self, overrides: &SettingsOverrides) -> Settings {
        self.resolve_with(overrides, |name| std::env::var(name).ok())
    }

    pub fn resolve_with(
        &self,
        overrides: &SettingsOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Settings {
        let from_env = |name: &str| env(name).filter(|value| !value.trim().is_empty());

        let endpoint = overrides
            .endpoint
            .clone()
            .or_else(|| from_env(ENDPOINT_ENV))
            .or_else(|| self.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let model = overrides
            .model
            .clone()
            .or_else(|| from_env(MODEL_ENV))
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Settings {
            endpoint,
            model,
            transport: overrides.transport.or(self.transport).unwrap_or_default(),
            display_name: self
                .display_name
                .clone()
                .filter(|name| !name.trim().is_empty()),
            cursor_glyph: self
                .cursor_glyph
                .clone()
                .unwrap_or_else(|| DEFAULT_CURSOR_GLYPH.to_string()),
            copy_feedback: Duration::from_millis(
                self.copy_feedback_ms.unwrap_or(DEFAULT_COPY_FEEDBACK_MS),
            ),
            reveal_interval: Duration::from_millis(
                self.reveal_interval_ms
                    .unwrap_or(DEFAULT_REVEAL_INTERVAL_MS),
            ),
            syntax_highlighting: self.syntax_highlighting.unwrap_or(true),
            openai: OpenAiSettings {
                base_url: self
                    .openai
                    .base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                temperature: self.openai.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                max_tokens: self.openai.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            },
        }
    }
}
