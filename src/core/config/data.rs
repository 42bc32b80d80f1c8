use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which upstream API the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    /// Chat proxy that takes the whole transcript and streams raw text back.
    #[default]
    Proxy,
    /// OpenAI legacy `/completions` endpoint with a rendered prompt.
    OpenaiCompletions,
}

impl Transport {
    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Proxy => "proxy",
            Transport::OpenaiCompletions => "openai-completions",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "proxy" => Ok(Transport::Proxy),
            "openai-completions" | "openai" => Ok(Transport::OpenaiCompletions),
            other => Err(format!(
                "unknown transport '{other}' (expected 'proxy' or 'openai-completions')"
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct OpenAiConfig {
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl OpenAiConfig {
    pub fn is_empty(&self) -> bool {
        self.base_url.is_none() && self.temperature.is_none() && self.max_tokens.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Chat proxy URL used by the `proxy` transport
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub transport: Option<Transport>,
    /// Label shown on bot messages instead of "Bot"
    pub display_name: Option<String>,
    /// Glyph appended to the streaming tail
    pub cursor_glyph: Option<String>,
    /// How long the "copied" marker stays on a code block
    pub copy_feedback_ms: Option<u64>,
    /// Delay between tokens in typewriter replay
    pub reveal_interval_ms: Option<u64>,
    /// Enable syntax highlighting for fenced code blocks
    pub syntax_highlighting: Option<bool>,
    #[serde(default, skip_serializing_if = "OpenAiConfig::is_empty")]
    pub openai: OpenAiConfig,
}

/// Keys accepted by `diybot config set|unset`.
pub const CONFIG_KEYS: &[&str] = &[
    "endpoint",
    "model",
    "transport",
    "display-name",
    "cursor-glyph",
    "copy-feedback-ms",
    "reveal-interval-ms",
    "syntax-highlighting",
    "openai.base-url",
    "openai.temperature",
    "openai.max-tokens",
];

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase().replace('_', "-")
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, String>
where
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| format!("invalid value for {key}: {err}"))
}

fn parse_toggle(key: &str, value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(format!("invalid value for {key}: '{other}' (expected on or off)")),
    }
}

impl Config {
    /// Sets a single key from its textual form.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        let key = normalize_key(key);
        match key.as_str() {
            "endpoint" => self.endpoint = Some(value.trim().to_string()),
            "model" => self.model = Some(value.trim().to_string()),
            "transport" => self.transport = Some(value.parse()?),
            "display-name" => self.display_name = Some(value.trim().to_string()),
            "cursor-glyph" => self.cursor_glyph = Some(value.to_string()),
            "copy-feedback-ms" => self.copy_feedback_ms = Some(parse_value(&key, value)?),
            "reveal-interval-ms" => self.reveal_interval_ms = Some(parse_value(&key, value)?),
            "syntax-highlighting" => self.syntax_highlighting = Some(parse_toggle(&key, value)?),
            "openai.base-url" => self.openai.base_url = Some(value.trim().to_string()),
            "openai.temperature" => self.openai.temperature = Some(parse_value(&key, value)?),
            "openai.max-tokens" => self.openai.max_tokens = Some(parse_value(&key, value)?),
            _ => return Err(unknown_key(&key)),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        let key = normalize_key(key);
        match key.as_str() {
            "endpoint" => self.endpoint = None,
            "model" => self.model = None,
            "transport" => self.transport = None,
            "display-name" => self.display_name = None,
            "cursor-glyph" => self.cursor_glyph = None,
            "copy-feedback-ms" => self.copy_feedback_ms = None,
            "reveal-interval-ms" => self.reveal_interval_ms = None,
            "syntax-highlighting" => self.syntax_highlighting = None,
            "openai.base-url" => self.openai.base_url = None,
            "openai.temperature" => self.openai.temperature = None,
            "openai.max-tokens" => self.openai.max_tokens = None,
            _ => return Err(unknown_key(&key)),
        }
        Ok(())
    }
}

fn unknown_key(key: &str) -> String {
    format!(
        "unknown config key '{key}'. Known keys: {}",
        CONFIG_KEYS.join(", ")
    )
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
