use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Human,
    Bot,
    Error,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Bot => "bot",
            Role::Error => "error",
        }
    }

    /// Party name sent to the completion endpoint. Error messages are local
    /// only and never leave the client.
    pub fn to_api_party(self) -> Option<&'static str> {
        match self {
            Role::Human => Some("human"),
            Role::Bot => Some("bot"),
            Role::Error => None,
        }
    }

    pub fn default_label(self) -> &'static str {
        match self {
            Role::Human => "You",
            Role::Bot => "Bot",
            Role::Error => "Error",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, String> {
        match value {
            "human" => Ok(Role::Human),
            "bot" => Ok(Role::Bot),
            "error" => Ok(Role::Error),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

/// Opaque message identity. Two messages with the same id are the same
/// logical message observed at different points in time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Generates a fresh random id. Falls back to a timestamp-derived id if the
    /// OS entropy source is unavailable.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        match getrandom::fill(&mut bytes) {
            Ok(()) => Self(bytes.iter().map(|b| format!("{b:02x}")).collect()),
            Err(_) => {
                let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
                Self(format!("t{nanos:x}"))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// `None` while the message is a placeholder with no content yet.
    pub text: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(id: MessageId, role: Role, text: Option<String>) -> Self {
        Self {
            id,
            text,
            role,
            display_name: None,
            created_at: Utc::now(),
        }
    }

    pub fn human(text: impl Into<String>) -> Self {
        Self::new(MessageId::generate(), Role::Human, Some(text.into()))
    }

    pub fn pending_bot() -> Self {
        Self::new(MessageId::generate(), Role::Bot, None)
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Same logical message with new content and role. Creation time and
    /// display name are carried over.
    pub fn revised(&self, role: Role, text: impl Into<String>) -> Self {
        Self {
            id: self.id.clone(),
            text: Some(text.into()),
            role,
            display_name: self.display_name.clone(),
            created_at: self.created_at,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.text.is_none()
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Name shown above the message. Errors are always labelled as such.
    pub fn label(&self) -> &str {
        match (self.role, self.display_name.as_deref()) {
            (Role::Error, _) | (_, None) => self.role.default_label(),
            (_, Some(name)) => name,
        }
    }
}
