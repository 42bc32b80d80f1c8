//! Wire types for the completion endpoints.

use serde::{Deserialize, Serialize};

/// One conversation turn as the proxy endpoint expects it.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ApiMessage {
    pub text: String,
    pub party: String,
}

/// Request body for the chat proxy endpoint.
#[derive(Serialize, Debug)]
pub struct ChatRequest {
    pub messages: Vec<ApiMessage>,
    pub model: String,
}

/// Error envelope a server may return in place of a completion body.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    pub error: ErrorDetail,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorDetail {
    pub message: String,
}

/// Request body for the legacy `/completions` endpoint.
#[derive(Serialize, Debug)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Deserialize, Debug)]
pub struct CompletionChoice {
    #[serde(default)]
    pub text: String,
}

/// One SSE `data:` payload from the legacy `/completions` endpoint.
#[derive(Deserialize, Debug)]
pub struct CompletionChunk {
    pub choices: Vec<CompletionChoice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_serializes_messages_in_order() {
        let request = ChatRequest {
            messages: vec![
                ApiMessage {
                    text: "hi".into(),
                    party: "human".into(),
                },
                ApiMessage {
                    text: "hello".into(),
                    party: "bot".into(),
                },
            ],
            model: "text-davinci-003".into(),
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["model"], "text-davinci-003");
        assert_eq!(json["messages"][0]["party"], "human");
        assert_eq!(json["messages"][1]["text"], "hello");
    }

    #[test]
    fn error_envelope_accepts_missing_success_flag() {
        let envelope: ErrorEnvelope =
            serde_json::from_str(r#"{"error":{"message":"nope"}}"#).expect("parse");
        assert_eq!(envelope.success, None);
        assert_eq!(envelope.error.message, "nope");
    }
}
