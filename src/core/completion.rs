//! Turns accumulated raw completion text into display text.
//!
//! Everything here is a pure function of the text received so far, so it is
//! safe to call once per chunk.

use crate::api::ErrorEnvelope;

/// Start of a hallucinated next turn. Anything from here on is dropped.
pub const STOP_MARKER: &str = "\nHuman: ";

/// How the response body was framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyFraming {
    /// Open-ended chunked body: a genuine completion stream.
    #[default]
    Chunked,
    /// Body with a `content-length`: the server answered in one piece, which
    /// is how error envelopes arrive.
    Sized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCompletion {
    /// Text to show as the bot reply.
    Reply(String),
    /// The body is a server error envelope carrying this message.
    ServerError(String),
    /// A sized body that may still become an error envelope; show nothing yet.
    Withheld,
}

/// Cuts `raw` at the first stop marker and trims the remainder.
pub fn parse_completion(raw: &str) -> &str {
    let visible = match raw.find(STOP_MARKER) {
        Some(index) => &raw[..index],
        None => raw,
    };
    visible.trim()
}

/// Parses `raw` as a server error envelope, if it is one.
pub fn parse_error_envelope(raw: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(raw.trim()).ok()?;
    if envelope.success == Some(true) {
        return None;
    }
    Some(envelope.error.message.trim().to_string())
}

/// Classifies the accumulated body. `finished` is true once the stream has
/// ended and no more bytes will arrive.
pub fn classify_completion(raw: &str, framing: BodyFraming, finished: bool) -> ParsedCompletion {
    if framing == BodyFraming::Sized && raw.trim_start().starts_with('{') {
        if let Some(message) = parse_error_envelope(raw) {
            return ParsedCompletion::ServerError(message);
        }
        if !finished {
            return ParsedCompletion::Withheld;
        }
    }
    ParsedCompletion::Reply(parse_completion(raw).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_marker_is_only_trimmed() {
        for raw in ["", "  4  ", "\n\nhello\nworld\n", "Human: at start is fine"] {
            assert_eq!(parse_completion(raw), raw.trim());
        }
    }

    #[test]
    fn marker_truncates_to_trimmed_prefix() {
        let cases = [
            ("4", "anything"),
            ("4 ", "next question"),
            ("", "oops"),
            ("  ", ""),
            ("line one\nline two", "Bot: more"),
        ];
        for (prefix, suffix) in cases {
            let raw = format!("{prefix}{STOP_MARKER}{suffix}");
            assert_eq!(parse_completion(&raw), prefix.trim(), "raw={raw:?}");
        }
    }

    #[test]
    fn growing_prefixes_never_shrink_the_display() {
        let full = "Sure!\n\n```rust\nfn main() {}\n```\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";
        let mut previous = String::new();
        for end in 0..=full.len() {
            if !full.is_char_boundary(end) {
                continue;
            }
            let shown = parse_completion(&full[..end]).to_string();
            assert!(shown.len() >= previous.len());
            assert!(shown.starts_with(&previous), "{previous:?} -> {shown:?}");
            previous = shown;
        }
    }

    #[test]
    fn streaming_scenario_keeps_reply_stable_past_marker() {
        let chunks = ["4", "4\n", "4\nHuman: next"];
        let shown: Vec<_> = chunks.iter().map(|raw| parse_completion(raw)).collect();
        assert_eq!(shown, vec!["4", "4", "4"]);
    }

    #[test]
    fn sized_error_envelope_becomes_server_error() {
        let raw = r#"{"success":false,"error":{"message":"rate limited"}}"#;
        assert_eq!(
            classify_completion(raw, BodyFraming::Sized, false),
            ParsedCompletion::ServerError("rate limited".into())
        );
    }

    #[test]
    fn chunked_json_is_treated_as_reply_text() {
        let raw = r#"{"success":false,"error":{"message":"rate limited"}}"#;
        assert_eq!(
            classify_completion(raw, BodyFraming::Chunked, false),
            ParsedCompletion::Reply(raw.into())
        );
    }

    #[test]
    fn partial_sized_json_is_withheld_until_the_end() {
        let partial = r#"{"success":false,"err"#;
        assert_eq!(
            classify_completion(partial, BodyFraming::Sized, false),
            ParsedCompletion::Withheld
        );
        assert_eq!(
            classify_completion(partial, BodyFraming::Sized, true),
            ParsedCompletion::Reply(partial.into())
        );
    }

    #[test]
    fn successful_envelope_is_not_an_error() {
        assert_eq!(
            parse_error_envelope(r#"{"success":true,"error":{"message":"x"}}"#),
            None
        );
    }

    #[test]
    fn envelope_message_keeps_its_inner_whitespace() {
        assert_eq!(
            parse_error_envelope("{\"error\":{\"message\":\"  rate  limited\\nretry later \"}}"),
            Some("rate  limited\nretry later".into())
        );
        assert_eq!(
            classify_completion(
                r#"{"success":false,"error":{"message":"line one\n\n  line two"}}"#,
                BodyFraming::Sized,
                true,
            ),
            ParsedCompletion::ServerError("line one\n\n  line two".into())
        );
    }
}
