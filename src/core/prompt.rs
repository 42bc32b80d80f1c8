//! Prompt template for the legacy `/completions` transport.

use crate::core::message::{Message, Role};

/// Number of most recent transcript messages included in a prompt.
pub const PROMPT_WINDOW: usize = 25;

pub const PROMPT_PREAMBLE: &str = "\
Hello, I am a chatbot powered by a large language model. You can ask me anything and I will try my best to answer your questions.

I format code blocks with Markdown fences:

```
Your code goes here
```

and inline code with single backticks: `Your code goes here`

Feel free to ask me anything and I will do my best to help.

";

/// Builds the completion prompt from the trailing window of `messages`.
///
/// Error messages and messages without text are skipped before the window is
/// applied. The prompt always ends with an open `Bot: ` turn.
pub fn build_prompt<'a>(messages: impl IntoIterator<Item = &'a Message>) -> String {
    let turns: Vec<&Message> = messages
        .into_iter()
        .filter(|message| message.role != Role::Error)
        .filter(|message| {
            message
                .text
                .as_deref()
                .is_some_and(|text| !text.trim().is_empty())
        })
        .collect();
    let window = &turns[turns.len().saturating_sub(PROMPT_WINDOW)..];

    let mut prompt = String::from(PROMPT_PREAMBLE);
    for message in window {
        let speaker = match message.role {
            Role::Human => "Human",
            Role::Bot => "Bot",
            Role::Error => continue,
        };
        prompt.push_str(speaker);
        prompt.push_str(": ");
        prompt.push_str(message.text_or_empty().trim());
        prompt.push_str("\n\n");
    }
    prompt.push_str("Bot: ");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::MessageId;

    fn bot(text: &str) -> Message {
        Message::new(MessageId::generate(), Role::Bot, Some(text.to_string()))
    }

    #[test]
    fn prompt_alternates_turns_and_leaves_bot_turn_open() {
        let messages = vec![Message::human("  2+2? "), bot("4")];
        let prompt = build_prompt(&messages);
        assert!(prompt.starts_with(PROMPT_PREAMBLE));
        assert!(prompt.ends_with("Human: 2+2?\n\nBot: 4\n\nBot: "));
    }

    #[test]
    fn errors_and_placeholders_are_left_out() {
        let messages = vec![
            Message::human("hi"),
            Message::new(MessageId::generate(), Role::Error, Some("boom".into())),
            Message::pending_bot(),
        ];
        let prompt = build_prompt(&messages);
        assert!(!prompt.contains("boom"));
        assert!(prompt.ends_with("Human: hi\n\nBot: "));
    }

    #[test]
    fn only_the_latest_window_is_sent() {
        let messages: Vec<Message> = (0..30)
            .map(|index| Message::human(format!("question {index}")))
            .collect();
        let prompt = build_prompt(&messages);
        assert!(!prompt.contains("question 4\n"));
        assert!(prompt.contains("Human: question 5\n\n"));
        assert!(prompt.contains("Human: question 29\n\n"));
        assert_eq!(prompt.matches("Human: ").count(), PROMPT_WINDOW);
    }
}
