//! Maps key presses to chat commands.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::core::app::{AppAction, UiState};
use crate::core::conversation::MessageStore;
use crate::core::message::{MessageId, Role};
use crate::ui::markdown::parse_document;

const SCROLL_STEP: u16 = 1;

#[derive(Debug)]
pub enum KeyCommand {
    Action(AppAction),
    /// Take the input box contents and send them.
    Submit,
    CopyLatestCode,
    Quit,
    /// Pass the key to the input box.
    Edit,
    Ignore,
}

pub fn map_key(key: &KeyEvent) -> KeyCommand {
    if key.kind == KeyEventKind::Release {
        return KeyCommand::Ignore;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => KeyCommand::Quit,
        KeyCode::Char('l') if ctrl => KeyCommand::Action(AppAction::ResetConversation),
        KeyCode::Char('y') if ctrl => KeyCommand::CopyLatestCode,
        KeyCode::Enter
            if key
                .modifiers
                .intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) =>
        {
            KeyCommand::Edit
        }
        KeyCode::Enter => KeyCommand::Submit,
        KeyCode::Esc => KeyCommand::Action(AppAction::CancelStreaming),
        KeyCode::PageUp => KeyCommand::Action(AppAction::PageUp),
        KeyCode::PageDown => KeyCommand::Action(AppAction::PageDown),
        KeyCode::Up => KeyCommand::Action(AppAction::ScrollUp { lines: SCROLL_STEP }),
        KeyCode::Down => KeyCommand::Action(AppAction::ScrollDown { lines: SCROLL_STEP }),
        KeyCode::End => KeyCommand::Action(AppAction::ScrollToEnd),
        _ => KeyCommand::Edit,
    }
}

/// Hands a key to the input box. Returns true if the text changed.
pub fn edit_input(ui: &mut UiState, key: KeyEvent) -> bool {
    if key.code == KeyCode::Enter {
        ui.textarea.insert_newline();
        return true;
    }
    ui.textarea.input(key)
}

/// The last code block of the newest reply that has one.
pub fn latest_code_block(store: &MessageStore) -> Option<(MessageId, usize, String)> {
    store
        .messages()
        .iter()
        .rev()
        .filter(|message| message.role == Role::Bot)
        .find_map(|message| {
            let doc = parse_document(message.text.as_deref()?);
            let block = doc.code_blocks().pop()?;
            Some((message.id.clone(), block.index, block.code.to_string()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Message;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn control_keys_map_to_commands() {
        assert!(matches!(
            map_key(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            KeyCommand::Quit
        ));
        assert!(matches!(
            map_key(&key(KeyCode::Char('l'), KeyModifiers::CONTROL)),
            KeyCommand::Action(AppAction::ResetConversation)
        ));
        assert!(matches!(
            map_key(&key(KeyCode::Char('y'), KeyModifiers::CONTROL)),
            KeyCommand::CopyLatestCode
        ));
        assert!(matches!(
            map_key(&key(KeyCode::Esc, KeyModifiers::NONE)),
            KeyCommand::Action(AppAction::CancelStreaming)
        ));
    }

    #[test]
    fn enter_submits_and_alt_enter_edits() {
        assert!(matches!(
            map_key(&key(KeyCode::Enter, KeyModifiers::NONE)),
            KeyCommand::Submit
        ));
        assert!(matches!(
            map_key(&key(KeyCode::Enter, KeyModifiers::ALT)),
            KeyCommand::Edit
        ));
        assert!(matches!(
            map_key(&key(KeyCode::Char('a'), KeyModifiers::NONE)),
            KeyCommand::Edit
        ));
    }

    #[test]
    fn navigation_keys_scroll() {
        assert!(matches!(
            map_key(&key(KeyCode::PageUp, KeyModifiers::NONE)),
            KeyCommand::Action(AppAction::PageUp)
        ));
        assert!(matches!(
            map_key(&key(KeyCode::Up, KeyModifiers::NONE)),
            KeyCommand::Action(AppAction::ScrollUp { lines: 1 })
        ));
        assert!(matches!(
            map_key(&key(KeyCode::End, KeyModifiers::NONE)),
            KeyCommand::Action(AppAction::ScrollToEnd)
        ));
    }

    #[test]
    fn alt_enter_inserts_a_newline() {
        let mut ui = UiState::new();
        ui.textarea.insert_str("a");
        assert!(edit_input(&mut ui, key(KeyCode::Enter, KeyModifiers::ALT)));
        ui.textarea.insert_str("b");
        assert_eq!(ui.input_text(), "a\nb");
    }

    #[test]
    fn latest_code_block_prefers_the_newest_reply() {
        let mut store = MessageStore::new();
        store.append(Message::human("code?")).unwrap();
        let older = Message::pending_bot().revised(Role::Bot, "```sh\nls\n```");
        store.append(older).unwrap();
        let newer = Message::pending_bot().revised(Role::Bot, "```py\na\n```\n\n```rs\nb\n```");
        let newer_id = newer.id.clone();
        store.append(newer).unwrap();
        store.append(Message::pending_bot().revised(Role::Bot, "no code")).unwrap();

        let (id, index, code) = latest_code_block(&store).expect("a block");
        assert_eq!(id, newer_id);
        assert_eq!(index, 1);
        assert_eq!(code, "b\n");
    }
}
