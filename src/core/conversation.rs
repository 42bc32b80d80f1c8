//! Ordered, keyed message store for one chat session.
//!
//! Messages only ever change through [`MessageStore::append`],
//! [`MessageStore::replace`] and [`MessageStore::reset`]. Order is insertion
//! order and is never rearranged; a replaced message keeps its slot.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use crate::core::message::{Message, MessageId, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `append` was called with an id that is already present.
    DuplicateId(MessageId),
    /// Human messages cannot be changed after they are stored.
    HumanImmutable(MessageId),
    /// A second pending message was offered while another is unresolved.
    PendingInFlight { pending: MessageId },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DuplicateId(id) => write!(f, "message {id} already exists"),
            StoreError::HumanImmutable(id) => write!(f, "message {id} is a human message"),
            StoreError::PendingInFlight { pending } => {
                write!(f, "message {pending} is still pending")
            }
        }
    }
}

impl Error for StoreError {}

/// What a `replace` call ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Replaced(usize),
    Appended(usize),
}

#[derive(Debug, Default, Clone)]
pub struct MessageStore {
    messages: Vec<Message>,
    positions: HashMap<MessageId, usize>,
    pending: Option<MessageId>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.positions.get(id).map(|&index| &self.messages[index])
    }

    pub fn position(&self, id: &MessageId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The unresolved message, if any.
    pub fn pending_id(&self) -> Option<&MessageId> {
        self.pending.as_ref()
    }

    /// Adds a message with a previously unseen id. A message without text is
    /// recorded as the pending message.
    pub fn append(&mut self, message: Message) -> Result<usize, StoreError> {
        if self.positions.contains_key(&message.id) {
            return Err(StoreError::DuplicateId(message.id));
        }
        self.push(message)
    }

    /// Substitutes the message with the same id in place, or appends it if the
    /// id is unknown.
    pub fn replace(&mut self, message: Message) -> Result<Upsert, StoreError> {
        match self.positions.get(&message.id).copied() {
            Some(index) => {
                let current = &self.messages[index];
                if current.role == Role::Human {
                    return Err(StoreError::HumanImmutable(message.id));
                }
                self.messages[index] = message;
                Ok(Upsert::Replaced(index))
            }
            None => self.push(message).map(Upsert::Appended),
        }
    }

    /// Marks the pending message as resolved. Returns false if `id` was not
    /// the pending message.
    pub fn settle(&mut self, id: &MessageId) -> bool {
        if self.pending.as_ref() == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.messages.clear();
        self.positions.clear();
        self.pending = None;
    }

    /// Messages eligible to be sent upstream, oldest first.
    pub fn transcript(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|message| {
            message.role.to_api_party().is_some()
                && message
                    .text
                    .as_deref()
                    .is_some_and(|text| !text.trim().is_empty())
        })
    }

    fn push(&mut self, message: Message) -> Result<usize, StoreError> {
        if message.is_pending() {
            if let Some(pending) = &self.pending {
                return Err(StoreError::PendingInFlight {
                    pending: pending.clone(),
                });
            }
            self.pending = Some(message.id.clone());
        }
        let index = self.messages.len();
        self.positions.insert(message.id.clone(), index);
        self.messages.push(message);
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(id: &str, text: Option<&str>) -> Message {
        Message::new(MessageId::new(id), Role::Bot, text.map(str::to_string))
    }

    #[test]
    fn append_rejects_duplicate_ids() {
        let mut store = MessageStore::new();
        store.append(bot("a", Some("one"))).expect("first append");
        let err = store.append(bot("a", Some("two"))).unwrap_err();
        assert_eq!(err, StoreError::DuplicateId(MessageId::new("a")));
        assert_eq!(store.len(), 1);
        assert_eq!(store.messages()[0].text.as_deref(), Some("one"));
    }

    #[test]
    fn replace_of_unknown_id_behaves_like_append() {
        let message = bot("x", Some("hi"));

        let mut appended = MessageStore::new();
        appended.append(message.clone()).expect("append");

        let mut upserted = MessageStore::new();
        let outcome = upserted.replace(message).expect("replace");

        assert_eq!(outcome, Upsert::Appended(0));
        assert_eq!(appended.messages(), upserted.messages());
        assert_eq!(
            appended.position(&MessageId::new("x")),
            upserted.position(&MessageId::new("x"))
        );
    }

    #[test]
    fn replace_keeps_position_and_updates_content() {
        let mut store = MessageStore::new();
        store.append(Message::human("q1")).expect("human");
        store.append(bot("b", None)).expect("placeholder");
        store.append(bot("c", Some("later"))).expect("tail");

        let outcome = store.replace(bot("b", Some("answer"))).expect("replace");
        assert_eq!(outcome, Upsert::Replaced(1));

        let texts: Vec<_> = store.messages().iter().map(|m| m.text_or_empty()).collect();
        assert_eq!(texts, vec!["q1", "answer", "later"]);
        assert_eq!(store.position(&MessageId::new("b")), Some(1));
    }

    #[test]
    fn human_messages_are_immutable() {
        let mut store = MessageStore::new();
        let human = Message::human("hello");
        let id = human.id.clone();
        store.append(human.clone()).expect("append");
        let edited = Message {
            text: Some("edited".into()),
            ..human
        };
        assert_eq!(
            store.replace(edited).unwrap_err(),
            StoreError::HumanImmutable(id)
        );
        assert_eq!(store.messages()[0].text.as_deref(), Some("hello"));
    }

    #[test]
    fn only_one_pending_message_at_a_time() {
        let mut store = MessageStore::new();
        store.append(bot("p1", None)).expect("first pending");
        let err = store.append(bot("p2", None)).unwrap_err();
        assert_eq!(
            err,
            StoreError::PendingInFlight {
                pending: MessageId::new("p1")
            }
        );

        store.replace(bot("p1", Some("done"))).expect("fill");
        assert_eq!(store.pending_id(), Some(&MessageId::new("p1")));
        assert!(store.settle(&MessageId::new("p1")));
        assert!(store.pending_id().is_none());
        store.append(bot("p2", None)).expect("second pending after settle");
    }

    #[test]
    fn settle_ignores_other_ids() {
        let mut store = MessageStore::new();
        store.append(bot("p1", None)).expect("pending");
        assert!(!store.settle(&MessageId::new("other")));
        assert_eq!(store.pending_id(), Some(&MessageId::new("p1")));
    }

    #[test]
    fn reset_clears_everything() {
        let mut store = MessageStore::new();
        store.append(Message::human("q")).expect("human");
        store.append(bot("p", None)).expect("pending");
        store.reset();
        assert!(store.is_empty());
        assert!(store.pending_id().is_none());
        assert!(store.get(&MessageId::new("p")).is_none());
        store.append(bot("p", None)).expect("ids are free again");
    }

    #[test]
    fn transcript_skips_errors_and_empty_messages() {
        let mut store = MessageStore::new();
        store.append(Message::human("q")).expect("human");
        store.append(bot("b", Some("a"))).expect("bot");
        store
            .append(Message::new(
                MessageId::new("e"),
                Role::Error,
                Some("boom".into()),
            ))
            .expect("error");
        store.append(bot("p", None)).expect("pending");
        let texts: Vec<_> = store.transcript().map(|m| m.text_or_empty()).collect();
        assert_eq!(texts, vec!["q", "a"]);
    }
}
