mod input;
mod streaming;

use tokio::sync::mpsc;

use super::App;
use crate::core::chat_stream::{StreamFailure, StreamMessage, StreamParams};
use crate::core::completion::BodyFraming;
use crate::core::message::MessageId;

#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    SubmitMessage {
        text: String,
    },
    StreamOpened {
        framing: BodyFraming,
        stream_id: u64,
    },
    AppendResponseChunk {
        content: String,
        stream_id: u64,
    },
    StreamErrored {
        failure: StreamFailure,
        stream_id: u64,
    },
    StreamAborted {
        stream_id: u64,
    },
    StreamCompleted {
        stream_id: u64,
    },
    CancelStreaming,
    ResetConversation,
    SetStatus {
        message: String,
    },
    ClearStatus,
    ScrollUp {
        lines: u16,
    },
    ScrollDown {
        lines: u16,
    },
    PageUp,
    PageDown,
    ScrollToEnd,
    CodeBlockCopied {
        message_id: MessageId,
        block_index: usize,
    },
}

impl AppAction {
    /// Lifts a message from the stream task into an action.
    pub fn from_stream(message: StreamMessage, stream_id: u64) -> Self {
        match message {
            StreamMessage::Opened(framing) => AppAction::StreamOpened { framing, stream_id },
            StreamMessage::Chunk(content) => AppAction::AppendResponseChunk { content, stream_id },
            StreamMessage::Error(failure) => AppAction::StreamErrored { failure, stream_id },
            StreamMessage::Aborted => AppAction::StreamAborted { stream_id },
            StreamMessage::End => AppAction::StreamCompleted { stream_id },
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AppActionContext {
    pub term_width: u16,
    pub term_height: u16,
}

pub struct AppActionEnvelope {
    pub action: AppAction,
    pub context: AppActionContext,
}

#[derive(Clone)]
pub struct AppActionDispatcher {
    tx: mpsc::UnboundedSender<AppActionEnvelope>,
}

impl AppActionDispatcher {
    pub fn new(tx: mpsc::UnboundedSender<AppActionEnvelope>) -> Self {
        Self { tx }
    }

    pub fn dispatch(&self, action: AppAction, ctx: AppActionContext) {
        self.dispatch_many([action], ctx);
    }

    pub fn dispatch_many<I>(&self, actions: I, ctx: AppActionContext)
    where
        I: IntoIterator<Item = AppAction>,
    {
        for action in actions.into_iter() {
            let _ = self.tx.send(AppActionEnvelope {
                action,
                context: ctx,
            });
        }
    }
}

pub enum AppCommand {
    SpawnStream(StreamParams),
}

pub fn apply_actions(
    app: &mut App,
    envelopes: impl IntoIterator<Item = AppActionEnvelope>,
) -> Vec<AppCommand> {
    let mut commands = Vec::new();
    for envelope in envelopes {
        if let Some(cmd) = apply_action(app, envelope.action, envelope.context) {
            commands.push(cmd);
        }
    }
    commands
}

pub fn apply_action(app: &mut App, action: AppAction, ctx: AppActionContext) -> Option<AppCommand> {
    match action {
        AppAction::SubmitMessage { .. }
        | AppAction::StreamOpened { .. }
        | AppAction::AppendResponseChunk { .. }
        | AppAction::StreamErrored { .. }
        | AppAction::StreamAborted { .. }
        | AppAction::StreamCompleted { .. }
        | AppAction::CancelStreaming
        | AppAction::ResetConversation => streaming::handle_streaming_action(app, action),

        AppAction::SetStatus { .. }
        | AppAction::ClearStatus
        | AppAction::ScrollUp { .. }
        | AppAction::ScrollDown { .. }
        | AppAction::PageUp
        | AppAction::PageDown
        | AppAction::ScrollToEnd
        | AppAction::CodeBlockCopied { .. } => {
            input::handle_input_action(app, action, ctx);
            None
        }
    }
}
