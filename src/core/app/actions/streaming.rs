use tracing::{debug, warn};

use super::{App, AppAction, AppCommand};
use crate::core::chat_stream::StreamFailure;
use crate::core::completion::{classify_completion, ParsedCompletion};
use crate::core::message::{Message, Role};
use crate::core::session::{SessionState, StreamSession};

pub(super) fn handle_streaming_action(app: &mut App, action: AppAction) -> Option<AppCommand> {
    match action {
        AppAction::SubmitMessage { text } => submit_message(app, &text),
        AppAction::StreamOpened { framing, stream_id } => {
            if !app.is_current_stream(stream_id) {
                return None;
            }
            if let Some(session) = app.stream.as_mut() {
                session.framing = framing;
            }
            None
        }
        AppAction::AppendResponseChunk { content, stream_id } => {
            if !app.is_current_stream(stream_id) {
                return None;
            }
            append_response_chunk(app, &content);
            None
        }
        AppAction::StreamErrored { failure, stream_id } => {
            if !app.is_current_stream(stream_id) {
                return None;
            }
            handle_stream_error(app, failure);
            None
        }
        AppAction::StreamAborted { stream_id } => {
            if !app.is_current_stream(stream_id) {
                return None;
            }
            stop_stream(app);
            None
        }
        AppAction::StreamCompleted { stream_id } => {
            if !app.is_current_stream(stream_id) {
                return None;
            }
            complete_stream(app);
            None
        }
        AppAction::CancelStreaming => {
            if app.stream.is_some() {
                stop_stream(app);
                app.ui.set_status("Stopped");
            }
            None
        }
        AppAction::ResetConversation => {
            reset_conversation(app);
            None
        }
        _ => unreachable!("non-streaming action routed to streaming handler"),
    }
}

fn submit_message(app: &mut App, text: &str) -> Option<AppCommand> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if app.stream.is_some() {
        stop_stream(app);
    }

    if let Err(err) = app.store.append(Message::human(text)) {
        warn!(error = %err, "could not store human message");
        app.ui.set_status(format!("Could not send: {err}"));
        return None;
    }

    let handle = app.controller.start();
    let params = app.build_stream_params(&handle);
    let placeholder = app.bot_placeholder();
    let message_id = placeholder.id.clone();
    if let Err(err) = app.store.append(placeholder) {
        warn!(error = %err, "could not store bot placeholder");
        app.controller.cancel(&handle);
        app.ui.set_status(format!("Could not send: {err}"));
        return None;
    }

    app.stream = Some(StreamSession::new(handle.stream_id, message_id));
    app.is_loading = true;
    app.ui.clear_status();
    app.ui.enable_auto_scroll();
    debug!(stream_id = handle.stream_id, "submitted message");
    Some(AppCommand::SpawnStream(params))
}

fn append_response_chunk(app: &mut App, chunk: &str) {
    if chunk.is_empty() {
        return;
    }
    let Some(session) = app.stream.as_mut() else {
        return;
    };
    session.push_chunk(chunk);
    let parsed = classify_completion(&session.accumulated_text, session.framing, false);
    match parsed {
        ParsedCompletion::Reply(text) if text.is_empty() => {}
        ParsedCompletion::Reply(text) => write_stream_message(app, Role::Bot, text),
        ParsedCompletion::ServerError(message) => {
            write_stream_message(app, Role::Error, message);
            app.controller.cancel_active();
            finish_stream(app, SessionState::Failed);
        }
        ParsedCompletion::Withheld => {}
    }
}

fn complete_stream(app: &mut App) {
    let Some(session) = app.stream.as_ref() else {
        return;
    };
    let (role, text) = match classify_completion(&session.accumulated_text, session.framing, true)
    {
        ParsedCompletion::ServerError(message) => (Role::Error, message),
        ParsedCompletion::Reply(text) => (Role::Bot, text),
        ParsedCompletion::Withheld => (Role::Bot, String::new()),
    };
    let state = if role == Role::Error {
        SessionState::Failed
    } else {
        SessionState::Completed
    };
    write_stream_message(app, role, text);
    finish_stream(app, state);
}

fn handle_stream_error(app: &mut App, failure: StreamFailure) {
    warn!(error = %failure, "stream failed");
    write_stream_message(app, Role::Error, failure.user_message());
    finish_stream(app, SessionState::Failed);
}

/// Ends the active stream on user request. Partial text stays; a message that
/// never got text becomes empty.
fn stop_stream(app: &mut App) {
    app.controller.cancel_active();
    let Some(session) = app.stream.as_ref() else {
        app.is_loading = false;
        return;
    };
    let still_pending = app
        .store
        .get(&session.message_id)
        .is_some_and(Message::is_pending);
    if still_pending {
        write_stream_message(app, Role::Bot, String::new());
    }
    finish_stream(app, SessionState::Stopped);
}

fn reset_conversation(app: &mut App) {
    app.controller.cancel_active();
    if let Some(session) = app.stream.take() {
        debug!(stream_id = session.stream_id, "stream dropped by reset");
    }
    app.store.reset();
    app.is_loading = false;
    app.ui.copy_feedback = None;
    app.ui.enable_auto_scroll();
    app.ui.set_status("Conversation cleared");
}

/// Replaces the streaming message with new content under the same id.
fn write_stream_message(app: &mut App, role: Role, text: String) {
    let Some(session) = app.stream.as_ref() else {
        return;
    };
    let revised = match app.store.get(&session.message_id) {
        Some(current) => current.revised(role, text),
        None => Message::new(session.message_id.clone(), role, Some(text)),
    };
    if let Err(err) = app.store.replace(revised) {
        warn!(error = %err, "could not update streaming message");
    }
}

/// Moves the active session to its terminal state. Loading is always cleared.
fn finish_stream(app: &mut App, state: SessionState) {
    if let Some(mut session) = app.stream.take() {
        session.state = state;
        app.store.settle(&session.message_id);
        app.controller.finish(session.stream_id);
        debug!(stream_id = session.stream_id, ?state, "stream finished");
    }
    app.is_loading = false;
}
