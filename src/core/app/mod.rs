//! The chat state machine.
//!
//! [`App`] owns every piece of mutable chat state. It changes only through
//! [`apply_action`], which the chat loop and `say` both drive with the
//! messages coming back from the stream task.

use crate::api::{ApiMessage, ChatRequest, CompletionRequest};
use crate::core::chat_stream::{RequestAuth, RequestBody, StreamParams};
use crate::core::config::{Settings, Transport};
use crate::core::conversation::MessageStore;
use crate::core::message::Message;
use crate::core::prompt::build_prompt;
use crate::core::session::{CancellationController, StreamHandle, StreamSession};
use crate::utils::url::construct_api_url;

pub mod actions;
pub mod ui_state;


pub use actions::{
    apply_action, apply_actions, AppAction, AppActionContext, AppActionDispatcher,
    AppActionEnvelope, AppCommand,
};
pub use ui_state::UiState;

/// Everything needed to talk to the upstream endpoint.
pub struct SessionContext {
    pub client: reqwest::Client,
    pub settings: Settings,
    pub auth: RequestAuth,
}

impl SessionContext {
    pub fn new(settings: Settings, auth: RequestAuth) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
            auth,
        }
    }

    pub fn request_url(&self) -> String {
        match self.settings.transport {
            Transport::Proxy => self.settings.endpoint.clone(),
            Transport::OpenaiCompletions => {
                construct_api_url(&self.settings.openai.base_url, "completions")
            }
        }
    }
}

pub struct App {
    pub store: MessageStore,
    pub controller: CancellationController,
    /// The request currently filling a bot message.
    pub stream: Option<StreamSession>,
    pub is_loading: bool,
    pub session: SessionContext,
    pub ui: UiState,
}

impl App {
    pub fn new(session: SessionContext) -> Self {
        Self {
            store: MessageStore::new(),
            controller: CancellationController::new(),
            stream: None,
            is_loading: false,
            session,
            ui: UiState::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.session.settings
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.controller.is_current(stream_id)
            && self
                .stream
                .as_ref()
                .is_some_and(|session| session.stream_id == stream_id)
    }

    /// Id of the bot message that is still receiving text, if any.
    pub fn streaming_message_id(&self) -> Option<&crate::core::message::MessageId> {
        self.stream
            .as_ref()
            .filter(|session| session.is_streaming())
            .map(|session| &session.message_id)
    }

    pub fn bot_placeholder(&self) -> Message {
        let placeholder = Message::pending_bot();
        match &self.session.settings.display_name {
            Some(name) => placeholder.with_display_name(name.clone()),
            None => placeholder,
        }
    }

    /// Builds the request from the stored transcript. Call before the pending
    /// placeholder exists or after; pending messages are never sent.
    pub fn build_stream_params(&self, handle: &StreamHandle) -> StreamParams {
        let settings = &self.session.settings;
        let body = match settings.transport {
            Transport::Proxy => RequestBody::Chat(ChatRequest {
                messages: self
                    .store
                    .transcript()
                    .filter_map(|message| {
                        Some(ApiMessage {
                            text: message.text.clone()?,
                            party: message.role.to_api_party()?.to_string(),
                        })
                    })
                    .collect(),
                model: settings.model.clone(),
            }),
            Transport::OpenaiCompletions => RequestBody::Completion(CompletionRequest {
                model: settings.model.clone(),
                prompt: build_prompt(self.store.transcript()),
                temperature: settings.openai.temperature,
                max_tokens: settings.openai.max_tokens,
                stream: true,
            }),
        };
        StreamParams {
            client: self.session.client.clone(),
            url: self.session.request_url(),
            body,
            auth: self.session.auth.clone(),
            cancel_token: handle.cancel_token.clone(),
            stream_id: handle.stream_id,
        }
    }
}
