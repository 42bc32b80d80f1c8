//! Stream session bookkeeping and the cancellation controller.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::completion::BodyFraming;
use crate::core::message::MessageId;

/// Handle for one in-flight request.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    pub stream_id: u64,
    pub cancel_token: CancellationToken,
}

/// Hands out stream handles and guarantees at most one of them is live.
#[derive(Debug, Default)]
pub struct CancellationController {
    active: Option<StreamHandle>,
    last_stream_id: u64,
}

impl CancellationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new stream, cancelling whichever one was active.
    pub fn start(&mut self) -> StreamHandle {
        self.cancel_active();
        self.last_stream_id += 1;
        let handle = StreamHandle {
            stream_id: self.last_stream_id,
            cancel_token: CancellationToken::new(),
        };
        self.active = Some(handle.clone());
        debug!(stream_id = handle.stream_id, "stream started");
        handle
    }

    /// Cancels `handle` if it is still the active stream.
    pub fn cancel(&mut self, handle: &StreamHandle) -> bool {
        if self.is_current(handle.stream_id) {
            self.cancel_active()
        } else {
            false
        }
    }

    /// Cancels the active stream. No-op when nothing is running.
    pub fn cancel_active(&mut self) -> bool {
        match self.active.take() {
            Some(handle) => {
                handle.cancel_token.cancel();
                debug!(stream_id = handle.stream_id, "stream cancelled");
                true
            }
            None => false,
        }
    }

    /// Retires the active stream without cancelling it (it ended on its own).
    pub fn finish(&mut self, stream_id: u64) -> bool {
        if self.is_current(stream_id) {
            self.active = None;
            true
        } else {
            false
        }
    }

    pub fn is_current(&self, stream_id: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|handle| handle.stream_id == stream_id)
    }

    pub fn active(&self) -> Option<&StreamHandle> {
        self.active.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Streaming,
    Completed,
    Stopped,
    Failed,
}

/// Per-request state: which bot message is being filled and the raw text
/// received for it so far.
#[derive(Debug)]
pub struct StreamSession {
    pub stream_id: u64,
    pub message_id: MessageId,
    pub accumulated_text: String,
    pub framing: BodyFraming,
    pub state: SessionState,
}

impl StreamSession {
    pub fn new(stream_id: u64, message_id: MessageId) -> Self {
        Self {
            stream_id,
            message_id,
            accumulated_text: String::new(),
            framing: BodyFraming::Chunked,
            state: SessionState::Streaming,
        }
    }

    pub fn push_chunk(&mut self, chunk: &str) -> &str {
        self.accumulated_text.push_str(chunk);
        &self.accumulated_text
    }

    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Streaming
    }
}
