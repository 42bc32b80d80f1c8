use std::error::Error;
use std::fmt;

use futures_util::{Stream, StreamExt};
use memchr::memchr;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ChatRequest, CompletionChunk, CompletionRequest};
use crate::auth::AuthKey;
use crate::core::completion::{parse_error_envelope, BodyFraming};

/// Shown when the request never reached the server.
pub const TRANSPORT_APOLOGY: &str =
    "Sorry, I couldn't reach the server. Check your connection and try again.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamFailure {
    /// The request could not be sent at all.
    Transport(String),
    /// The server answered with an error envelope.
    Server(String),
    /// The response was unusable (bad status, broken body).
    Malformed(String),
}

impl StreamFailure {
    /// Text for the error message added to the conversation.
    pub fn user_message(&self) -> String {
        match self {
            StreamFailure::Transport(_) => TRANSPORT_APOLOGY.to_string(),
            StreamFailure::Server(message) => message.clone(),
            StreamFailure::Malformed(description) => {
                format!("Something went wrong: {description}. Please try again later.")
            }
        }
    }
}

impl fmt::Display for StreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamFailure::Transport(detail) => write!(f, "request failed: {detail}"),
            StreamFailure::Server(message) => write!(f, "server error: {message}"),
            StreamFailure::Malformed(detail) => write!(f, "malformed response: {detail}"),
        }
    }
}

impl Error for StreamFailure {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    /// Response headers arrived.
    Opened(BodyFraming),
    Chunk(String),
    Error(StreamFailure),
    /// The stream was cancelled. Not an error.
    Aborted,
    End,
}

/// UTF-8 decoder that carries incomplete multi-byte sequences over to the
/// next chunk instead of mangling them.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    start = self.pending.len();
                    break;
                }
                Err(err) => {
                    let valid_end = start + err.valid_up_to();
                    out.push_str(
                        std::str::from_utf8(&self.pending[start..valid_end]).unwrap_or_default(),
                    );
                    match err.error_len() {
                        Some(len) => {
                            warn!("invalid UTF-8 sequence in response body");
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..start);
        out
    }

    /// Flushes whatever is left once the body has ended.
    pub fn finish(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEnd {
    Completed,
    Aborted,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadStep {
    Chunk(String),
    End(StreamEnd),
}

/// Lazily decodes a response body into text chunks.
///
/// Once an end has been reported every further call reports the same end.
/// Cancellation is checked before every chunk, so no text is handed out after
/// the token fires.
pub struct StreamReader<S> {
    inner: S,
    decoder: Utf8ChunkDecoder,
    cancel_token: CancellationToken,
    end: Option<StreamEnd>,
}

impl<S, B, E> StreamReader<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    pub fn new(inner: S, cancel_token: CancellationToken) -> Self {
        Self {
            inner,
            decoder: Utf8ChunkDecoder::default(),
            cancel_token,
            end: None,
        }
    }

    pub async fn next(&mut self) -> ReadStep {
        if let Some(end) = &self.end {
            return ReadStep::End(end.clone());
        }
        loop {
            let item = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => None,
                item = self.inner.next() => Some(item),
            };
            let Some(item) = item else {
                return self.close(StreamEnd::Aborted);
            };
            if self.cancel_token.is_cancelled() {
                return self.close(StreamEnd::Aborted);
            }
            match item {
                Some(Ok(bytes)) => {
                    let text = self.decoder.decode(bytes.as_ref());
                    if !text.is_empty() {
                        return ReadStep::Chunk(text);
                    }
                }
                Some(Err(err)) => return self.close(StreamEnd::Failed(err.to_string())),
                None => {
                    let tail = self.decoder.finish();
                    self.end = Some(StreamEnd::Completed);
                    if !tail.is_empty() {
                        return ReadStep::Chunk(tail);
                    }
                    return ReadStep::End(StreamEnd::Completed);
                }
            }
        }
    }

    fn close(&mut self, end: StreamEnd) -> ReadStep {
        self.end = Some(end.clone());
        ReadStep::End(end)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SseEvent {
    Delta(String),
    Failed(String),
    Done,
}

/// Splits server-sent events out of decoded text for the legacy completions
/// endpoint.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: String,
}

impl SseLineBuffer {
    pub fn push(&mut self, text: &str) -> Vec<SseEvent> {
        self.pending.push_str(text);
        let mut events = Vec::new();
        while let Some(newline_pos) = memchr(b'\n', self.pending.as_bytes()) {
            let line: String = self.pending.drain(..=newline_pos).collect();
            if let Some(event) = parse_sse_line(line.trim()) {
                let terminal = !matches!(event, SseEvent::Delta(_));
                events.push(event);
                if terminal {
                    self.pending.clear();
                    break;
                }
            }
        }
        events
    }

    /// Handles a final line that arrived without a newline.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let line = std::mem::take(&mut self.pending);
        parse_sse_line(line.trim())
    }
}

fn parse_sse_line(line: &str) -> Option<SseEvent> {
    let payload = line.strip_prefix("data:")?.trim_start();
    if payload == "[DONE]" {
        return Some(SseEvent::Done);
    }
    match serde_json::from_str::<CompletionChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .filter(|text| !text.is_empty())
            .map(SseEvent::Delta),
        Err(_) if payload.trim().is_empty() => None,
        Err(_) => Some(SseEvent::Failed(
            parse_error_envelope(payload).unwrap_or_else(|| payload.to_string()),
        )),
    }
}

#[derive(Debug)]
pub enum RequestBody {
    Chat(ChatRequest),
    Completion(CompletionRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestAuth {
    None,
    /// Proxy auth key, sent as a cookie.
    Cookie(AuthKey),
    Bearer(String),
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub url: String,
    pub body: RequestBody,
    pub auth: RequestAuth,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

fn build_request(
    client: &reqwest::Client,
    url: &str,
    body: &RequestBody,
    auth: &RequestAuth,
) -> reqwest::RequestBuilder {
    let request = client
        .post(url)
        .header(CONTENT_TYPE, "application/json");
    let request = match auth {
        RequestAuth::None => request,
        RequestAuth::Cookie(key) => request.header(COOKIE, key.cookie_header()),
        RequestAuth::Bearer(token) => request.bearer_auth(token),
    };
    match body {
        RequestBody::Chat(chat) => request.json(chat),
        RequestBody::Completion(completion) => request.json(completion),
    }
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let stream_id = params.stream_id;
            let send = |message: StreamMessage| {
                let _ = tx.send((message, stream_id));
            };
            run_stream(params, send).await;
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

async fn run_stream(params: StreamParams, send: impl Fn(StreamMessage)) {
    let StreamParams {
        client,
        url,
        body,
        auth,
        cancel_token,
        stream_id,
    } = params;

    debug!(stream_id, %url, "sending completion request");
    let request = build_request(&client, &url, &body, &auth);
    let response = tokio::select! {
        biased;
        _ = cancel_token.cancelled() => None,
        response = request.send() => Some(response),
    };
    let response = match response {
        None => return send(StreamMessage::Aborted),
        Some(Ok(response)) => response,
        Some(Err(err)) => {
            warn!(stream_id, error = %err, "completion request failed");
            return send(StreamMessage::Error(StreamFailure::Transport(err.to_string())));
        }
    };

    let status = response.status();
    if !status.is_success() {
        let text = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => None,
            text = response.text() => Some(text),
        };
        let Some(text) = text else {
            return send(StreamMessage::Aborted);
        };
        let text = text.unwrap_or_default();
        let failure = match parse_error_envelope(&text) {
            Some(message) => StreamFailure::Server(message),
            None => StreamFailure::Malformed(format!("the server responded with {status}")),
        };
        warn!(stream_id, %status, "completion request rejected");
        return send(StreamMessage::Error(failure));
    }

    let framing = if response.headers().contains_key(CONTENT_LENGTH) {
        BodyFraming::Sized
    } else {
        BodyFraming::Chunked
    };
    send(StreamMessage::Opened(framing));

    let mut sse = matches!(body, RequestBody::Completion(_)).then(SseLineBuffer::default);
    let mut reader = StreamReader::new(response.bytes_stream(), cancel_token);
    loop {
        match reader.next().await {
            ReadStep::Chunk(text) => match sse.as_mut() {
                Some(buffer) => {
                    for event in buffer.push(&text) {
                        if !forward_sse_event(event, &send) {
                            return;
                        }
                    }
                }
                None => send(StreamMessage::Chunk(text)),
            },
            ReadStep::End(StreamEnd::Completed) => {
                if let Some(event) = sse.as_mut().and_then(SseLineBuffer::finish) {
                    if !forward_sse_event(event, &send) {
                        return;
                    }
                }
                debug!(stream_id, "stream completed");
                return send(StreamMessage::End);
            }
            ReadStep::End(StreamEnd::Aborted) => return send(StreamMessage::Aborted),
            ReadStep::End(StreamEnd::Failed(detail)) => {
                warn!(stream_id, %detail, "response body failed");
                return send(StreamMessage::Error(StreamFailure::Malformed(detail)));
            }
        }
    }
}

/// Returns false once the event ended the stream.
fn forward_sse_event(event: SseEvent, send: &impl Fn(StreamMessage)) -> bool {
    match event {
        SseEvent::Delta(delta) => {
            send(StreamMessage::Chunk(delta));
            true
        }
        SseEvent::Done => {
            send(StreamMessage::End);
            false
        }
        SseEvent::Failed(message) => {
            send(StreamMessage::Error(StreamFailure::Server(message)));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn body(chunks: Vec<Result<Vec<u8>, String>>) -> impl Stream<Item = Result<Vec<u8>, String>> {
        stream::iter(chunks)
    }

    #[test]
    fn decoder_stitches_split_multibyte_characters() {
        let mut decoder = Utf8ChunkDecoder::default();
        let euro = "€".as_bytes();
        assert_eq!(decoder.decode(&[b'a', euro[0]]), "a");
        assert_eq!(decoder.decode(&euro[1..2]), "");
        assert_eq!(decoder.decode(&[euro[2], b'b']), "€b");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn decoder_replaces_invalid_bytes_and_keeps_going() {
        let mut decoder = Utf8ChunkDecoder::default();
        assert_eq!(decoder.decode(&[b'o', 0xff, b'k']), "o\u{fffd}k");
        assert_eq!(decoder.decode(&[0xc3]), "");
        assert_eq!(decoder.finish(), "\u{fffd}");
    }

    #[tokio::test]
    async fn reader_yields_chunks_then_completes() {
        let bytes = "héllo".as_bytes().to_vec();
        let (head, tail) = bytes.split_at(2);
        let mut reader = StreamReader::new(
            body(vec![Ok(head.to_vec()), Ok(tail.to_vec())]),
            CancellationToken::new(),
        );
        assert_eq!(reader.next().await, ReadStep::Chunk("h".into()));
        assert_eq!(reader.next().await, ReadStep::Chunk("éllo".into()));
        assert_eq!(reader.next().await, ReadStep::End(StreamEnd::Completed));
        assert_eq!(reader.next().await, ReadStep::End(StreamEnd::Completed));
    }

    #[tokio::test]
    async fn reader_stops_immediately_once_cancelled() {
        let token = CancellationToken::new();
        let mut reader = StreamReader::new(
            body(vec![Ok(b"one".to_vec()), Ok(b"two".to_vec())]),
            token.clone(),
        );
        assert_eq!(reader.next().await, ReadStep::Chunk("one".into()));
        token.cancel();
        assert_eq!(reader.next().await, ReadStep::End(StreamEnd::Aborted));
        assert_eq!(reader.next().await, ReadStep::End(StreamEnd::Aborted));
    }

    #[tokio::test]
    async fn reader_reports_body_errors() {
        let mut reader = StreamReader::new(
            body(vec![Ok(b"partial".to_vec()), Err("connection reset".into())]),
            CancellationToken::new(),
        );
        assert_eq!(reader.next().await, ReadStep::Chunk("partial".into()));
        assert_eq!(
            reader.next().await,
            ReadStep::End(StreamEnd::Failed("connection reset".into()))
        );
    }

    #[test]
    fn sse_buffer_extracts_deltas_across_chunk_boundaries() {
        let mut buffer = SseLineBuffer::default();
        assert!(buffer.push(r#"data: {"choices":[{"te"#).is_empty());
        assert_eq!(
            buffer.push("xt\":\"Hel\"}]}\n\ndata:{\"choices\":[{\"text\":\"lo\"}]}\n"),
            vec![SseEvent::Delta("Hel".into()), SseEvent::Delta("lo".into())]
        );
        assert_eq!(buffer.push("data: [DONE]\n"), vec![SseEvent::Done]);
    }

    #[test]
    fn sse_buffer_surfaces_error_payloads() {
        let mut buffer = SseLineBuffer::default();
        let events = buffer.push("data: {\"error\":{\"message\":\"bad key\"}}\ndata: [DONE]\n");
        assert_eq!(events, vec![SseEvent::Failed("bad key".into())]);
    }

    #[test]
    fn sse_buffer_flushes_unterminated_last_line() {
        let mut buffer = SseLineBuffer::default();
        assert!(buffer.push(r#"data: {"choices":[{"text":"end"}]}"#).is_empty());
        assert_eq!(buffer.finish(), Some(SseEvent::Delta("end".into())));
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn proxy_key_is_sent_as_the_auth_cookie() {
        let key = AuthKey::parse(&"a1".repeat(24)).expect("valid key");
        let body = RequestBody::Chat(ChatRequest {
            messages: Vec::new(),
            model: "gpt-3.5-turbo".into(),
        });
        let request = build_request(
            &reqwest::Client::new(),
            "http://localhost:3000/api/completion",
            &body,
            &RequestAuth::Cookie(key.clone()),
        )
        .build()
        .expect("request builds");

        let cookie = request.headers().get(COOKIE).expect("cookie header");
        assert_eq!(cookie.to_str().expect("ascii"), key.cookie_header());
        assert_eq!(cookie.to_str().expect("ascii"), format!("auth_key={}", "a1".repeat(24)));
        assert!(request.headers().get(reqwest::header::AUTHORIZATION).is_none());
    }

    #[test]
    fn failures_map_to_user_facing_text() {
        assert_eq!(
            StreamFailure::Transport("dns".into()).user_message(),
            TRANSPORT_APOLOGY
        );
        assert_eq!(
            StreamFailure::Server("rate limited".into()).user_message(),
            "rate limited"
        );
        assert_eq!(
            StreamFailure::Malformed("missing body".into()).user_message(),
            "Something went wrong: missing body. Please try again later."
        );
    }

    #[tokio::test]
    async fn service_tags_messages_with_stream_id() {
        let (service, mut rx) = ChatStreamService::new();
        service.send_for_test(StreamMessage::Chunk("x".into()), 7);
        assert_eq!(
            rx.recv().await,
            Some((StreamMessage::Chunk("x".into()), 7))
        );
    }
}
