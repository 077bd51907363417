//! The chat client: streamed submission and conversation ownership.

use futures::StreamExt;
use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use rill_ai::ChatRequest;

use crate::{
    conversation::{Conversation, ConversationTurn},
    decode::StreamDecoder,
    error::ClientError,
    events::ClientEvent,
    handle::StreamHandle,
};

/// Developer message used when a submission leaves it blank
pub const DEFAULT_DEVELOPER_MESSAGE: &str =
    "You are a helpful assistant. Answer clearly and keep responses concise.";

/// Relay endpoint used when no configuration is present
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000";

/// The Stream Client: issues chat submissions and applies response
/// increments to the conversation as they arrive.
///
/// State is shared behind a mutex so observers (a front-end, tests) can read
/// it while a stream runs. At most one stream is active; a new submission
/// supersedes the previous one and a cleared conversation can never be
/// touched by an orphaned stream again.
pub struct ChatClient {
    endpoint: String,
    http: reqwest::Client,
    conversation: Arc<Mutex<Conversation>>,
    handle: StreamHandle,
    event_tx: broadcast::Sender<ClientEvent>,
}

impl ChatClient {
    /// Create a client talking to the given relay endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
            conversation: Arc::new(Mutex::new(Conversation::new())),
            handle: StreamHandle::new(),
            event_tx,
        }
    }

    /// The relay endpoint this client talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Subscribe to client events for live rendering
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.event_tx.subscribe()
    }

    /// Get a cloneable handle for aborting the active stream
    pub fn handle(&self) -> StreamHandle {
        self.handle.clone()
    }

    /// Snapshot of all turns, in order
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.conversation.lock().turns().to_vec()
    }

    /// Whether a stream is currently active
    pub fn is_streaming(&self) -> bool {
        self.conversation.lock().is_streaming()
    }

    /// The most recent error surfaced to the user, if any
    pub fn last_error(&self) -> Option<String> {
        self.conversation.lock().last_error().map(str::to_string)
    }

    /// Abort any active stream and empty the conversation
    pub fn clear(&self) {
        self.handle.abort();
        self.conversation.lock().clear();
        let _ = self.event_tx.send(ClientEvent::Cleared);
    }

    /// Submit a chat request and stream the response into the conversation.
    ///
    /// Completes when the stream ends or fails. An active previous stream is
    /// cancelled and its growing turn frozen before the new user turn is
    /// appended.
    pub async fn submit(&self, request: ChatRequest) -> Result<(), ClientError> {
        let user_message = request.user_message.trim().to_string();
        if user_message.is_empty() {
            return Err(ClientError::EmptyMessage);
        }

        let developer_message = if request.developer_message.trim().is_empty() {
            DEFAULT_DEVELOPER_MESSAGE.to_string()
        } else {
            request.developer_message.clone()
        };

        // Supersede any active stream before touching state.
        let cancel = self.handle.begin();
        {
            let mut conversation = self.conversation.lock();
            conversation.interrupt();
            conversation.push_user(user_message.clone());
        }
        let _ = self.event_tx.send(ClientEvent::UserTurn {
            content: user_message.clone(),
        });

        let body = ChatRequest {
            developer_message,
            user_message,
            model: request.model,
        };
        self.run_stream(&body, cancel).await
    }

    async fn run_stream(
        &self,
        request: &ChatRequest,
        cancel: CancellationToken,
    ) -> Result<(), ClientError> {
        let url = format!("{}/api/chat", self.endpoint);

        let response = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            response = self.http.post(&url).json(request).send() => response,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                let error = ClientError::Http(e);
                self.conversation.lock().set_error(error.to_string());
                let _ = self.event_tx.send(ClientEvent::StreamError {
                    message: error.to_string(),
                });
                return Err(error);
            }
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = read_error_body(response).await;
            if cancel.is_cancelled() {
                return Ok(());
            }
            let error = ClientError::Api { status, message };
            self.conversation.lock().set_error(error.to_string());
            let _ = self.event_tx.send(ClientEvent::StreamError {
                message: error.to_string(),
            });
            return Err(error);
        }

        if cancel.is_cancelled() {
            return Ok(());
        }
        let epoch = self.conversation.lock().begin_assistant();
        let _ = self.event_tx.send(ClientEvent::StreamStart);

        let mut decoder = StreamDecoder::new();
        let mut stream = response.bytes_stream();

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => {
                    // Aborted. clear() and resubmission reshape the state
                    // themselves; an external abort still has to freeze the
                    // growing turn, which the epoch guard makes safe here.
                    self.conversation.lock().interrupt_stream(epoch);
                    return Ok(());
                }
                chunk = stream.next() => chunk,
            };

            match chunk {
                None => {
                    if let Err(e) = decoder.finish() {
                        return self.fail(epoch, ClientError::Decode(e));
                    }
                    let content = {
                        let mut conversation = self.conversation.lock();
                        if !conversation.finish_stream(epoch) {
                            return Ok(());
                        }
                        conversation
                            .turns()
                            .last()
                            .map(|turn| turn.content.clone())
                            .unwrap_or_default()
                    };
                    let _ = self.event_tx.send(ClientEvent::StreamEnd { content });
                    return Ok(());
                }
                Some(Ok(bytes)) => {
                    let text = match decoder.feed(&bytes) {
                        Ok(text) => text,
                        Err(e) => return self.fail(epoch, ClientError::Decode(e)),
                    };
                    if text.is_empty() {
                        continue;
                    }
                    if !self.conversation.lock().apply_increment(epoch, &text) {
                        // Orphaned: the conversation was cleared or a new
                        // submission took over.
                        return Ok(());
                    }
                    let _ = self.event_tx.send(ClientEvent::Increment { delta: text });
                }
                Some(Err(e)) => {
                    return self.fail(epoch, ClientError::Stream(e.to_string()));
                }
            }
        }
    }

    /// Record a mid-stream failure. Orphaned streams fail silently.
    fn fail(&self, epoch: u64, error: ClientError) -> Result<(), ClientError> {
        let acted = self
            .conversation
            .lock()
            .fail_stream(epoch, error.to_string());
        if !acted {
            return Ok(());
        }
        tracing::warn!(%error, "stream failed");
        let _ = self.event_tx.send(ClientEvent::StreamError {
            message: error.to_string(),
        });
        Err(error)
    }
}

/// Extract a human-readable message from a non-2xx relay response.
///
/// The relay sends `{"error": "..."}`; plain-text bodies and empty bodies
/// degrade gracefully.
async fn read_error_body(response: reqwest::Response) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.is_empty() {
        return status.to_string();
    }
    serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        body::Body,
        extract::State,
        http::{StatusCode, header},
        response::{IntoResponse, Response},
        routing::post,
    };
    use rill_ai::ChatRequest;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio_stream::wrappers::ReceiverStream;

    /// Bind a throwaway relay on an ephemeral port and return its endpoint.
    async fn spawn_relay(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// A relay whose `/api/chat` answers each request with the next scripted
    /// body, in order.
    fn scripted_relay(bodies: Vec<Body>) -> Router {
        type Script = Arc<Mutex<VecDeque<Body>>>;

        async fn chat(State(script): State<Script>) -> Response {
            let body = script.lock().pop_front().unwrap_or_default();
            (
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                body,
            )
                .into_response()
        }

        let script: Script = Arc::new(Mutex::new(bodies.into_iter().collect()));
        Router::new()
            .route("/api/chat", post(chat))
            .with_state(script)
    }

    /// A body fed through a channel, so tests control chunk timing.
    fn channel_body() -> (
        tokio::sync::mpsc::Sender<Result<Vec<u8>, std::io::Error>>,
        Body,
    ) {
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<Vec<u8>, std::io::Error>>(16);
        (tx, Body::from_stream(ReceiverStream::new(rx)))
    }

    async fn wait_until(description: &str, mut condition: impl FnMut() -> bool) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for: {description}");
    }

    #[tokio::test]
    async fn test_empty_message_rejected_without_network() {
        // Endpoint is unroutable on purpose; validation must fire first.
        let client = ChatClient::new("http://127.0.0.1:1");
        let result = client.submit(ChatRequest::new("   \n  ")).await;

        assert!(matches!(result, Err(ClientError::EmptyMessage)));
        assert!(client.turns().is_empty());
        assert!(client.last_error().is_none());
    }

    #[tokio::test]
    async fn test_user_turn_appended_before_network_call() {
        let client = ChatClient::new("http://127.0.0.1:1");
        let result = client.submit(ChatRequest::new("Hello")).await;

        assert!(matches!(result, Err(ClientError::Http(_))));
        let turns = client.turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, crate::Role::User);
        assert_eq!(turns[0].content, "Hello");
        assert!(client.last_error().is_some());
    }

    #[tokio::test]
    async fn test_api_error_leaves_no_assistant_turn() {
        async fn chat() -> Response {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "upstream exploded" })),
            )
                .into_response()
        }
        let endpoint = spawn_relay(Router::new().route("/api/chat", post(chat))).await;

        let client = ChatClient::new(endpoint);
        let result = client.submit(ChatRequest::new("Hello")).await;

        match result {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }

        let turns = client.turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, crate::Role::User);
        assert_eq!(
            client.last_error().as_deref(),
            Some("API error (status 500): upstream exploded")
        );
    }

    #[tokio::test]
    async fn test_increments_concatenate_into_final_turn() {
        let body = Body::from_stream(futures::stream::iter(
            ["Hel", "lo ", "world"]
                .map(|s| Ok::<_, std::io::Error>(s.to_string())),
        ));
        let endpoint = spawn_relay(scripted_relay(vec![body])).await;

        let client = ChatClient::new(endpoint);
        client.submit(ChatRequest::new("Hi")).await.unwrap();

        let turns = client.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, crate::Role::Assistant);
        assert_eq!(turns[1].content, "Hello world");
        assert!(!client.is_streaming());
        assert!(client.last_error().is_none());
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_chunks() {
        // "你好" split inside both characters.
        let chunks: Vec<Vec<u8>> = vec![
            vec![0xE4, 0xBD],
            vec![0xA0, 0xE5, 0xA5],
            vec![0xBD],
        ];
        let body = Body::from_stream(futures::stream::iter(
            chunks.into_iter().map(Ok::<_, std::io::Error>),
        ));
        let endpoint = spawn_relay(scripted_relay(vec![body])).await;

        let client = ChatClient::new(endpoint);
        client.submit(ChatRequest::new("Hi")).await.unwrap();

        assert_eq!(client.turns()[1].content, "你好");
    }

    #[tokio::test]
    async fn test_midstream_failure_keeps_partial_content() {
        let (tx, body) = channel_body();
        let endpoint = spawn_relay(scripted_relay(vec![body])).await;

        let client = Arc::new(ChatClient::new(endpoint));
        let task = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.submit(ChatRequest::new("Hi")).await })
        };

        tx.send(Ok(b"Hello".to_vec())).await.unwrap();
        wait_until("partial content applied", || {
            client
                .turns()
                .last()
                .is_some_and(|t| t.content == "Hello")
        })
        .await;

        tx.send(Err(std::io::Error::other("relay died"))).await.unwrap();
        let result = task.await.unwrap();

        assert!(matches!(result, Err(ClientError::Stream(_))));
        let turns = client.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, "Hello");
        assert!(client.last_error().is_some());
        assert!(!client.is_streaming());
    }

    #[tokio::test]
    async fn test_midstream_failure_discards_empty_placeholder() {
        let (tx, body) = channel_body();
        let endpoint = spawn_relay(scripted_relay(vec![body])).await;

        let client = Arc::new(ChatClient::new(endpoint));
        let task = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.submit(ChatRequest::new("Hi")).await })
        };

        wait_until("placeholder created", || client.is_streaming()).await;
        tx.send(Err(std::io::Error::other("relay died"))).await.unwrap();
        let result = task.await.unwrap();

        assert!(result.is_err());
        let turns = client.turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, crate::Role::User);
    }

    #[tokio::test]
    async fn test_clear_during_stream_is_not_resurrected() {
        let (tx, body) = channel_body();
        let endpoint = spawn_relay(scripted_relay(vec![body])).await;

        let client = Arc::new(ChatClient::new(endpoint));
        let task = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.submit(ChatRequest::new("Hi")).await })
        };

        tx.send(Ok(b"Hel".to_vec())).await.unwrap();
        wait_until("first increment applied", || {
            client.turns().last().is_some_and(|t| t.content == "Hel")
        })
        .await;

        client.clear();
        assert!(client.turns().is_empty());

        // Increments from the orphaned stream must not reappear.
        let _ = tx.send(Ok(b"lo".to_vec())).await;
        drop(tx);
        task.await.unwrap().unwrap();

        assert!(client.turns().is_empty());
        assert!(!client.is_streaming());
        assert!(client.last_error().is_none());
    }

    #[tokio::test]
    async fn test_new_submission_supersedes_active_stream() {
        let (first_tx, first_body) = channel_body();
        let (second_tx, second_body) = channel_body();
        let endpoint = spawn_relay(scripted_relay(vec![first_body, second_body])).await;

        let client = Arc::new(ChatClient::new(endpoint));
        let first_task = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.submit(ChatRequest::new("one")).await })
        };

        first_tx.send(Ok(b"par".to_vec())).await.unwrap();
        wait_until("first stream progressed", || {
            client.turns().last().is_some_and(|t| t.content == "par")
        })
        .await;

        let second_task = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.submit(ChatRequest::new("two")).await })
        };

        second_tx.send(Ok(b"fresh".to_vec())).await.unwrap();
        drop(second_tx);
        second_task.await.unwrap().unwrap();

        // The first stream is orphaned: late chunks change nothing.
        let _ = first_tx.send(Ok(b"tial".to_vec())).await;
        drop(first_tx);
        first_task.await.unwrap().unwrap();

        let contents: Vec<String> = client.turns().iter().map(|t| t.content.clone()).collect();
        assert_eq!(contents, vec!["one", "par", "two", "fresh"]);
        assert!(!client.is_streaming());
    }

    #[tokio::test]
    async fn test_external_abort_freezes_partial_turn() {
        let (tx, body) = channel_body();
        let endpoint = spawn_relay(scripted_relay(vec![body])).await;

        let client = Arc::new(ChatClient::new(endpoint));
        let task = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.submit(ChatRequest::new("Hi")).await })
        };

        tx.send(Ok(b"par".to_vec())).await.unwrap();
        wait_until("partial content applied", || {
            client.turns().last().is_some_and(|t| t.content == "par")
        })
        .await;

        client.handle().abort();
        task.await.unwrap().unwrap();

        // A user-initiated abort is not an error; the partial turn stays.
        assert!(!client.is_streaming());
        assert_eq!(client.turns()[1].content, "par");
        assert!(client.last_error().is_none());
    }

    #[tokio::test]
    async fn test_blank_developer_message_gets_default() {
        // The relay echoes the developer message back as the stream body.
        async fn chat(Json(request): Json<ChatRequest>) -> Response {
            request.developer_message.into_response()
        }
        let endpoint = spawn_relay(Router::new().route("/api/chat", post(chat))).await;

        let client = ChatClient::new(endpoint);
        client.submit(ChatRequest::new("Hi")).await.unwrap();

        assert_eq!(client.turns()[1].content, DEFAULT_DEVELOPER_MESSAGE);
    }
}
