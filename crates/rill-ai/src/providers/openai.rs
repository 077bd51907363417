//! OpenAI-compatible Chat Completions streaming provider

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    providers::Upstream,
    stream::IncrementStream,
    types::CompletionRequest,
};

/// Environment variable holding the server-side upstream credential
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

/// Default upstream base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Streaming client for an OpenAI-compatible completions endpoint
pub struct OpenAIUpstream {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAIUpstream {
    /// Create a new upstream client with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV_VAR).map_err(|_| Error::MissingApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Override the base URL (self-hosted gateways, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(&self, request: &CompletionRequest) -> CompletionsBody {
        let mut messages = Vec::new();

        if !request.developer_message.is_empty() {
            messages.push(WireMessage {
                role: "system".to_string(),
                content: request.developer_message.clone(),
            });
        }
        messages.push(WireMessage {
            role: "user".to_string(),
            content: request.user_message.clone(),
        });

        CompletionsBody {
            model: request.model.id().to_string(),
            messages,
            stream: true,
        }
    }
}

#[async_trait]
impl Upstream for OpenAIUpstream {
    async fn stream(&self, request: &CompletionRequest) -> Result<IncrementStream> {
        let body = self.build_request(request);
        let url = format!("{}/chat/completions", self.base_url);

        let request_builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body);

        let mut event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        // Await the SSE open event so connection-time failures surface as a
        // plain `Err` and the caller can still answer with a clean HTTP error.
        match event_source.next().await {
            Some(Ok(Event::Open)) => {}
            Some(Ok(Event::Message(msg))) => {
                event_source.close();
                return Err(Error::UnexpectedResponse(format!(
                    "SSE message before open: {}",
                    msg.data
                )));
            }
            Some(Err(e)) => {
                event_source.close();
                return Err(connect_error(e).await);
            }
            None => {
                event_source.close();
                return Err(Error::UnexpectedResponse(
                    "stream closed before opening".to_string(),
                ));
            }
        }

        tracing::debug!(model = %request.model, "upstream stream opened");
        Ok(Box::pin(create_stream(event_source)))
    }
}

/// Map a connection-time eventsource failure to a crate error
async fn connect_error(err: reqwest_eventsource::Error) -> Error {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let message = response.text().await.unwrap_or_default();
            if message.is_empty() {
                Error::api(status.as_u16(), status.to_string())
            } else {
                Error::api(status.as_u16(), message)
            }
        }
        reqwest_eventsource::Error::Transport(e) => Error::Http(e),
        other => Error::Sse(other.to_string()),
    }
}

fn create_stream(mut event_source: EventSource) -> impl futures::Stream<Item = Result<String>> {
    stream! {
        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data == "[DONE]" {
                        break;
                    }

                    match serde_json::from_str::<StreamChunk>(&msg.data) {
                        Ok(chunk) => {
                            for text in chunk.deltas() {
                                yield Ok(text);
                            }
                        }
                        Err(e) => {
                            yield Err(Error::UnexpectedResponse(format!(
                                "Failed to parse chunk: {}",
                                e
                            )));
                            break;
                        }
                    }
                }
                // The server closed the stream without a [DONE] marker.
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(e) => {
                    yield Err(Error::Sse(e.to_string()));
                    break;
                }
            }
        }
        event_source.close();
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct CompletionsBody {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

impl StreamChunk {
    /// Extract the non-empty text deltas from this chunk, in order
    fn deltas(&self) -> impl Iterator<Item = String> + '_ {
        self.choices
            .iter()
            .filter_map(|c| c.delta.content.as_deref())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}
