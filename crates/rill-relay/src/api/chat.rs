//! The streaming chat endpoint

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use rill_ai::{ChatModel, ChatRequest, CompletionRequest};
use uuid::Uuid;

use crate::api::{ErrorBody, SharedState};

// POST /api/chat
//
// Success is a streamed plain-text body: each upstream increment is forwarded
// as soon as it arrives, unframed and in order. Failures before the first
// increment get a clean HTTP error; failures after it can only abort the
// connection, which the client reads as a possibly-truncated turn.
pub async fn chat(
    State(state): State<SharedState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let request_id = Uuid::new_v4();

    if request.user_message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("user_message must not be empty")),
        )
            .into_response();
    }

    let model = ChatModel::parse_or_default(&request.model);
    if model.id() != request.model {
        tracing::debug!(
            %request_id,
            requested = %request.model,
            substituted = %model,
            "unrecognized model, substituting default"
        );
    }

    let completion = CompletionRequest {
        model,
        developer_message: request.developer_message,
        user_message: request.user_message,
    };

    let stream = match state.upstream.stream(&completion).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(
                %request_id,
                upstream_status = ?e.status(),
                error = %e,
                "upstream refused the stream"
            );
            return (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody::new(e.to_string())),
            )
                .into_response();
        }
    };

    tracing::debug!(%request_id, model = %model, "forwarding upstream stream");

    // An Err item aborts the connection mid-body. That abort is the only
    // failure signal available once streaming has begun: the client sees a
    // read error instead of a clean end-of-stream.
    let body = Body::from_stream(stream.map(move |increment| {
        increment.map_err(|e| {
            tracing::warn!(%request_id, error = %e, "upstream stream failed mid-flight");
            std::io::Error::other(e.to_string())
        })
    }));

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}
