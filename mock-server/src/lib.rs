//! Stand-in for the local inference server's chat endpoint.
//!
//! Replies are chosen by the request's `model` field so tests can reach
//! every transport path: `empty` replies 200 with no body, `fail` replies
//! 500, `split` streams `{"response":"hi"}` in two chunks, and any other
//! model gets an echo of the message.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::stream;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub model: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    pub model: String,
    pub response: String,
    pub done: bool,
}

/// Every accepted chat request, oldest first.
pub type Journal = Arc<RwLock<Vec<ChatRequest>>>;

pub fn app() -> Router {
    app_with_journal(Journal::default())
}

pub fn app_with_journal(journal: Journal) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/health", get(health))
        .with_state(journal)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_journal(listener: TcpListener, journal: Journal) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_journal(journal)).await
}

async fn health() -> &'static str {
    "ok"
}

async fn chat(State(journal): State<Journal>, headers: HeaderMap, body: Bytes) -> Response {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if !is_json {
        return StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response();
    }

    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("rejecting malformed chat request: {e}");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };
    log::info!("chat request for model {} ({} bytes)", request.model, body.len());
    journal.write().await.push(request.clone());

    match request.model.as_str() {
        "empty" => StatusCode::OK.into_response(),
        "fail" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "model failed" })),
        )
            .into_response(),
        "split" => {
            let chunks = stream::iter([
                Ok::<_, std::io::Error>(Bytes::from_static(b"{\"resp")),
                Ok(Bytes::from_static(b"onse\":\"hi\"}")),
            ]);
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from_stream(chunks))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        _ => Json(ChatReply {
            model: request.model,
            response: format!("echo: {}", request.message),
            done: true,
        })
        .into_response(),
    }
}
