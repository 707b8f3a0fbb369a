//! HTTP surface: the webhook endpoint and a health check

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::to_bytes;
use axum::extract::{Query, Request, State};
use axum::routing::get;
use axum::{Json, Router};
use mp_client::ApiClient;
use serde::Serialize;
use tracing::debug;

use crate::decode::{decode, DecodeError};
use crate::dispatch::Dispatcher;
use crate::exchange::{Exchange, WebhookQuery};
use crate::signature::SignatureVerifier;

pub const DEFAULT_WEBHOOK_PATH: &str = "/wechat";
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_millis(4500);
/// Upper bound on an authenticated message body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct WebhookState {
    verifier: Arc<SignatureVerifier>,
    dispatcher: Arc<Dispatcher>,
    client: Arc<ApiClient>,
    reply_timeout: Duration,
}

impl WebhookState {
    pub fn new(token: impl Into<String>, dispatcher: Dispatcher, client: Arc<ApiClient>) -> Self {
        Self {
            verifier: Arc::new(SignatureVerifier::new(token)),
            dispatcher: Arc::new(dispatcher),
            client,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }
}

/// Router serving the webhook at `path` plus `GET /health`
pub fn webhook_router(state: WebhookState, path: &str) -> Router {
    Router::new()
        .route(path, get(verify_handler).post(message_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

// The query is taken as a plain map so that no request is rejected by an
// extractor before its signature has been checked.

/// Verification handshake
async fn verify_handler(
    State(state): State<WebhookState>,
    Query(params): Query<HashMap<String, String>>,
) -> Exchange {
    let query = WebhookQuery::from_params(params);
    if let Err(rejected) = Exchange::authenticate(&state.verifier, &query) {
        return rejected;
    }
    debug!("Webhook verification handshake accepted");
    Exchange::AuthenticatedGet {
        echostr: query.echostr.unwrap_or_default(),
    }
}

async fn message_handler(
    State(state): State<WebhookState>,
    Query(params): Query<HashMap<String, String>>,
    request: Request,
) -> Exchange {
    let query = WebhookQuery::from_params(params);
    if let Err(rejected) = Exchange::authenticate(&state.verifier, &query) {
        return rejected;
    }

    let body = match to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => return Exchange::Malformed(DecodeError::Body(e.to_string())),
    };

    let message = match decode(&body) {
        Ok(message) => Arc::new(message),
        Err(e) => return Exchange::Malformed(e),
    };

    Exchange::dispatch(&state.dispatcher, &state.client, message, state.reply_timeout).await
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub credential: String,
}

async fn health_handler(State(state): State<WebhookState>) -> Json<HealthResponse> {
    let credential = if state.client.credentials().is_ready() {
        "READY"
    } else {
        "PENDING"
    };

    Json(HealthResponse {
        status: "UP".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        credential: credential.to_string(),
    })
}
