//! Webhook exchange state machine
//!
//! Every request ends in exactly one terminal state:
//!
//! ```text
//! request ──signature bad──────────────▶ Unauthenticated (401)
//!    │
//!    ├── GET ──────────────────────────▶ AuthenticatedGet (200, echostr)
//!    │
//!    └── POST ──decode failed─────────▶ Malformed (400)
//!              │
//!              ├──no route / no reply──▶ Undispatched (200, empty)
//!              └──reply written────────▶ Replied (200, xml)
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use mp_client::ApiClient;
use mp_common::{InboundMessage, XML_CONTENT_TYPE};
use tracing::{debug, error, info, warn};

use crate::decode::DecodeError;
use crate::dispatch::Dispatcher;
use crate::reply::ReplySink;
use crate::signature::SignatureVerifier;

#[derive(Debug)]
pub enum Exchange {
    Unauthenticated,
    AuthenticatedGet { echostr: String },
    Malformed(DecodeError),
    Undispatched,
    Replied(String),
}

/// Query parameters the platform appends to every webhook call.
///
/// All optional so a missing parameter fails the signature check instead of
/// the extractor.
#[derive(Debug, Default, Clone)]
pub struct WebhookQuery {
    pub signature: Option<String>,
    pub timestamp: Option<String>,
    pub nonce: Option<String>,
    pub echostr: Option<String>,
}

impl WebhookQuery {
    pub fn from_params(mut params: HashMap<String, String>) -> Self {
        Self {
            signature: params.remove("signature"),
            timestamp: params.remove("timestamp"),
            nonce: params.remove("nonce"),
            echostr: params.remove("echostr"),
        }
    }
}

impl Exchange {
    /// `Err` carries the terminal `Unauthenticated` state
    pub fn authenticate(verifier: &SignatureVerifier, query: &WebhookQuery) -> Result<(), Exchange> {
        let (Some(signature), Some(timestamp), Some(nonce)) =
            (&query.signature, &query.timestamp, &query.nonce)
        else {
            warn!("Webhook request missing signature parameters");
            return Err(Exchange::Unauthenticated);
        };

        if verifier.verify(signature, timestamp, nonce) {
            Ok(())
        } else {
            warn!(timestamp = %timestamp, nonce = %nonce, "Webhook signature mismatch");
            Err(Exchange::Unauthenticated)
        }
    }

    /// Route `message`, run the handler and collect its reply.
    ///
    /// The handler runs in its own task. The exchange waits at most
    /// `reply_timeout`; the handler keeps running afterwards but can no longer
    /// reply synchronously.
    pub async fn dispatch(
        dispatcher: &Dispatcher,
        client: &Arc<ApiClient>,
        message: Arc<InboundMessage>,
        reply_timeout: Duration,
    ) -> Exchange {
        let Some((route, handler)) = dispatcher.resolve(&message) else {
            debug!(
                from_user = %message.from_user,
                msg_type = ?message.msg_type(),
                "No handler registered, acknowledging"
            );
            return Exchange::Undispatched;
        };

        info!(route = %route, from_user = %message.from_user, "Dispatching message");
        let sink = ReplySink::new(&message, client.clone());

        let task = {
            let sink = sink.clone();
            tokio::spawn(async move { handler.handle(message, sink).await })
        };

        match tokio::time::timeout(reply_timeout, task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => error!(route = %route, error = %e, "Handler failed"),
            Ok(Err(e)) if e.is_panic() => error!(route = %route, "Handler panicked"),
            Ok(Err(e)) => error!(route = %route, error = %e, "Handler task failed"),
            Err(_) => warn!(
                route = %route,
                timeout_ms = reply_timeout.as_millis() as u64,
                "Handler still running at reply deadline, acknowledging"
            ),
        }

        match sink.close() {
            Some(xml) => Exchange::Replied(xml),
            None => Exchange::Undispatched,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Exchange::Unauthenticated => StatusCode::UNAUTHORIZED,
            Exchange::Malformed(_) => StatusCode::BAD_REQUEST,
            Exchange::AuthenticatedGet { .. } | Exchange::Undispatched | Exchange::Replied(_) => {
                StatusCode::OK
            }
        }
    }
}

impl IntoResponse for Exchange {
    fn into_response(self) -> Response {
        match self {
            Exchange::Unauthenticated => StatusCode::UNAUTHORIZED.into_response(),
            Exchange::AuthenticatedGet { echostr } => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                echostr,
            )
                .into_response(),
            Exchange::Malformed(e) => {
                warn!(error = %e, "Rejecting malformed payload");
                StatusCode::BAD_REQUEST.into_response()
            }
            Exchange::Undispatched => StatusCode::OK.into_response(),
            Exchange::Replied(xml) => {
                (StatusCode::OK, [(header::CONTENT_TYPE, XML_CONTENT_TYPE)], xml).into_response()
            }
        }
    }
}
