//! Inbound side of the MP gateway
//!
//! - Request signature verification
//! - XML payload decoding into [`mp_common::InboundMessage`]
//! - Route-based dispatch to handlers
//! - One-shot synchronous replies, with push for everything else
//! - The axum router tying these together

pub mod decode;
pub mod dispatch;
pub mod exchange;
pub mod reply;
pub mod server;
pub mod signature;

pub use decode::{decode, DecodeError};
pub use dispatch::{Dispatcher, MessageHandler, Route};
pub use exchange::{Exchange, WebhookQuery};
pub use reply::{Reply, ReplyError, ReplySink};
pub use server::{
    webhook_router, WebhookState, DEFAULT_REPLY_TIMEOUT, DEFAULT_WEBHOOK_PATH, MAX_BODY_BYTES,
};
pub use signature::SignatureVerifier;
