//! Message routing
//!
//! Handlers are registered against a [`Route`]. For each inbound message the
//! dispatcher walks its candidate routes from most to least specific and the
//! first registered one handles it:
//!
//! - keyed events (click, view, scan): `event.click.K1`, `event.click`, `event`, any
//! - other events: `event.subscribe`, `event`, any
//! - other messages: `text`, any
//! - unknown message types: any

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use mp_common::{EventType, InboundMessage, MsgType};
use tracing::{debug, warn};

use crate::reply::ReplySink;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// Catch-all
    Any,
    Message(MsgType),
    Event(EventType),
    EventKey(EventType, String),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Any => f.write_str("*"),
            Route::Message(t) => write!(f, "{}", t),
            Route::Event(e) => write!(f, "event.{}", e),
            Route::EventKey(e, key) => write!(f, "event.{}.{}", e, key),
        }
    }
}

impl Route {
    /// Routes that could handle `message`, most specific first
    pub fn candidates(message: &InboundMessage) -> Vec<Route> {
        let mut routes = Vec::with_capacity(4);

        match message.msg_type() {
            Some(MsgType::Event) => {
                if let Some(event_type) = message.event().and_then(|e| e.event_type()) {
                    let key = message.event().and_then(|e| e.key());
                    if let Some(key) = key {
                        routes.push(Route::EventKey(event_type, key.to_string()));
                    }
                    routes.push(Route::Event(event_type));
                }
                routes.push(Route::Message(MsgType::Event));
            }
            Some(msg_type) => routes.push(Route::Message(msg_type)),
            None => {}
        }

        routes.push(Route::Any);
        routes
    }
}

/// Handles one routed message.
///
/// The handler runs in its own task. It may write one synchronous reply into
/// `reply` and push any number of messages via `reply.push()`.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(&self, message: Arc<InboundMessage>, reply: ReplySink) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> MessageHandler for F
where
    F: Fn(Arc<InboundMessage>, ReplySink) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, message: Arc<InboundMessage>, reply: ReplySink) -> anyhow::Result<()> {
        (self)(message, reply).await
    }
}

#[derive(Default, Clone)]
pub struct Dispatcher {
    handlers: HashMap<Route, Arc<dyn MessageHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `route`, replacing any previous registration
    pub fn register(&mut self, route: Route, handler: impl MessageHandler) {
        debug!(route = %route, "Registering handler");
        if self.handlers.insert(route.clone(), Arc::new(handler)).is_some() {
            warn!(route = %route, "Replaced existing handler");
        }
    }

    pub fn on(mut self, route: Route, handler: impl MessageHandler) -> Self {
        self.register(route, handler);
        self
    }

    pub fn on_any(self, handler: impl MessageHandler) -> Self {
        self.on(Route::Any, handler)
    }

    pub fn on_message(self, msg_type: MsgType, handler: impl MessageHandler) -> Self {
        self.on(Route::Message(msg_type), handler)
    }

    pub fn on_event(self, event_type: EventType, handler: impl MessageHandler) -> Self {
        self.on(Route::Event(event_type), handler)
    }

    pub fn on_event_key(
        self,
        event_type: EventType,
        key: impl Into<String>,
        handler: impl MessageHandler,
    ) -> Self {
        self.on(Route::EventKey(event_type, key.into()), handler)
    }

    /// Most specific registered route for `message`
    pub fn resolve(&self, message: &InboundMessage) -> Option<(Route, Arc<dyn MessageHandler>)> {
        Route::candidates(message)
            .into_iter()
            .find_map(|route| self.handlers.get(&route).map(|h| (route, h.clone())))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
