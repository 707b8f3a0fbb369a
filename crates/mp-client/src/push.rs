//! Customer-service push messages
//!
//! Pushes are JSON envelopes `{touser, msgtype, <variant>}` posted to
//! `/message/custom/send`. Unlike synchronous replies they can be sent at any
//! time, any number of times.

use std::sync::Arc;

use mp_common::{ApiStatus, Article, Music, TitleDesc};
use serde::Serialize;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Result;

const CUSTOM_SEND_PATH: &str = "/message/custom/send";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub touser: String,
    #[serde(flatten)]
    pub body: PushBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "msgtype", rename_all = "lowercase")]
pub enum PushBody {
    Text { text: TextContent },
    Image { image: MediaContent },
    Voice { voice: MediaContent },
    Video { video: VideoContent },
    Music { music: MusicContent },
    News { news: NewsContent },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaContent {
    pub media_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoContent {
    pub media_id: String,
    #[serde(flatten)]
    pub info: TitleDesc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MusicContent {
    #[serde(flatten)]
    pub info: TitleDesc,
    #[serde(flatten)]
    pub music: Music,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsContent {
    pub articles: Vec<Article>,
}

impl PushBody {
    pub fn text(content: impl Into<String>) -> Self {
        PushBody::Text {
            text: TextContent { content: content.into() },
        }
    }

    pub fn image(media_id: impl Into<String>) -> Self {
        PushBody::Image {
            image: MediaContent { media_id: media_id.into() },
        }
    }

    pub fn voice(media_id: impl Into<String>) -> Self {
        PushBody::Voice {
            voice: MediaContent { media_id: media_id.into() },
        }
    }

    pub fn video(media_id: impl Into<String>, info: TitleDesc) -> Self {
        PushBody::Video {
            video: VideoContent { media_id: media_id.into(), info },
        }
    }

    pub fn music(info: TitleDesc, music: Music) -> Self {
        PushBody::Music {
            music: MusicContent { info, music },
        }
    }

    pub fn news(articles: Vec<Article>) -> Self {
        PushBody::News {
            news: NewsContent { articles },
        }
    }

    pub fn msg_type(&self) -> &'static str {
        match self {
            PushBody::Text { .. } => "text",
            PushBody::Image { .. } => "image",
            PushBody::Voice { .. } => "voice",
            PushBody::Video { .. } => "video",
            PushBody::Music { .. } => "music",
            PushBody::News { .. } => "news",
        }
    }
}

impl ApiClient {
    pub async fn push(&self, message: &PushMessage) -> Result<()> {
        debug!(touser = %message.touser, msgtype = message.body.msg_type(), "Sending push message");
        let _: ApiStatus = self.post_json(CUSTOM_SEND_PATH, message).await?;
        Ok(())
    }

    pub async fn send(&self, touser: impl Into<String>, body: PushBody) -> Result<()> {
        self.push(&PushMessage { touser: touser.into(), body }).await
    }
}

/// Push channel bound to a single recipient.
///
/// Cheap to clone and independent of any webhook exchange, so it can be moved
/// into spawned tasks that outlive the request.
#[derive(Clone)]
pub struct Pusher {
    client: Arc<ApiClient>,
    touser: String,
}

impl Pusher {
    pub fn new(client: Arc<ApiClient>, touser: impl Into<String>) -> Self {
        Self {
            client,
            touser: touser.into(),
        }
    }

    pub fn recipient(&self) -> &str {
        &self.touser
    }

    pub async fn send(&self, body: PushBody) -> Result<()> {
        self.client.send(self.touser.clone(), body).await
    }

    pub async fn text(&self, content: impl Into<String>) -> Result<()> {
        self.send(PushBody::text(content)).await
    }

    pub async fn image(&self, media_id: impl Into<String>) -> Result<()> {
        self.send(PushBody::image(media_id)).await
    }

    pub async fn voice(&self, media_id: impl Into<String>) -> Result<()> {
        self.send(PushBody::voice(media_id)).await
    }

    pub async fn video(&self, media_id: impl Into<String>, info: TitleDesc) -> Result<()> {
        self.send(PushBody::video(media_id, info)).await
    }

    pub async fn music(&self, info: TitleDesc, music: Music) -> Result<()> {
        self.send(PushBody::music(info, music)).await
    }

    pub async fn news(&self, articles: Vec<Article>) -> Result<()> {
        self.send(PushBody::news(articles)).await
    }
}
