//! Synchronous replies
//!
//! A handler may write at most one reply into the webhook response. The reply
//! is an `<xml>` envelope addressed back to the sender. Anything beyond that
//! (second messages, late answers) goes through [`Pusher`].

use std::sync::Arc;

use chrono::Utc;
use mp_client::{ApiClient, Pusher};
use mp_common::{Article, InboundMessage, Music, TitleDesc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplyError {
    #[error("A reply was already written for this message")]
    AlreadyReplied,

    #[error("The webhook exchange has already completed")]
    ExchangeClosed,

    #[error("Failed to encode reply: {0}")]
    Encode(String),
}

/// Reply payloads
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Image { media_id: String },
    Voice { media_id: String },
    Video { media_id: String, info: TitleDesc },
    Music { info: TitleDesc, music: Music },
    News(Vec<Article>),
}

impl Reply {
    pub fn msg_type(&self) -> &'static str {
        match self {
            Reply::Text(_) => "text",
            Reply::Image { .. } => "image",
            Reply::Voice { .. } => "voice",
            Reply::Video { .. } => "video",
            Reply::Music { .. } => "music",
            Reply::News(_) => "news",
        }
    }

    /// Encode as the `<xml>` envelope sent back to `to_user`
    pub fn to_xml(&self, to_user: &str, from_user: &str, create_time: i64) -> Result<String, ReplyError> {
        let mut envelope = Envelope {
            to_user,
            from_user,
            create_time,
            msg_type: self.msg_type(),
            content: None,
            image: None,
            voice: None,
            video: None,
            music: None,
            article_count: None,
            articles: None,
        };

        match self {
            Reply::Text(content) => envelope.content = Some(content),
            Reply::Image { media_id } => envelope.image = Some(XmlMedia { media_id }),
            Reply::Voice { media_id } => envelope.voice = Some(XmlMedia { media_id }),
            Reply::Video { media_id, info } => {
                envelope.video = Some(XmlVideo {
                    media_id,
                    title: &info.title,
                    description: &info.description,
                })
            }
            Reply::Music { info, music } => {
                envelope.music = Some(XmlMusic {
                    title: &info.title,
                    description: &info.description,
                    music_url: &music.music_url,
                    hq_music_url: &music.hq_music_url,
                    thumb_media_id: &music.thumb_media_id,
                })
            }
            Reply::News(articles) => {
                envelope.article_count = Some(articles.len());
                envelope.articles = Some(XmlArticles {
                    items: articles
                        .iter()
                        .map(|a| XmlArticle {
                            title: &a.info.title,
                            description: &a.info.description,
                            pic_url: &a.pic_url,
                            url: &a.url,
                        })
                        .collect(),
                });
            }
        }

        quick_xml::se::to_string(&envelope).map_err(|e| ReplyError::Encode(e.to_string()))
    }
}

// ============================================================================
// Wire Envelope
// ============================================================================

#[derive(Serialize)]
#[serde(rename = "xml")]
struct Envelope<'a> {
    #[serde(rename = "ToUserName")]
    to_user: &'a str,
    #[serde(rename = "FromUserName")]
    from_user: &'a str,
    #[serde(rename = "CreateTime")]
    create_time: i64,
    #[serde(rename = "MsgType")]
    msg_type: &'static str,
    #[serde(rename = "Content", skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(rename = "Image", skip_serializing_if = "Option::is_none")]
    image: Option<XmlMedia<'a>>,
    #[serde(rename = "Voice", skip_serializing_if = "Option::is_none")]
    voice: Option<XmlMedia<'a>>,
    #[serde(rename = "Video", skip_serializing_if = "Option::is_none")]
    video: Option<XmlVideo<'a>>,
    #[serde(rename = "Music", skip_serializing_if = "Option::is_none")]
    music: Option<XmlMusic<'a>>,
    #[serde(rename = "ArticleCount", skip_serializing_if = "Option::is_none")]
    article_count: Option<usize>,
    #[serde(rename = "Articles", skip_serializing_if = "Option::is_none")]
    articles: Option<XmlArticles<'a>>,
}

#[derive(Serialize)]
struct XmlMedia<'a> {
    #[serde(rename = "MediaId")]
    media_id: &'a str,
}

#[derive(Serialize)]
struct XmlVideo<'a> {
    #[serde(rename = "MediaId")]
    media_id: &'a str,
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Description")]
    description: &'a str,
}

#[derive(Serialize)]
struct XmlMusic<'a> {
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "MusicUrl")]
    music_url: &'a str,
    #[serde(rename = "HQMusicUrl")]
    hq_music_url: &'a str,
    #[serde(rename = "ThumbMediaId")]
    thumb_media_id: &'a str,
}

#[derive(Serialize)]
struct XmlArticles<'a> {
    #[serde(rename = "item")]
    items: Vec<XmlArticle<'a>>,
}

#[derive(Serialize)]
struct XmlArticle<'a> {
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "PicUrl")]
    pic_url: &'a str,
    #[serde(rename = "Url")]
    url: &'a str,
}

// ============================================================================
// Reply Sink
// ============================================================================

#[derive(Debug)]
enum SinkState {
    Open,
    Written(String),
    Closed { replied: bool },
}

/// One-shot reply slot for a single inbound message.
///
/// Clones share the same slot. The first successful write wins; the exchange
/// closes the slot when it builds the HTTP response.
#[derive(Clone)]
pub struct ReplySink {
    state: Arc<Mutex<SinkState>>,
    /// Inbound sender, who becomes the reply recipient
    to_user: String,
    /// Inbound recipient (the account)
    from_user: String,
    client: Arc<ApiClient>,
}

impl ReplySink {
    pub fn new(message: &InboundMessage, client: Arc<ApiClient>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SinkState::Open)),
            to_user: message.from_user.clone(),
            from_user: message.to_user.clone(),
            client,
        }
    }

    pub fn reply(&self, reply: Reply) -> Result<(), ReplyError> {
        let mut state = self.state.lock();
        match &*state {
            SinkState::Open => {
                let xml = reply.to_xml(&self.to_user, &self.from_user, Utc::now().timestamp())?;
                *state = SinkState::Written(xml);
                Ok(())
            }
            SinkState::Written(_) | SinkState::Closed { replied: true } => {
                warn!(to_user = %self.to_user, msg_type = reply.msg_type(), "Duplicate reply dropped");
                Err(ReplyError::AlreadyReplied)
            }
            SinkState::Closed { replied: false } => {
                warn!(
                    to_user = %self.to_user,
                    msg_type = reply.msg_type(),
                    "Reply written after the exchange completed, use push instead"
                );
                Err(ReplyError::ExchangeClosed)
            }
        }
    }

    pub fn text(&self, content: impl Into<String>) -> Result<(), ReplyError> {
        self.reply(Reply::Text(content.into()))
    }

    pub fn image(&self, media_id: impl Into<String>) -> Result<(), ReplyError> {
        self.reply(Reply::Image { media_id: media_id.into() })
    }

    pub fn voice(&self, media_id: impl Into<String>) -> Result<(), ReplyError> {
        self.reply(Reply::Voice { media_id: media_id.into() })
    }

    pub fn video(&self, media_id: impl Into<String>, info: TitleDesc) -> Result<(), ReplyError> {
        self.reply(Reply::Video { media_id: media_id.into(), info })
    }

    pub fn music(&self, info: TitleDesc, music: Music) -> Result<(), ReplyError> {
        self.reply(Reply::Music { info, music })
    }

    pub fn news(&self, articles: Vec<Article>) -> Result<(), ReplyError> {
        self.reply(Reply::News(articles))
    }

    pub fn has_replied(&self) -> bool {
        matches!(
            &*self.state.lock(),
            SinkState::Written(_) | SinkState::Closed { replied: true }
        )
    }

    /// Push channel to the same recipient; usable after the exchange closes
    pub fn push(&self) -> Pusher {
        Pusher::new(self.client.clone(), self.to_user.clone())
    }

    /// Close the slot and take the written body, if any
    pub(crate) fn close(&self) -> Option<String> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, SinkState::Closed { replied: false }) {
            SinkState::Written(xml) => {
                *state = SinkState::Closed { replied: true };
                Some(xml)
            }
            SinkState::Closed { replied } => {
                *state = SinkState::Closed { replied };
                None
            }
            SinkState::Open => None,
        }
    }
}
