//! Inbound message model
//!
//! One [`InboundMessage`] is decoded per webhook request. The body is a tagged
//! union over the message kinds the platform delivers; events carry a nested
//! tag and, for menu and QR events, a free-form key.

use std::fmt;
use std::str::FromStr;

use crate::{Article, Music, TitleDesc};

// ============================================================================
// Type Tags
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgType {
    Text,
    Image,
    Voice,
    Video,
    Music,
    News,
    Location,
    Link,
    Event,
}

impl MsgType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MsgType::Text => "text",
            MsgType::Image => "image",
            MsgType::Voice => "voice",
            MsgType::Video => "video",
            MsgType::Music => "music",
            MsgType::News => "news",
            MsgType::Location => "location",
            MsgType::Link => "link",
            MsgType::Event => "event",
        }
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MsgType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(MsgType::Text),
            "image" => Ok(MsgType::Image),
            "voice" => Ok(MsgType::Voice),
            "video" => Ok(MsgType::Video),
            "music" => Ok(MsgType::Music),
            "news" => Ok(MsgType::News),
            "location" => Ok(MsgType::Location),
            "link" => Ok(MsgType::Link),
            "event" => Ok(MsgType::Event),
            other => Err(format!("unknown message type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Subscribe,
    Unsubscribe,
    Scan,
    /// Periodic location report
    Location,
    /// Menu click
    Click,
    /// Menu link
    View,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Subscribe => "subscribe",
            EventType::Unsubscribe => "unsubscribe",
            EventType::Scan => "scan",
            EventType::Location => "location",
            EventType::Click => "click",
            EventType::View => "view",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    /// Event names arrive in mixed case (`subscribe`, `SCAN`, `CLICK`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subscribe" => Ok(EventType::Subscribe),
            "unsubscribe" => Ok(EventType::Unsubscribe),
            "scan" => Ok(EventType::Scan),
            "location" => Ok(EventType::Location),
            "click" => Ok(EventType::Click),
            "view" => Ok(EventType::View),
            other => Err(format!("unknown event type: {}", other)),
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// Two-part coordinate (`Location_X` / `Location_Y` on the wire)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Account that received the message
    pub to_user: String,
    /// Sender's openid
    pub from_user: String,
    /// Unix seconds
    pub create_time: i64,
    /// Absent for events
    pub msg_id: Option<u64>,
    pub body: MessageBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Text {
        content: String,
    },
    Image {
        pic_url: String,
        media_id: String,
    },
    Voice {
        media_id: String,
        format: String,
        /// Speech recognition result, when enabled for the account
        recognition: Option<String>,
    },
    Video {
        media_id: String,
        thumb_media_id: String,
    },
    Music {
        info: TitleDesc,
        music: Music,
    },
    News {
        articles: Vec<Article>,
    },
    Location {
        coordinate: Coordinate,
        scale: i32,
        label: String,
    },
    Link {
        info: TitleDesc,
        url: String,
    },
    Event(Event),
    /// A message type this crate does not model
    Unknown {
        msg_type: String,
    },
}

impl MessageBody {
    pub fn msg_type(&self) -> Option<MsgType> {
        match self {
            MessageBody::Text { .. } => Some(MsgType::Text),
            MessageBody::Image { .. } => Some(MsgType::Image),
            MessageBody::Voice { .. } => Some(MsgType::Voice),
            MessageBody::Video { .. } => Some(MsgType::Video),
            MessageBody::Music { .. } => Some(MsgType::Music),
            MessageBody::News { .. } => Some(MsgType::News),
            MessageBody::Location { .. } => Some(MsgType::Location),
            MessageBody::Link { .. } => Some(MsgType::Link),
            MessageBody::Event(_) => Some(MsgType::Event),
            MessageBody::Unknown { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// `scene_key` and `ticket` are set when the follow came from a QR code scan
    Subscribe {
        scene_key: Option<String>,
        ticket: Option<String>,
    },
    Unsubscribe,
    Scan {
        key: String,
        ticket: Option<String>,
    },
    Location {
        latitude: f64,
        longitude: f64,
        precision: f64,
    },
    Click {
        key: String,
    },
    View {
        url: String,
    },
    Unknown {
        event: String,
        key: Option<String>,
    },
}

impl Event {
    pub fn event_type(&self) -> Option<EventType> {
        match self {
            Event::Subscribe { .. } => Some(EventType::Subscribe),
            Event::Unsubscribe => Some(EventType::Unsubscribe),
            Event::Scan { .. } => Some(EventType::Scan),
            Event::Location { .. } => Some(EventType::Location),
            Event::Click { .. } => Some(EventType::Click),
            Event::View { .. } => Some(EventType::View),
            Event::Unknown { .. } => None,
        }
    }

    /// The free-form key routed on by keyed registrations
    pub fn key(&self) -> Option<&str> {
        match self {
            Event::Click { key } | Event::Scan { key, .. } => Some(key.as_str()),
            Event::View { url } => Some(url.as_str()),
            _ => None,
        }
    }
}

impl InboundMessage {
    pub fn msg_type(&self) -> Option<MsgType> {
        self.body.msg_type()
    }

    pub fn event(&self) -> Option<&Event> {
        match &self.body {
            MessageBody::Event(event) => Some(event),
            _ => None,
        }
    }

    /// Text content, for text messages
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text { content } => Some(content.as_str()),
            _ => None,
        }
    }
}
