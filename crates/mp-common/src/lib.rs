//! Shared model for the MP gateway
//!
//! - Inbound message/event model decoded from webhook payloads
//! - Content types shared by synchronous replies and push calls
//! - The `{errcode, errmsg}` status envelope every remote call embeds
//! - Remote error code table

use serde::{Deserialize, Serialize};

pub mod codes;
pub mod message;

pub use message::{
    Coordinate, Event, EventType, InboundMessage, MessageBody, MsgType,
};

pub const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

// ============================================================================
// Shared Content Types
// ============================================================================

/// Title/description pair used by video, music, link and article payloads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleDesc {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl TitleDesc {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Music payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Music {
    #[serde(rename = "musicurl", default)]
    pub music_url: String,
    #[serde(rename = "hqmusicurl", default)]
    pub hq_music_url: String,
    #[serde(default)]
    pub thumb_media_id: String,
}

/// A single entry of a news (article list) message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(flatten)]
    pub info: TitleDesc,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "picurl", default)]
    pub pic_url: String,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
        pic_url: impl Into<String>,
    ) -> Self {
        Self {
            info: TitleDesc::new(title, description),
            url: url.into(),
            pic_url: pic_url.into(),
        }
    }
}

// ============================================================================
// Remote Status Envelope
// ============================================================================

/// Status fields embedded in every remote JSON response.
///
/// A zero or absent `errcode` means success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

impl ApiStatus {
    pub fn is_success(&self) -> bool {
        self.errcode == codes::SUCCESS
    }

    /// Converts a nonzero status into a [`RemoteError`]
    pub fn check(&self) -> Result<(), RemoteError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(RemoteError {
                code: self.errcode,
                message: self.errmsg.clone(),
            })
        }
    }
}

/// A nonzero `errcode` reported by the remote platform
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Remote error {code}: {message}")]
pub struct RemoteError {
    pub code: i64,
    pub message: String,
}

impl RemoteError {
    /// Expired or invalid access token; retryable once a fresh credential is published
    pub fn is_token_expired(&self) -> bool {
        matches!(
            self.code,
            codes::INVALID_CREDENTIAL | codes::ACCESS_TOKEN_INVALID | codes::ACCESS_TOKEN_TIMEOUT
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_absent_errcode_is_success() {
        let status: ApiStatus = serde_json::from_str(r#"{"access_token":"x"}"#).unwrap();
        assert!(status.is_success());
        assert!(status.check().is_ok());
    }

    #[test]
    fn test_status_nonzero_errcode_is_error() {
        let status: ApiStatus =
            serde_json::from_str(r#"{"errcode":40013,"errmsg":"invalid appid"}"#).unwrap();
        let err = status.check().unwrap_err();
        assert_eq!(err.code, 40013);
        assert_eq!(err.message, "invalid appid");
        assert!(!err.is_token_expired());
        assert!(err.to_string().contains("40013"));
    }

    #[test]
    fn test_token_expired_codes() {
        for code in [40001, 40014, 42001] {
            let err = RemoteError { code, message: String::new() };
            assert!(err.is_token_expired(), "code {} should be token-expired", code);
        }
    }

    #[test]
    fn test_article_json_shape() {
        let article = Article::new("t", "d", "https://u", "https://p");
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"title": "t", "description": "d", "url": "https://u", "picurl": "https://p"})
        );
    }
}
