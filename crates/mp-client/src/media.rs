//! Temporary media upload and download

use std::fmt;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::info;

use crate::client::ApiClient;
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Image,
    Voice,
    Video,
    Thumb,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Voice => "voice",
            MediaType::Video => "video",
            MediaType::Thumb => "thumb",
        }
    }

    fn default_mime(&self) -> &'static str {
        match self {
            MediaType::Image | MediaType::Thumb => "image/jpeg",
            MediaType::Voice => "audio/amr",
            MediaType::Video => "video/mp4",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedMedia {
    #[serde(rename = "type", default)]
    pub media_type: String,
    /// Thumbnails come back as `thumb_media_id`
    #[serde(alias = "thumb_media_id")]
    pub media_id: String,
    #[serde(default)]
    pub created_at: i64,
}

impl ApiClient {
    /// Upload a file as multipart field `media`
    pub async fn upload_media(
        &self,
        media_type: MediaType,
        filename: &str,
        content: impl Into<Bytes>,
    ) -> Result<UploadedMedia> {
        let part = Part::stream(content.into())
            .file_name(filename.to_string())
            .mime_str(media_type.default_mime())?;
        let form = Form::new().part("media", part);

        let uploaded: UploadedMedia = self
            .post_multipart("/media/upload", &[("type", media_type.as_str())], form)
            .await?;
        if uploaded.media_id.is_empty() {
            return Err(ClientError::invalid_response("upload response has no media_id"));
        }

        info!(media_type = %media_type, media_id = %uploaded.media_id, "Media uploaded");
        Ok(uploaded)
    }

    pub async fn download_media(&self, media_id: &str) -> Result<Bytes> {
        self.get_bytes("/media/get", &[("media_id", media_id)]).await
    }
}
