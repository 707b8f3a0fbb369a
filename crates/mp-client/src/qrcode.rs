//! Parametric QR codes
//!
//! Scanning one of these delivers a `subscribe` (new follower) or `SCAN`
//! (existing follower) event carrying the scene id.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::ApiClient;
use crate::error::{ClientError, Result};

const SHOW_QRCODE_URL: &str = "https://mp.weixin.qq.com/cgi-bin/showqrcode";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QrAction {
    /// Temporary code, valid for `expire_seconds`
    QrScene,
    QrLimitScene,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QrCodeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_seconds: Option<u64>,
    pub action_name: QrAction,
    pub action_info: ActionInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionInfo {
    pub scene: Scene,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scene {
    pub scene_id: u32,
}

impl QrCodeRequest {
    /// `expire` of `None` requests a permanent code
    pub fn new(scene_id: u32, expire: Option<Duration>) -> Self {
        let (action_name, expire_seconds) = match expire {
            Some(ttl) => (QrAction::QrScene, Some(ttl.as_secs())),
            None => (QrAction::QrLimitScene, None),
        };
        Self {
            expire_seconds,
            action_name,
            action_info: ActionInfo {
                scene: Scene { scene_id },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QrCode {
    pub ticket: String,
    /// Absent for permanent codes
    #[serde(default)]
    pub expire_seconds: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

impl QrCode {
    /// Where the code image can be fetched
    pub fn image_url(&self) -> Result<reqwest::Url> {
        reqwest::Url::parse_with_params(SHOW_QRCODE_URL, &[("ticket", self.ticket.as_str())])
            .map_err(|e| ClientError::invalid_request(e.to_string()))
    }
}

impl ApiClient {
    pub async fn create_qrcode(&self, scene_id: u32, expire: Option<Duration>) -> Result<QrCode> {
        let request = QrCodeRequest::new(scene_id, expire);
        let code: QrCode = self.post_json("/qrcode/create", &request).await?;
        info!(scene_id, expire_seconds = ?code.expire_seconds, "QR code created");
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_temporary_request() {
        let request = QrCodeRequest::new(123, Some(Duration::from_secs(1800)));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "expire_seconds": 1800,
                "action_name": "QR_SCENE",
                "action_info": {"scene": {"scene_id": 123}}
            })
        );
    }

    #[test]
    fn test_permanent_request_omits_expiry() {
        let request = QrCodeRequest::new(7, None);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"action_name": "QR_LIMIT_SCENE", "action_info": {"scene": {"scene_id": 7}}})
        );
    }

    #[test]
    fn test_image_url_escapes_ticket() {
        let code = QrCode {
            ticket: "gQH4/8TA==".to_string(),
            expire_seconds: None,
            url: None,
        };
        assert_eq!(
            code.image_url().unwrap().as_str(),
            "https://mp.weixin.qq.com/cgi-bin/showqrcode?ticket=gQH4%2F8TA%3D%3D"
        );
    }
}
