//! MP Gateway Configuration
//!
//! Resolution order: built-in defaults, then an optional TOML file, then
//! environment variable overrides.
//!
//! ```toml
//! [app]
//! app_id = "wx0123456789"
//! app_secret = "..."
//!
//! [webhook]
//! token = "shared-secret"
//! listen_addr = "0.0.0.0:8080"
//! path = "/wechat"
//! reply_timeout_ms = 4500
//!
//! [api]
//! base_url = "https://api.weixin.qq.com/cgi-bin"
//!
//! [refresh]
//! failure_backoff_secs = 3
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

pub const DEFAULT_API_BASE_URL: &str = "https://api.weixin.qq.com/cgi-bin";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MpConfig {
    pub app: AppConfig,
    pub webhook: WebhookConfig,
    pub api: ApiConfig,
    pub refresh: RefreshConfig,
}

/// Application credentials issued by the platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app_id: String,
    pub app_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Shared secret used for request signatures
    pub token: String,
    pub listen_addr: String,
    pub path: String,
    /// How long the exchange waits for a handler before acknowledging
    pub reply_timeout_ms: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            listen_addr: "0.0.0.0:8080".to_string(),
            path: "/wechat".to_string(),
            reply_timeout_ms: 4500,
        }
    }
}

impl WebhookConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Delay before retrying after a failed authorization
    pub failure_backoff_secs: u64,
    /// Stop the background loop after this many consecutive failures
    pub max_consecutive_failures: Option<u32>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            failure_backoff_secs: 3,
            max_consecutive_failures: None,
        }
    }
}

impl RefreshConfig {
    pub fn failure_backoff(&self) -> Duration {
        Duration::from_secs(self.failure_backoff_secs)
    }
}

impl MpConfig {
    /// Load configuration from an optional TOML file plus process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `MP_*` overrides using the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MP_APP_ID") {
            self.app.app_id = v;
        }
        if let Some(v) = lookup("MP_APP_SECRET") {
            self.app.app_secret = v;
        }
        if let Some(v) = lookup("MP_WEBHOOK_TOKEN") {
            self.webhook.token = v;
        }
        if let Some(v) = lookup("MP_LISTEN_ADDR") {
            self.webhook.listen_addr = v;
        }
        if let Some(v) = lookup("MP_WEBHOOK_PATH") {
            self.webhook.path = v;
        }
        if let Some(v) = lookup("MP_API_BASE_URL") {
            self.api.base_url = v;
        }
        if let Some(v) = lookup("MP_REFRESH_FAILURE_BACKOFF_SECS") {
            self.refresh.failure_backoff_secs = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MP_REFRESH_FAILURE_BACKOFF_SECS".to_string(),
                value: v.clone(),
            })?;
        }
        debug!("Applied environment overrides");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.app.app_id.trim().is_empty() {
            return Err(ConfigError::Missing("app.app_id"));
        }
        if self.app.app_secret.trim().is_empty() {
            return Err(ConfigError::Missing("app.app_secret"));
        }
        if self.webhook.token.trim().is_empty() {
            return Err(ConfigError::Missing("webhook.token"));
        }
        if !self.webhook.path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                key: "webhook.path".to_string(),
                value: self.webhook.path.clone(),
            });
        }
        if self.webhook.reply_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "webhook.reply_timeout_ms".to_string(),
                value: "0".to_string(),
            });
        }
        if self.refresh.failure_backoff_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "refresh.failure_backoff_secs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const SAMPLE: &str = r#"
[app]
app_id = "wx123"
app_secret = "s3cret"

[webhook]
token = "token"
path = "/mp"

[refresh]
failure_backoff_secs = 5
"#;

    #[test]
    fn test_defaults() {
        let config = MpConfig::default();
        assert_eq!(config.webhook.path, "/wechat");
        assert_eq!(config.webhook.reply_timeout(), Duration::from_millis(4500));
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.refresh.failure_backoff(), Duration::from_secs(3));
        assert!(config.refresh.max_consecutive_failures.is_none());
    }

    #[test]
    fn test_parse_toml_keeps_unset_defaults() {
        let config = MpConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.app.app_id, "wx123");
        assert_eq!(config.webhook.path, "/mp");
        assert_eq!(config.webhook.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.refresh.failure_backoff_secs, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = MpConfig::from_toml(SAMPLE).unwrap();
        let env: HashMap<&str, &str> = [
            ("MP_APP_ID", "wx999"),
            ("MP_API_BASE_URL", "http://localhost:9000"),
            ("MP_REFRESH_FAILURE_BACKOFF_SECS", "1"),
        ]
        .into_iter()
        .collect();

        config.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.app.app_id, "wx999");
        assert_eq!(config.app.app_secret, "s3cret");
        assert_eq!(config.api.base_url, "http://localhost:9000");
        assert_eq!(config.refresh.failure_backoff_secs, 1);
    }

    #[test]
    fn test_invalid_env_number() {
        let mut config = MpConfig::default();
        let err = config
            .apply_env(|k| (k == "MP_REFRESH_FAILURE_BACKOFF_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validate_requires_credentials() {
        let config = MpConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("app.app_id"))));

        let mut config = MpConfig::from_toml(SAMPLE).unwrap();
        config.webhook.token.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("webhook.token"))));
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let mut config = MpConfig::from_toml(SAMPLE).unwrap();
        config.refresh.failure_backoff_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "refresh.failure_backoff_secs"
        ));

        let mut config = MpConfig::from_toml(SAMPLE).unwrap();
        config.webhook.reply_timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "webhook.reply_timeout_ms"
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = MpConfig::from_file(file.path()).unwrap();
        assert_eq!(config.app.app_secret, "s3cret");
    }

    #[test]
    fn test_missing_file() {
        let err = MpConfig::from_file(Path::new("/nonexistent/mp.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
