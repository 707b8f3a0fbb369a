//! HTTP client for the platform's JSON API
//!
//! Every call except `/token` carries the current access token from the
//! shared [`CredentialStore`]. Responses embed `{errcode, errmsg}`; a nonzero
//! code becomes [`ClientError::Remote`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use mp_common::ApiStatus;
use mp_config::{ApiConfig, AppConfig, DEFAULT_API_BASE_URL};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::credential::{Credential, CredentialStore};
use crate::error::{ClientError, Result};
use crate::refresher::TokenSource;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub app_id: String,
    pub app_secret: String,
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiClientConfig {
    pub fn from_config(app: &AppConfig, api: &ApiConfig) -> Self {
        Self {
            app_id: app.app_id.clone(),
            app_secret: app.app_secret.clone(),
            base_url: api.base_url.clone(),
            connect_timeout: api.connect_timeout(),
            request_timeout: api.request_timeout(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(flatten)]
    status: ApiStatus,
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

pub struct ApiClient {
    config: ApiClientConfig,
    http: reqwest::Client,
    store: Arc<CredentialStore>,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig, store: Arc<CredentialStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        info!(app_id = %config.app_id, base_url = %config.base_url, "API client created");
        Ok(Self { config, http, store })
    }

    pub fn app_id(&self) -> &str {
        &self.config.app_id
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn access_token(&self) -> Result<String> {
        self.store.access_token().ok_or(ClientError::MissingCredential)
    }

    /// One authorization round trip. Does not touch the store.
    pub async fn request_token(&self) -> Result<Credential> {
        let url = self.url("/token");
        debug!(app_id = %self.config.app_id, "Requesting access token");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("grant_type", "client_credential"),
                ("appid", self.config.app_id.as_str()),
                ("secret", self.config.app_secret.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body = response.bytes().await?;
        let token: TokenResponse = serde_json::from_slice(&body)?;
        token.status.check()?;

        if token.access_token.is_empty() {
            return Err(ClientError::invalid_response("token response has no access_token"));
        }
        Ok(Credential::new(token.access_token, token.expires_in))
    }

    /// GET `path` with the access token and extra query pairs
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let token = self.access_token()?;
        let response = self
            .http
            .get(self.url(path))
            .query(&[("access_token", token.as_str())])
            .query(query)
            .send()
            .await?
            .error_for_status()?;

        parse_body(path, response.bytes().await?)
    }

    /// POST a JSON body to `path` with the access token
    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.access_token()?;
        let response = self
            .http
            .post(self.url(path))
            .query(&[("access_token", token.as_str())])
            .json(body)
            .send()
            .await?
            .error_for_status()?;

        parse_body(path, response.bytes().await?)
    }

    /// POST a multipart form to `path` with the access token
    pub(crate) async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        let token = self.access_token()?;
        let response = self
            .http
            .post(self.url(path))
            .query(&[("access_token", token.as_str())])
            .query(query)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        parse_body(path, response.bytes().await?)
    }

    /// GET raw bytes; a JSON body is treated as an error envelope
    pub(crate) async fn get_bytes(&self, path: &str, query: &[(&str, &str)]) -> Result<Bytes> {
        let token = self.access_token()?;
        let response = self
            .http
            .get(self.url(path))
            .query(&[("access_token", token.as_str())])
            .query(query)
            .send()
            .await?
            .error_for_status()?;

        let body = response.bytes().await?;
        if let Ok(status) = serde_json::from_slice::<ApiStatus>(&body) {
            status.check()?;
            return Err(ClientError::invalid_response(format!(
                "{} returned a JSON body instead of content",
                path
            )));
        }
        Ok(body)
    }
}

fn parse_body<T: DeserializeOwned>(path: &str, body: Bytes) -> Result<T> {
    let status: ApiStatus = serde_json::from_slice(&body)?;
    if let Err(e) = status.check() {
        warn!(
            path = %path,
            errcode = e.code,
            meaning = mp_common::codes::describe(e.code),
            "Remote call rejected"
        );
        return Err(e.into());
    }
    Ok(serde_json::from_slice(&body)?)
}

#[async_trait]
impl TokenSource for ApiClient {
    async fn fetch_token(&self) -> Result<Credential> {
        self.request_token().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join_tolerates_trailing_slash() {
        let config = ApiClientConfig {
            base_url: "http://localhost:9000/cgi-bin/".to_string(),
            ..Default::default()
        };
        let client = ApiClient::new(config, Arc::new(CredentialStore::new())).unwrap();
        assert_eq!(client.url("/token"), "http://localhost:9000/cgi-bin/token");
    }

    #[test]
    fn test_parse_body_rejects_nonzero_errcode() {
        let body = Bytes::from_static(br#"{"errcode":45009,"errmsg":"api freq out of limit"}"#);
        let err = parse_body::<ApiStatus>("/menu/get", body).unwrap_err();
        assert_eq!(err.remote_code(), Some(45009));
    }

    #[tokio::test]
    async fn test_calls_without_token_fail_fast() {
        let client = ApiClient::new(ApiClientConfig::default(), Arc::new(CredentialStore::new())).unwrap();
        let err = client.get_json::<ApiStatus>("/menu/get", &[]).await.unwrap_err();
        assert!(matches!(err, ClientError::MissingCredential));
    }
}
