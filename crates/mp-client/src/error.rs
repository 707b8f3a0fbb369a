//! Client error types

use mp_common::{codes, RemoteError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No access token has been obtained yet")]
    MissingCredential,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Refresher task failed: {0}")]
    Task(String),
}

impl ClientError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Remote `errcode`, when the failure came from the platform
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            ClientError::Remote(e) => Some(e.code),
            _ => None,
        }
    }

    /// True for the codes that mean the access token expired or was revoked.
    /// The call may succeed once the refresher publishes a new credential.
    pub fn is_token_expired(&self) -> bool {
        matches!(self, ClientError::Remote(e) if e.is_token_expired())
    }

    pub fn describe(&self) -> &'static str {
        match self.remote_code() {
            Some(code) => codes::describe(code),
            None => "local error",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expired_only_for_remote_codes() {
        let expired = ClientError::Remote(RemoteError {
            code: codes::ACCESS_TOKEN_TIMEOUT,
            message: "access_token expired".to_string(),
        });
        assert!(expired.is_token_expired());
        assert_eq!(expired.remote_code(), Some(42001));
        assert_eq!(expired.describe(), "access token expired");

        assert!(!ClientError::MissingCredential.is_token_expired());
        assert_eq!(ClientError::MissingCredential.remote_code(), None);
    }
}
