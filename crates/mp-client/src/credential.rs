//! Credential store
//!
//! Holds the most recently published access token. Reads never block on
//! network I/O: the refresher builds the new [`Credential`] first and only
//! takes the write lock for the pointer swap.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    /// Validity window reported by the platform, in seconds
    pub expires_in: u64,
    pub obtained_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, expires_in: u64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_in,
            obtained_at: Utc::now(),
        }
    }

    /// Placeholder published before the first successful authorization
    pub fn pending() -> Self {
        Self {
            access_token: String::new(),
            expires_in: 0,
            obtained_at: DateTime::<Utc>::default(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.access_token.is_empty()
    }

    /// Saturates at `DateTime::<Utc>::MAX_UTC` for out-of-range windows
    pub fn expires_at(&self) -> DateTime<Utc> {
        i64::try_from(self.expires_in)
            .ok()
            .and_then(ChronoDuration::try_seconds)
            .and_then(|window| self.obtained_at.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Short token prefix safe to put in logs
    pub fn token_prefix(&self) -> &str {
        let end = self
            .access_token
            .char_indices()
            .nth(8)
            .map_or(self.access_token.len(), |(i, _)| i);
        &self.access_token[..end]
    }
}

#[derive(Debug)]
pub struct CredentialStore {
    current: RwLock<Arc<Credential>>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Credential::pending())),
        }
    }

    /// Store that starts with a known credential
    pub fn seeded(credential: Credential) -> Self {
        Self {
            current: RwLock::new(Arc::new(credential)),
        }
    }

    pub fn current(&self) -> Arc<Credential> {
        self.current.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        let current = self.current();
        if current.is_pending() {
            None
        } else {
            Some(current.access_token.clone())
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.current().is_pending()
    }

    pub(crate) fn replace(&self, credential: Credential) {
        let next = Arc::new(credential);
        *self.current.write() = next;
    }
}
