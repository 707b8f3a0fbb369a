//! Background credential refresher
//!
//! Keeps the [`CredentialStore`] populated:
//! - one authorization attempt during [`TokenRefresher::start`]
//! - after a success, sleep for the reported `expires_in` then refresh
//! - after a failure, sleep for `failure_backoff` then retry
//! - optionally give up after `max_consecutive_failures`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mp_config::RefreshConfig;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::credential::{Credential, CredentialStore};
use crate::error::{ClientError, Result};

/// Performs one remote authorization call
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<Credential>;
}

#[derive(Debug, Clone)]
pub struct RefresherConfig {
    pub failure_backoff: Duration,
    /// `None` retries forever
    pub max_consecutive_failures: Option<u32>,
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            failure_backoff: Duration::from_secs(3),
            max_consecutive_failures: None,
        }
    }
}

impl From<&RefreshConfig> for RefresherConfig {
    fn from(config: &RefreshConfig) -> Self {
        Self {
            failure_backoff: config.failure_backoff(),
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }
}

enum Next {
    Sleep(Duration),
    GiveUp(ClientError),
}

pub struct TokenRefresher {
    source: Arc<dyn TokenSource>,
    store: Arc<CredentialStore>,
    config: RefresherConfig,
}

impl TokenRefresher {
    pub fn new(
        source: Arc<dyn TokenSource>,
        store: Arc<CredentialStore>,
        config: RefresherConfig,
    ) -> Self {
        Self { source, store, config }
    }

    /// Fetch and publish one credential, returning the delay until the next refresh
    pub async fn refresh_once(&self) -> Result<Duration> {
        let credential = self.source.fetch_token().await?;
        let expires_in = credential.expires_in;

        info!(
            token_prefix = %credential.token_prefix(),
            expires_in,
            "Access token refreshed"
        );
        self.store.replace(credential);

        if expires_in == 0 {
            warn!("Token response reported expires_in=0, using failure backoff");
            return Ok(self.config.failure_backoff);
        }
        Ok(Duration::from_secs(expires_in))
    }

    /// Retry until a credential is published or `max_attempts` is exhausted
    pub async fn authorize_with_retries(&self, max_attempts: u32) -> Result<Arc<Credential>> {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.refresh_once().await {
                Ok(_) => return Ok(self.store.current()),
                Err(e) if attempt >= max_attempts => {
                    error!(attempt, error = %e, "Authorization failed, giving up");
                    return Err(e);
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "Authorization failed, retrying");
                    tokio::time::sleep(self.config.failure_backoff).await;
                }
            }
        }
    }

    async fn step(&self, failures: &mut u32) -> Next {
        match self.refresh_once().await {
            Ok(delay) => {
                *failures = 0;
                debug!(delay_secs = delay.as_secs(), "Next refresh scheduled");
                Next::Sleep(delay)
            }
            Err(e) => {
                *failures += 1;
                if let Some(max) = self.config.max_consecutive_failures {
                    if *failures >= max {
                        error!(failures = *failures, error = %e, "Token refresh failed, stopping refresher");
                        return Next::GiveUp(e);
                    }
                }
                warn!(
                    failures = *failures,
                    errcode = ?e.remote_code(),
                    error = %e,
                    backoff_secs = self.config.failure_backoff.as_secs(),
                    "Token refresh failed"
                );
                Next::Sleep(self.config.failure_backoff)
            }
        }
    }

    /// Make the initial attempt, then spawn the refresh loop.
    ///
    /// Initial failure is not fatal: the loop retries after `failure_backoff`.
    pub async fn start(self) -> RefresherHandle {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let mut failures = 0;
        let first = self.step(&mut failures).await;

        let task = tokio::spawn(async move {
            let mut next = first;
            loop {
                let delay = match next {
                    Next::Sleep(delay) => delay,
                    Next::GiveUp(e) => return Err(e),
                };

                // A dropped handle closes the channel; only an explicit send stops the loop
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    Ok(()) = shutdown_rx.recv() => {
                        info!("Token refresher shutting down");
                        return Ok(());
                    }
                }

                next = self.step(&mut failures).await;
            }
        });

        RefresherHandle { shutdown_tx, task }
    }
}

pub struct RefresherHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<Result<()>>,
}

impl RefresherHandle {
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to end. Returns the last error if it gave up.
    pub async fn join(self) -> Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(ClientError::Task(e.to_string())),
        }
    }
}
