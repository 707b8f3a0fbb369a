//! MP Gateway Server
//!
//! Runs the verified webhook endpoint and keeps the access token fresh:
//! - Token refresher (first authorization before serving)
//! - Webhook at the configured path, `/health` for probes
//! - Built-in handlers: text echo and a welcome message for new followers

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mp_client::{ApiClient, ApiClientConfig, CredentialStore, RefresherConfig, TokenRefresher};
use mp_common::{EventType, InboundMessage, MsgType};
use mp_config::MpConfig;
use mp_webhook::{webhook_router, Dispatcher, ReplySink, WebhookState};

/// MP Gateway Server
#[derive(Parser, Debug)]
#[command(name = "mp-server")]
#[command(about = "Verified webhook endpoint and push API for an MP account")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, env = "MP_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides the configuration file
    #[arg(long, env = "MP_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "MP_LOG_JSON", default_value = "false")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting MP Gateway Server");

    let mut config = MpConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.listen_addr {
        config.webhook.listen_addr = addr;
    }

    // Credential store + API client
    let store = Arc::new(CredentialStore::new());
    let client = Arc::new(ApiClient::new(
        ApiClientConfig::from_config(&config.app, &config.api),
        store.clone(),
    )?);

    // Token refresher
    let refresher = TokenRefresher::new(
        client.clone(),
        store.clone(),
        RefresherConfig::from(&config.refresh),
    );
    let refresher_handle = refresher.start().await;
    if !store.is_ready() {
        warn!("Initial authorization failed; serving while the refresher retries");
    }

    // Handlers
    let dispatcher = Dispatcher::new()
        .on_message(MsgType::Text, echo_text)
        .on_event(EventType::Subscribe, welcome);

    let state = WebhookState::new(config.webhook.token.clone(), dispatcher, client)
        .with_reply_timeout(config.webhook.reply_timeout());
    let app = webhook_router(state, &config.webhook.path).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.webhook.listen_addr).await?;
    info!(
        addr = %config.webhook.listen_addr,
        path = %config.webhook.path,
        app_id = %config.app.app_id,
        "Webhook listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown signal received, stopping refresher");
    refresher_handle.shutdown();
    if let Err(e) = refresher_handle.join().await {
        error!(error = %e, "Token refresher ended with error");
    }

    info!("MP Gateway Server shutdown complete");
    Ok(())
}

async fn echo_text(message: Arc<InboundMessage>, reply: ReplySink) -> anyhow::Result<()> {
    let content = message.text().unwrap_or_default();
    reply.text(content.to_string())?;
    Ok(())
}

async fn welcome(message: Arc<InboundMessage>, reply: ReplySink) -> anyhow::Result<()> {
    info!(from_user = %message.from_user, "New follower");
    reply.text("Thanks for following!")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
