//! Post Composer - guided Telegram bot for composing social media posts
//!
//! Walks a user through content, schedule and target platforms, then hands
//! the finished post to a record store and a broadcast channel.

mod api;
mod calendar;
mod config;
mod finalize;
mod platform;
mod prompts;
mod runtime;
mod session;
mod sinks;
mod state_machine;
mod telegram;
mod ui;

use api::{create_router, AppState};
use config::Config;
use finalize::FinalizeService;
use runtime::{system_clock, ComposerRuntime, Dispatcher, ProductionRuntime};
use session::SessionStore;
use sinks::{AirtableStore, ChannelBroadcaster};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use telegram::TelegramClient;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often idle sessions are swept when a TTL is configured
const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "post_composer=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = Config::from_env()?;
    let client = Arc::new(TelegramClient::new(&config.telegram_token));

    let store = config.airtable.as_ref().map(AirtableStore::new);
    match &config.airtable {
        Some(airtable) => tracing::info!(base = %airtable.base_id, table = %airtable.table, "Airtable sink enabled"),
        None => tracing::warn!("AIRTABLE_API_KEY or AIRTABLE_BASE_ID not set, posts will not be stored"),
    }

    let broadcaster = config
        .broadcast_chat
        .map(|chat| ChannelBroadcaster::new(client.clone(), chat));
    match config.broadcast_chat {
        Some(chat) => tracing::info!(%chat, platform = %config.broadcast_platform, "Broadcast sink enabled"),
        None => tracing::info!("BROADCAST_CHAT_ID not set, broadcasting disabled"),
    }

    let sessions = Arc::new(SessionStore::new());
    let runtime: Arc<ProductionRuntime> = Arc::new(ComposerRuntime::new(
        config.compose.clone(),
        sessions.clone(),
        client.clone(),
        FinalizeService::new(store, broadcaster, config.broadcast_platform.clone()),
        system_clock(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(runtime));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            tracing::info!("Shutdown requested");
            cancel.cancel();
        });
    }

    if let Some(ttl) = config.session_ttl {
        tracing::info!(ttl_secs = ttl.as_secs(), "Session expiry enabled");
        let sessions = sessions.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            evict_idle_sessions(&sessions, ttl, &cancel).await;
        });
    }

    // Updates flow poller -> dispatcher -> per-user workers
    let (inbound_tx, inbound_rx) = mpsc::channel(256);
    let poller = {
        let client = client.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            telegram::poller::run(client.as_ref(), &inbound_tx, &cancel).await;
        })
    };
    let dispatch = {
        let dispatcher = dispatcher.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            dispatcher.run(inbound_rx, &cancel).await;
        })
    };

    // Start keep-alive server
    let app = create_router(AppState::new(sessions));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Post composer listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    // The listener only stops on cancellation; make sure the loops follow
    cancel.cancel();
    let _ = tokio::join!(poller, dispatch);
    tracing::info!("Post composer stopped");

    Ok(())
}

async fn evict_idle_sessions(sessions: &SessionStore, ttl: Duration, cancel: &CancellationToken) {
    let Ok(ttl) = chrono::Duration::from_std(ttl) else {
        tracing::error!("Session TTL out of range, expiry disabled");
        return;
    };
    let mut interval = tokio::time::interval(EVICTION_INTERVAL);
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let cutoff = chrono::Local::now().naive_local() - ttl;
                let evicted = sessions.evict_untouched_since(cutoff).await;
                if evicted > 0 {
                    tracing::info!(evicted, "Expired idle sessions");
                }
            }
        }
    }
}
