// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `canteiro serve` command implementation.
//!
//! Opens storage, connects to the WhatsApp bridge, wires the dialogue engine
//! to the backoffice services, registers every stored schedule and serves
//! the management API until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::{Duration, Instant};

use canteiro_config::model::CanteiroConfig;
use canteiro_core::{
    ActivityLog, CanteiroError, ChatClient, Clock, PluginAdapter, StorageAdapter, SystemClock,
};
use canteiro_cron::ScheduleRunner;
use canteiro_dialogue::shutdown;
use canteiro_dialogue::{Backends, BotLoop, DialogueEngine, EngineDeps, InMemoryConversations};
use canteiro_gateway::{AppState, AuthConfig};
use canteiro_services::{HttpBackend, IpGeolocator};
use canteiro_storage::SqliteStorage;
use canteiro_whatsapp::WhatsAppBridge;
use tracing::{error, info, warn};

pub async fn run_serve(config: CanteiroConfig) -> Result<(), CanteiroError> {
    init_tracing(&config.bot.log_level);

    info!(name = %config.bot.name, "starting canteiro serve");

    let storage = {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        Arc::new(storage)
    };
    let storage: Arc<dyn StorageAdapter> = storage;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let activity = Arc::new(ActivityLog::with_clock(
        config.schedule.activity_capacity,
        clock.clone(),
    ));

    let bridge = Arc::new(WhatsAppBridge::new(&config.whatsapp)?);
    match bridge.sync_session().await {
        Ok(state) => info!(state = %state, url = %config.whatsapp.bridge_url, "whatsapp bridge reachable"),
        // The supervisor and webhook events take over once the bridge is up.
        Err(e) => warn!(error = %e, url = %config.whatsapp.bridge_url, "whatsapp bridge unreachable at startup"),
    }
    let chat: Arc<dyn ChatClient> = bridge.clone();

    let backend = Arc::new(HttpBackend::new(&config.services)?);
    let backends = Backends {
        clients: backend.clone(),
        tickets: backend.clone(),
        attendance: backend.clone(),
        sites: backend.clone(),
        notifications: backend,
    };
    let geo = Arc::new(IpGeolocator::new(&config.services)?);

    let engine = Arc::new(DialogueEngine::new(
        config.dialogue.clone(),
        EngineDeps {
            chat: chat.clone(),
            storage: storage.clone(),
            conversations: Arc::new(InMemoryConversations::new()),
            backends,
            geo,
            geo_timeout: Duration::from_secs(config.services.geolocation_timeout_secs),
            activity: activity.clone(),
            clock: clock.clone(),
        },
    ));
    let bot = BotLoop::new(
        engine,
        chat.clone(),
        config.dialogue.sweep_interval(),
        config.dialogue.drain_timeout(),
    );

    let runner = Arc::new(ScheduleRunner::new(
        &config.schedule,
        storage.clone(),
        chat.clone(),
        activity.clone(),
        clock,
    )?);
    let started = runner.start_all().await?;
    info!(
        schedules = started,
        timezone = %runner.timezone(),
        "schedule runner started"
    );

    let cancel = shutdown::install_signal_handler();

    let supervisor = {
        let bridge = bridge.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { bridge.supervise(cancel).await })
    };

    let gateway = if config.gateway.enabled {
        if config.gateway.bearer_token.is_none() {
            warn!("gateway.bearer_token is not set, every /v1 request will be rejected");
        }
        let state = AppState {
            storage: storage.clone(),
            runner: runner.clone(),
            chat: chat.clone(),
            bridge: Some(bridge.clone()),
            activity,
            auth: AuthConfig {
                bearer_token: config.gateway.bearer_token.clone(),
            },
            started_at: Instant::now(),
        };
        let gateway_config = config.gateway.clone();
        let gateway_cancel = cancel.clone();
        Some(tokio::spawn(async move {
            if let Err(e) =
                canteiro_gateway::serve(&gateway_config, state, gateway_cancel.clone()).await
            {
                error!(error = %e, "gateway failed, shutting down");
                gateway_cancel.cancel();
            }
        }))
    } else {
        warn!("gateway disabled, bridge webhooks will not be received");
        None
    };

    bot.run(cancel.clone()).await;
    cancel.cancel();

    runner.shutdown().await;
    if let Some(handle) = gateway
        && let Err(e) = handle.await
    {
        warn!(error = %e, "gateway task ended abnormally");
    }
    if let Err(e) = supervisor.await {
        warn!(error = %e, "whatsapp supervisor ended abnormally");
    }
    if let Err(e) = bridge.shutdown().await {
        warn!(error = %e, "whatsapp bridge shutdown failed");
    }
    storage.close().await?;

    info!("canteiro serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("canteiro={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
