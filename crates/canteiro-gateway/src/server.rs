// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router assembly and the listening server.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use canteiro_config::model::GatewayConfig;
use canteiro_core::{ActivityLog, CanteiroError, ChatClient, StorageAdapter};
use canteiro_cron::ScheduleRunner;
use canteiro_whatsapp::WhatsAppBridge;

use crate::auth::{AuthConfig, auth_middleware};
use crate::{contacts, handlers, schedules};

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageAdapter>,
    pub runner: Arc<ScheduleRunner>,
    pub chat: Arc<dyn ChatClient>,
    /// Receiver of bridge webhooks; `None` disables the webhook route.
    pub bridge: Option<Arc<WhatsAppBridge>>,
    pub activity: Arc<ActivityLog>,
    pub auth: AuthConfig,
    pub started_at: Instant,
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/webhooks/whatsapp", post(handlers::whatsapp_webhook))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route(
            "/v1/schedules",
            get(schedules::list).post(schedules::create),
        )
        .route(
            "/v1/schedules/{id}",
            get(schedules::get_one)
                .put(schedules::update)
                .delete(schedules::delete),
        )
        .route("/v1/schedules/{id}/trigger", post(schedules::trigger))
        .route("/v1/broadcasts/test", post(schedules::test_broadcast))
        .route(
            "/v1/contact-lists",
            get(contacts::list).post(contacts::create),
        )
        .route(
            "/v1/contact-lists/{id}",
            get(contacts::get_one)
                .put(contacts::update)
                .delete(contacts::delete),
        )
        .route("/v1/activity", get(handlers::activity))
        .route("/v1/whatsapp/status", get(handlers::whatsapp_status))
        .route("/v1/whatsapp/qr", get(handlers::whatsapp_qr))
        .route("/v1/whatsapp/restart", post(handlers::whatsapp_restart))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
}

/// Binds and serves until `cancel` fires.
pub async fn serve(
    config: &GatewayConfig,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), CanteiroError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CanteiroError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!(addr = %addr, "gateway listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| CanteiroError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
