// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Health, activity, WhatsApp session and webhook handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use canteiro_core::{ActivityEntry, ActivityFilter, ConnectionState};
use canteiro_whatsapp::{SIGNATURE_HEADER, WebhookError};

use crate::error::{ApiError, ErrorResponse};
use crate::server::AppState;

/// Entries returned by `/v1/activity` when no limit is given.
const DEFAULT_ACTIVITY_LIMIT: usize = 100;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub whatsapp: ConnectionState,
    pub schedules_registered: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub state: ConnectionState,
    pub ready: bool,
}

#[derive(Debug, Serialize)]
pub struct QrResponse {
    pub state: ConnectionState,
    pub qr: Option<String>,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        whatsapp: state.chat.connection_state(),
        schedules_registered: state.runner.registered().len(),
    })
}

/// GET /v1/activity?scope=&severity=&limit=
pub async fn activity(
    State(state): State<AppState>,
    Query(mut filter): Query<ActivityFilter>,
) -> Json<Vec<ActivityEntry>> {
    filter.limit = Some(filter.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT));
    Json(state.activity.query(&filter))
}

/// GET /v1/whatsapp/status
pub async fn whatsapp_status(State(state): State<AppState>) -> Json<SessionStatus> {
    let current = state.chat.connection_state();
    Json(SessionStatus {
        state: current,
        ready: current == ConnectionState::Ready,
    })
}

/// GET /v1/whatsapp/qr
pub async fn whatsapp_qr(State(state): State<AppState>) -> Result<Json<QrResponse>, ApiError> {
    Ok(Json(QrResponse {
        state: state.chat.connection_state(),
        qr: state.chat.pairing_code().await?,
    }))
}

/// POST /v1/whatsapp/restart
pub async fn whatsapp_restart(State(state): State<AppState>) -> Result<Json<SessionStatus>, ApiError> {
    tracing::info!("whatsapp session restart requested");
    state.chat.reconnect().await?;
    let current = state.chat.connection_state();
    Ok(Json(SessionStatus {
        state: current,
        ready: current == ConnectionState::Ready,
    }))
}

/// POST /webhooks/whatsapp
pub async fn whatsapp_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(bridge) = state.bridge.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    match bridge.accept_webhook(&body, signature) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "whatsapp webhook rejected");
            let status = match &e {
                WebhookError::Signature(_) => StatusCode::UNAUTHORIZED,
                WebhookError::Payload(_) => StatusCode::BAD_REQUEST,
            };
            (
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
