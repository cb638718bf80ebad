// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from [`CanteiroError`] to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use canteiro_core::CanteiroError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error; renders as `{"error": "..."}` with a matching status code.
#[derive(Debug)]
pub struct ApiError(pub CanteiroError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CanteiroError::NotFound { .. } => StatusCode::NOT_FOUND,
            CanteiroError::Validation(_) => StatusCode::BAD_REQUEST,
            CanteiroError::Authorization(_) => StatusCode::FORBIDDEN,
            CanteiroError::ClientNotReady | CanteiroError::Timeout { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CanteiroError::Service { .. } | CanteiroError::Chat { .. } => StatusCode::BAD_GATEWAY,
            CanteiroError::Config(_) | CanteiroError::Storage { .. } | CanteiroError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<CanteiroError> for ApiError {
    fn from(e: CanteiroError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
