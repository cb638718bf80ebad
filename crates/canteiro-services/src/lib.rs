// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backoffice HTTP clients.
//!
//! [`HttpBackend`] implements every downstream service contract the dialogue
//! engine needs against the company's REST API; [`IpGeolocator`] asks an
//! ip-api compatible endpoint where the host is.

pub mod backend;
pub mod geo;

pub use backend::HttpBackend;
pub use geo::IpGeolocator;

use canteiro_core::CanteiroError;

/// Wraps a transport error as a service failure.
pub(crate) fn transport_error(service: &str, e: reqwest::Error) -> CanteiroError {
    CanteiroError::Service {
        service: service.to_string(),
        message: format!("request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Turns a non-2xx response into a service error carrying status and body.
pub(crate) async fn check_status(
    service: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, CanteiroError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    let message = if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    };
    Err(CanteiroError::service(service, message))
}

pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
    service: &str,
    response: reqwest::Response,
) -> Result<T, CanteiroError> {
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(service, e))?;
    serde_json::from_str(&body).map_err(|e| CanteiroError::Service {
        service: service.to_string(),
        message: format!("unexpected response body: {e}"),
        source: Some(Box::new(e)),
    })
}
