// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host location from its public IP address.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use canteiro_config::model::ServicesConfig;
use canteiro_core::{CanteiroError, GeoLocator, GeoPoint};

use crate::{check_status, decode, transport_error};

const SERVICE: &str = "geolocation";

/// Subset of the ip-api.com JSON answer.
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct IpGeolocator {
    http: reqwest::Client,
    url: String,
}

impl IpGeolocator {
    pub fn new(config: &ServicesConfig) -> Result<Self, CanteiroError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.geolocation_timeout_secs))
            .build()
            .map_err(|e| transport_error(SERVICE, e))?;
        Ok(Self {
            http,
            url: config.geolocation_url.clone(),
        })
    }
}

#[async_trait]
impl GeoLocator for IpGeolocator {
    async fn locate(&self) -> Result<Option<GeoPoint>, CanteiroError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let body: IpApiResponse = decode(SERVICE, check_status(SERVICE, response).await?).await?;

        if body.status.as_deref().is_some_and(|s| s != "success") {
            debug!(reason = ?body.message, "ip geolocation declined");
            return Ok(None);
        }
        Ok(match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        })
    }
}
