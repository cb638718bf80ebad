// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST client for the backoffice API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;

use canteiro_config::model::ServicesConfig;
use canteiro_core::{
    AttendanceService, CanteiroError, ClientDirectory, ClientLookup, ClockReceipt, ClockRequest,
    ContractLookup, Notification, NotificationService, Site, SiteDirectory, TicketReceipt,
    TicketRequest, TicketService,
};

use crate::{check_status, decode, transport_error};

const CLIENTS: &str = "clients";
const TICKETS: &str = "tickets";
const ATTENDANCE: &str = "attendance";
const SITES: &str = "sites";
const NOTIFICATIONS: &str = "notifications";

/// One client for all backoffice endpoints, sharing a connection pool.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(config: &ServicesConfig) -> Result<Self, CanteiroError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            CanteiroError::Config(format!("invalid services.base_url `{}`: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(CanteiroError::Config(format!(
                "services.base_url `{}` cannot be used as a base URL",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = config.api_token.as_deref() {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                CanteiroError::Config(format!("invalid services.api_token header value: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| transport_error("backoffice", e))?;

        Ok(Self { http, base_url })
    }

    /// Appends percent-encoded path segments to the base URL.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        service: &str,
        url: Url,
    ) -> Result<T, CanteiroError> {
        debug!(service, url = %url, "backoffice GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(service, e))?;
        decode(service, check_status(service, response).await?).await
    }

    async fn post<B: serde::Serialize + ?Sized>(
        &self,
        service: &str,
        url: Url,
        body: &B,
    ) -> Result<reqwest::Response, CanteiroError> {
        debug!(service, url = %url, "backoffice POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(service, e))?;
        check_status(service, response).await
    }
}

#[async_trait]
impl ClientDirectory for HttpBackend {
    async fn lookup_client(&self, query: &str) -> Result<ClientLookup, CanteiroError> {
        let mut url = self.url(&["api", "clientes", "pesquisa"]);
        url.query_pairs_mut().append_pair("q", query.trim());
        self.get(CLIENTS, url).await
    }

    async fn lookup_contracts(&self, client_code: &str) -> Result<ContractLookup, CanteiroError> {
        let url = self.url(&["api", "clientes", client_code, "contratos"]);
        self.get(CLIENTS, url).await
    }
}

#[async_trait]
impl TicketService for HttpBackend {
    async fn submit_ticket(&self, request: TicketRequest) -> Result<TicketReceipt, CanteiroError> {
        let url = self.url(&["api", "pedidos"]);
        let response = self.post(TICKETS, url, &request).await?;
        decode(TICKETS, response).await
    }
}

#[async_trait]
impl AttendanceService for HttpBackend {
    async fn register_clock(&self, request: ClockRequest) -> Result<ClockReceipt, CanteiroError> {
        let url = self.url(&["api", "registo-ponto"]);
        let response = self.post(ATTENDANCE, url, &request).await?;
        decode(ATTENDANCE, response).await
    }
}

#[async_trait]
impl SiteDirectory for HttpBackend {
    async fn list_active_sites(&self) -> Result<Vec<Site>, CanteiroError> {
        self.get(SITES, self.url(&["api", "obras", "ativas"])).await
    }
}

#[async_trait]
impl NotificationService for HttpBackend {
    async fn notify(&self, notification: Notification) -> Result<(), CanteiroError> {
        let url = self.url(&["api", "notificacoes"]);
        self.post(NOTIFICATIONS, url, &notification).await?;
        Ok(())
    }
}
