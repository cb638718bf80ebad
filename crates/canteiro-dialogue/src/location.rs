// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Best-effort location for attendance records.
//!
//! Sources are tried in order and the first that yields a point wins:
//! a recent location share in the chat, IP geolocation, a live location the
//! user sends on request, the selected site's coordinates, and finally a fixed
//! fallback point. Every step is bounded, so resolution always finishes.

use std::sync::Arc;
use std::time::Duration;

use canteiro_config::model::DialogueConfig;
use canteiro_core::{ChatClient, ChatEvent, GeoLocator, GeoPoint, Site};
use tracing::{debug, warn};

use crate::contacts::normalize_phone;
use crate::messages;
use crate::subscription::next_matching;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LocationSource {
    ChatShare,
    IpLookup,
    LiveShare,
    Site,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Found,
    Unavailable,
    TimedOut,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationAttempt {
    pub source: LocationSource,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub point: GeoPoint,
    pub source: LocationSource,
    pub attempts: Vec<LocationAttempt>,
}

pub struct LocationResolver {
    chat: Arc<dyn ChatClient>,
    geo: Arc<dyn GeoLocator>,
    ip_timeout: Duration,
    live_wait: Duration,
    fallback: GeoPoint,
}

impl LocationResolver {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        geo: Arc<dyn GeoLocator>,
        config: &DialogueConfig,
        ip_timeout: Duration,
    ) -> Self {
        Self {
            chat,
            geo,
            ip_timeout,
            live_wait: config.location_wait(),
            fallback: GeoPoint::new(config.fallback_latitude, config.fallback_longitude),
        }
    }

    /// Resolves a location for `phone`, prompting on `reply_to` if needed.
    pub async fn resolve(&self, reply_to: &str, phone: &str, site: Option<&Site>) -> ResolvedLocation {
        let mut attempts = Vec::with_capacity(5);

        let shared = match self.chat.recent_location_share(reply_to).await {
            Ok(Some(point)) => Some(point),
            Ok(None) => {
                attempts.push(attempt(LocationSource::ChatShare, StepOutcome::Unavailable));
                None
            }
            Err(e) => {
                attempts.push(attempt(LocationSource::ChatShare, StepOutcome::Failed(e.to_string())));
                None
            }
        };
        if let Some(point) = shared {
            return finish(point, LocationSource::ChatShare, attempts);
        }

        match tokio::time::timeout(self.ip_timeout, self.geo.locate()).await {
            Ok(Ok(Some(point))) => return finish(point, LocationSource::IpLookup, attempts),
            Ok(Ok(None)) => attempts.push(attempt(LocationSource::IpLookup, StepOutcome::Unavailable)),
            Ok(Err(e)) => {
                attempts.push(attempt(LocationSource::IpLookup, StepOutcome::Failed(e.to_string())))
            }
            Err(_) => attempts.push(attempt(LocationSource::IpLookup, StepOutcome::TimedOut)),
        }

        let (outcome, live) = self.wait_for_live_share(reply_to, phone).await;
        if let Some(point) = live {
            return finish(point, LocationSource::LiveShare, attempts);
        }
        attempts.push(attempt(LocationSource::LiveShare, outcome));

        match site.and_then(|s| s.location) {
            Some(point) => return finish(point, LocationSource::Site, attempts),
            None => attempts.push(attempt(LocationSource::Site, StepOutcome::Unavailable)),
        }

        warn!(phone, "no location source succeeded, using fallback coordinates");
        finish(self.fallback, LocationSource::Fallback, attempts)
    }

    async fn wait_for_live_share(&self, reply_to: &str, phone: &str) -> (StepOutcome, Option<GeoPoint>) {
        let mut rx = self.chat.subscribe();
        if let Err(e) = self
            .chat
            .send_message(reply_to, &messages::ask_live_location(self.live_wait))
            .await
        {
            return (StepOutcome::Failed(e.to_string()), None);
        }

        let result = next_matching(&mut rx, self.live_wait, |event| match event {
            ChatEvent::Message(m) => m.location.is_some() && normalize_phone(&m.from) == phone,
            _ => false,
        })
        .await;
        drop(rx);

        match result {
            Ok(ChatEvent::Message(m)) => (StepOutcome::Found, m.location),
            Ok(_) => (StepOutcome::Unavailable, None),
            Err(canteiro_core::CanteiroError::Timeout { .. }) => (StepOutcome::TimedOut, None),
            Err(e) => (StepOutcome::Failed(e.to_string()), None),
        }
    }
}

fn attempt(source: LocationSource, outcome: StepOutcome) -> LocationAttempt {
    LocationAttempt { source, outcome }
}

fn finish(point: GeoPoint, source: LocationSource, mut attempts: Vec<LocationAttempt>) -> ResolvedLocation {
    attempts.push(attempt(source, StepOutcome::Found));
    debug!(%source, steps = attempts.len(), "location resolved");
    ResolvedLocation {
        point,
        source,
        attempts,
    }
}
