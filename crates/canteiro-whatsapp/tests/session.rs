// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bridge session handling against a mock sidecar.

use std::sync::Arc;
use std::time::Duration;

use canteiro_config::model::WhatsAppConfig;
use canteiro_core::{CanteiroError, ChatClient, ChatEvent, ConnectionState, HealthStatus, PluginAdapter};
use canteiro_whatsapp::{BridgeEvent, WhatsAppBridge};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> WhatsAppConfig {
    WhatsAppConfig {
        bridge_url: server.uri(),
        reconnect_base_delay_secs: 0,
        restart_timeout_secs: 1,
        max_reconnect_attempts: 2,
        ..WhatsAppConfig::default()
    }
}

async fn session_mock(server: &MockServer, state: &str) {
    Mock::given(method("GET"))
        .and(path("/session"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"state": state})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn sync_session_adopts_bridge_state() {
    let server = MockServer::start().await;
    session_mock(&server, "ready").await;
    let bridge = WhatsAppBridge::new(&config(&server)).unwrap();

    assert_eq!(bridge.sync_session().await.unwrap(), ConnectionState::Ready);
    assert!(bridge.is_ready());
    assert_eq!(bridge.health_check().await.unwrap(), HealthStatus::Healthy);
}

#[tokio::test]
async fn health_reports_degraded_and_unreachable() {
    let server = MockServer::start().await;
    session_mock(&server, "awaiting_qr").await;
    let bridge = WhatsAppBridge::new(&config(&server)).unwrap();
    assert!(matches!(
        bridge.health_check().await.unwrap(),
        HealthStatus::Degraded(msg) if msg.contains("awaiting_qr")
    ));

    drop(server);
    let offline = WhatsAppBridge::new(&WhatsAppConfig {
        bridge_url: "http://127.0.0.1:9".into(),
        request_timeout_secs: 1,
        ..WhatsAppConfig::default()
    })
    .unwrap();
    assert!(matches!(
        offline.health_check().await.unwrap(),
        HealthStatus::Unhealthy(_)
    ));
}

#[tokio::test]
async fn send_goes_through_the_bridge_when_ready() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "wamid-9"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/contacts/351911111111/registered"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"registered": true})))
        .mount(&server)
        .await;

    let bridge = WhatsAppBridge::new(&config(&server)).unwrap();
    bridge.ingest(BridgeEvent::Ready);
    assert!(bridge.is_registered_user("351911111111@c.us").await.unwrap());
    let id = bridge.send_message("351911111111@c.us", "Olá").await.unwrap();
    assert_eq!(id.0, "wamid-9");
}

#[tokio::test]
async fn location_falls_back_to_the_bridge_for_unknown_chats() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chats/351922222222/location"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"location": null})))
        .expect(1)
        .mount(&server)
        .await;

    let bridge = WhatsAppBridge::new(&config(&server)).unwrap();
    assert_eq!(
        bridge.recent_location_share("351922222222@c.us").await.unwrap(),
        None
    );
}

#[tokio::test]
async fn reconnect_waits_for_ready() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session/restart"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let bridge = Arc::new(WhatsAppBridge::new(&config(&server)).unwrap());
    let ready = {
        let bridge = bridge.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            bridge.ingest(BridgeEvent::Ready);
        })
    };

    bridge.reconnect().await.unwrap();
    assert!(bridge.is_ready());
    ready.await.unwrap();
}

#[tokio::test]
async fn reconnect_times_out_without_ready() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session/restart"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let bridge = WhatsAppBridge::new(&config(&server)).unwrap();
    assert!(matches!(
        bridge.reconnect().await,
        Err(CanteiroError::Timeout { .. })
    ));
    assert_eq!(bridge.connection_state(), ConnectionState::Connecting);
}

#[tokio::test]
async fn supervisor_restarts_after_recoverable_disconnect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session/restart"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let bridge = Arc::new(WhatsAppBridge::new(&config(&server)).unwrap());
    let cancel = CancellationToken::new();
    let supervisor = tokio::spawn({
        let bridge = bridge.clone();
        let cancel = cancel.clone();
        async move { bridge.supervise(cancel).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut state = bridge.watch_state();
    bridge.ingest(BridgeEvent::Ready);
    bridge.ingest(BridgeEvent::Disconnected {
        reason: "NAVIGATION".into(),
    });

    tokio::time::timeout(
        Duration::from_secs(2),
        state.wait_for(|s| *s == ConnectionState::Connecting),
    )
    .await
    .expect("supervisor should start a restart")
    .unwrap();
    bridge.ingest(BridgeEvent::Ready);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(bridge.is_ready());

    cancel.cancel();
    supervisor.await.unwrap();
}

#[tokio::test]
async fn supervisor_ignores_logout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session/restart"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let bridge = Arc::new(WhatsAppBridge::new(&config(&server)).unwrap());
    let mut events = bridge.subscribe();
    let cancel = CancellationToken::new();
    let supervisor = tokio::spawn({
        let bridge = bridge.clone();
        let cancel = cancel.clone();
        async move { bridge.supervise(cancel).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    bridge.ingest(BridgeEvent::Disconnected {
        reason: "LOGOUT".into(),
    });
    assert!(matches!(
        events.recv().await.unwrap(),
        ChatEvent::Disconnected { .. }
    ));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);

    cancel.cancel();
    supervisor.await.unwrap();
}

#[tokio::test]
async fn supervisor_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session/restart"))
        .respond_with(ResponseTemplate::new(500).set_body_string("chrome crashed"))
        .expect(2)
        .mount(&server)
        .await;

    let bridge = Arc::new(WhatsAppBridge::new(&config(&server)).unwrap());
    let cancel = CancellationToken::new();
    let supervisor = tokio::spawn({
        let bridge = bridge.clone();
        let cancel = cancel.clone();
        async move { bridge.supervise(cancel).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    bridge.ingest(BridgeEvent::Disconnected {
        reason: "crash".into(),
    });
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(bridge.connection_state(), ConnectionState::Disconnected);

    cancel.cancel();
    supervisor.await.unwrap();
}
