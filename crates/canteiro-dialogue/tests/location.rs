// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Location resolution chain.

use std::sync::Arc;
use std::time::Duration;

use canteiro_config::model::DialogueConfig;
use canteiro_core::{ChatClient, GeoPoint};
use canteiro_dialogue::location::StepOutcome;
use canteiro_dialogue::{LocationResolver, LocationSource};
use canteiro_test_utils::{GeoBehavior, MockChatClient, MockGeoLocator, site};

const PHONE: &str = "351912345678";
const ADDRESS: &str = "351912345678@c.us";

fn resolver(chat: &Arc<MockChatClient>, geo: GeoBehavior) -> LocationResolver {
    let config = DialogueConfig {
        location_wait_secs: 15,
        ..DialogueConfig::default()
    };
    let chat: Arc<dyn ChatClient> = chat.clone();
    LocationResolver::new(chat, Arc::new(MockGeoLocator::new(geo)), &config, Duration::from_secs(5))
}

#[tokio::test]
async fn recent_share_wins_without_prompting() {
    let chat = Arc::new(MockChatClient::new());
    chat.set_shared_location(PHONE, GeoPoint::new(41.1, -8.6));
    let r = resolver(&chat, GeoBehavior::Found(GeoPoint::new(0.0, 0.0)));

    let resolved = r.resolve(ADDRESS, PHONE, None).await;
    assert_eq!(resolved.source, LocationSource::ChatShare);
    assert_eq!(resolved.point, GeoPoint::new(41.1, -8.6));
    assert_eq!(resolved.attempts.len(), 1);
    assert_eq!(chat.sent_count(), 0);
}

#[tokio::test]
async fn ip_lookup_is_second() {
    let chat = Arc::new(MockChatClient::new());
    let r = resolver(&chat, GeoBehavior::Found(GeoPoint::new(38.0, -9.0)));

    let resolved = r.resolve(ADDRESS, PHONE, None).await;
    assert_eq!(resolved.source, LocationSource::IpLookup);
    assert_eq!(resolved.attempts[0].outcome, StepOutcome::Unavailable);
    assert_eq!(chat.sent_count(), 0);
}

#[tokio::test]
async fn live_share_answers_the_prompt() {
    let chat = Arc::new(MockChatClient::new());
    chat.share_location_after_next_reply(PHONE, GeoPoint::new(37.0, -7.9));
    let r = resolver(&chat, GeoBehavior::Fail("HTTP 429".into()));

    let resolved = r.resolve(ADDRESS, PHONE, None).await;
    assert_eq!(resolved.source, LocationSource::LiveShare);
    assert_eq!(resolved.point, GeoPoint::new(37.0, -7.9));
    assert!(matches!(resolved.attempts[1].outcome, StepOutcome::Failed(ref e) if e.contains("429")));
    assert!(chat.sent_to(PHONE)[0].contains("Partilhe a sua localização"));
}

#[tokio::test(start_paused = true)]
async fn site_coordinates_after_timeouts() {
    let chat = Arc::new(MockChatClient::new());
    let r = resolver(&chat, GeoBehavior::Hang);
    let obra = site(3, "Ponte", Some(GeoPoint::new(40.2, -8.4)));

    let resolved = r.resolve(ADDRESS, PHONE, Some(&obra)).await;
    assert_eq!(resolved.source, LocationSource::Site);
    assert_eq!(resolved.point, GeoPoint::new(40.2, -8.4));
    assert_eq!(resolved.attempts[1].outcome, StepOutcome::TimedOut);
    assert_eq!(resolved.attempts[2].outcome, StepOutcome::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn live_share_from_someone_else_is_ignored() {
    let chat = Arc::new(MockChatClient::new());
    chat.share_location_after_next_reply("351999999999", GeoPoint::new(1.0, 1.0));
    let r = resolver(&chat, GeoBehavior::Unavailable);

    let waiter = r.resolve(ADDRESS, PHONE, None);
    let other = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        chat.send_message("351999999999@c.us", "x").await.unwrap();
    };
    let (resolved, ()) = tokio::join!(waiter, other);
    assert_eq!(resolved.source, LocationSource::Fallback);
}

#[tokio::test(start_paused = true)]
async fn fallback_when_everything_fails() {
    let chat = Arc::new(MockChatClient::new());
    let r = resolver(&chat, GeoBehavior::Unavailable);

    let resolved = r.resolve(ADDRESS, PHONE, None).await;
    assert_eq!(resolved.source, LocationSource::Fallback);
    assert_eq!(resolved.point, GeoPoint::new(38.7223, -9.1393));
    let sources: Vec<_> = resolved.attempts.iter().map(|a| a.source).collect();
    assert_eq!(
        sources,
        vec![
            LocationSource::ChatShare,
            LocationSource::IpLookup,
            LocationSource::LiveShare,
            LocationSource::Site,
            LocationSource::Fallback,
        ]
    );
}

#[tokio::test]
async fn prompt_failure_skips_the_wait() {
    let chat = Arc::new(MockChatClient::new());
    chat.fail_sends_to(PHONE);
    let r = resolver(&chat, GeoBehavior::Unavailable);

    let started = std::time::Instant::now();
    let resolved = r.resolve(ADDRESS, PHONE, None).await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(resolved.source, LocationSource::Fallback);
    assert!(matches!(resolved.attempts[2].outcome, StepOutcome::Failed(_)));
}
