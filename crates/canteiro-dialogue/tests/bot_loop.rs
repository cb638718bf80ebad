// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The event loop: dispatch, per-phone ordering, sweeping and shutdown.

use std::sync::Arc;
use std::time::Duration;

use canteiro_core::ChatClient;
use canteiro_dialogue::{BotLoop, ConversationRepository, DialogueState};
use canteiro_test_utils::TestHarness;
use tokio_util::sync::CancellationToken;

const A: &str = "351912345678";
const B: &str = "351934567890";

async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..300 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

async fn harness() -> TestHarness {
    let h = TestHarness::builder().build().await.unwrap();
    h.add_contact_list(
        "Equipa",
        true,
        false,
        vec![TestHarness::contact("Rui", A), TestHarness::contact("Zé", B)],
    )
    .await
    .unwrap();
    h.backend.add_client("C001", "ACME");
    h
}

fn bot(h: &TestHarness, sweep: Duration) -> Arc<BotLoop> {
    let chat: Arc<dyn ChatClient> = h.chat.clone();
    Arc::new(BotLoop::new(
        h.engine.clone(),
        chat,
        sweep,
        Duration::from_secs(5),
    ))
}

#[tokio::test]
async fn dispatches_messages_in_order_per_phone() {
    let h = harness().await;
    let bot = bot(&h, Duration::from_secs(300));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let bot = bot.clone();
        let cancel = cancel.clone();
        async move { bot.run(cancel).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    h.chat.inject_text(&TestHarness::address(A), "pedido");
    h.chat.inject_text(&TestHarness::address(A), "ACME");
    h.chat.inject_text(&TestHarness::address(B), "pedido");

    let chat = h.chat.clone();
    eventually(|| chat.sent_to(A).len() == 2 && chat.sent_to(B).len() == 1).await;
    assert_eq!(
        h.conversation(A).map(|c| c.state),
        Some(DialogueState::WaitingProblem)
    );
    assert_eq!(
        h.conversation(B).map(|c| c.state),
        Some(DialogueState::WaitingClient)
    );

    cancel.cancel();
    handle.await.unwrap();
    assert_eq!(bot.in_flight(), 0);
}

#[tokio::test]
async fn periodic_sweep_expires_idle_conversations() {
    let h = harness().await;
    let bot = bot(&h, Duration::from_millis(50));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let bot = bot.clone();
        let cancel = cancel.clone();
        async move { bot.run(cancel).await }
    });

    h.send(A, "pedido").await;
    assert!(h.conversation(A).is_some());
    h.clock.advance(chrono::Duration::minutes(31));

    let conversations = h.conversations.clone();
    eventually(|| conversations.get(A).is_none()).await;
    assert!(h.last_reply(A).contains("inatividade"));

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn loop_stops_when_cancelled() {
    let h = harness().await;
    let bot = bot(&h, Duration::from_secs(300));
    let cancel = CancellationToken::new();
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), bot.run(cancel))
        .await
        .expect("loop should stop promptly");
}
