// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end dialogue tests driven through the test harness.

use std::time::Duration;

use canteiro_core::{ActivityFilter, ClockType, ContactEntry, GeoPoint, Severity, TicketPriority};
use canteiro_dialogue::{ConversationRepository, DialogueState, Draft};
use canteiro_test_utils::{TestHarness, site};

const WORKER: &str = "351912345678";
const OTHER: &str = "351934567890";

async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

/// Harness where WORKER may open tickets, with client ACME (no contracts).
async fn ticket_harness() -> TestHarness {
    let h = TestHarness::builder().build().await.unwrap();
    h.add_contact_list(
        "Encarregados",
        true,
        false,
        vec![TestHarness::contact("Rui", "+351 912 345 678")],
    )
    .await
    .unwrap();
    h.backend.add_client("C001", "ACME");
    h
}

/// Harness where WORKER may register attendance as internal user 42.
async fn attendance_harness() -> TestHarness {
    let h = TestHarness::builder().build().await.unwrap();
    h.add_contact_list(
        "Obra Norte",
        false,
        true,
        vec![ContactEntry {
            user_id: Some(42),
            ..TestHarness::contact("Ana", "912345678")
        }],
    )
    .await
    .unwrap();
    h
}

fn state(h: &TestHarness, phone: &str) -> Option<DialogueState> {
    h.conversation(phone).map(|c| c.state)
}

// --- Ticket flow ---

#[tokio::test]
async fn ticket_round_trip_ends_with_high_priority_and_no_conversation() {
    let h = ticket_harness().await;

    h.send(WORKER, "pedido").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingClient));
    assert!(h.last_reply(WORKER).contains("nome ou código do cliente"));

    h.send(WORKER, "ACME").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingProblem));
    assert!(h.last_reply(WORKER).contains("Sem contrato ativo"));

    h.send(WORKER, "Fuga de água na cave").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingPriority));

    h.send(WORKER, "3").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingConfirmation));
    let summary = h.last_reply(WORKER);
    assert!(summary.contains("Prioridade: Alta"));
    assert!(summary.contains("Fuga de água na cave"));

    h.send(WORKER, "sim").await;
    assert!(h.conversation(WORKER).is_none());
    assert!(h.last_reply(WORKER).contains("T-0001"));

    let tickets = h.backend.tickets();
    assert_eq!(tickets.len(), 1);
    let ticket = &tickets[0];
    assert_eq!(ticket.priority, TicketPriority::High);
    assert_eq!(ticket.client_code, "C001");
    assert_eq!(ticket.technician, "000");
    assert_eq!(ticket.origin, "WHATSAPP");
    assert_eq!(ticket.category, "ASSISTENCIA");
    assert_eq!(ticket.contract_id, None);
    assert_eq!(ticket.requested_by, WORKER);

    let backend = h.backend.clone();
    eventually(|| !backend.notifications().is_empty()).await;
    let notification = &h.backend.notifications()[0];
    assert_eq!(notification.target_technician, "000");
    assert_eq!(notification.ticket_id.as_deref(), Some("T-0001"));
}

#[tokio::test]
async fn single_contract_is_selected_automatically() {
    let h = ticket_harness().await;
    h.backend.set_contracts("C001", &["K1"]);

    h.send(WORKER, "pedido").await;
    h.send(WORKER, "acme").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingProblem));

    h.send(WORKER, "Porta avariada").await;
    h.send(WORKER, "1").await;
    h.send(WORKER, "s").await;
    assert_eq!(h.backend.tickets()[0].contract_id.as_deref(), Some("K1"));
    assert_eq!(h.backend.tickets()[0].priority, TicketPriority::Low);
}

#[tokio::test]
async fn contract_choice_is_bounded() {
    let h = ticket_harness().await;
    h.backend.set_contracts("C001", &["K1", "K2"]);

    h.send(WORKER, "pedido").await;
    h.send(WORKER, "ACME").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingContract));
    assert!(h.last_reply(WORKER).contains("2. K2"));

    h.send(WORKER, "3").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingContract));
    assert!(h.last_reply(WORKER).contains("entre 1 e 2"));

    h.send(WORKER, "2").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingProblem));
    match h.conversation(WORKER).unwrap().draft {
        Draft::Ticket(d) => {
            assert_eq!(d.contract.map(|c| c.id), Some("K2".to_string()));
            assert!(d.contracts.is_empty());
        }
        Draft::Attendance(_) => panic!("expected ticket draft"),
    }
}

#[tokio::test]
async fn unknown_client_shows_prefix_suggestions_and_stays() {
    let h = ticket_harness().await;
    h.backend.add_client("C002", "Betão Norte");

    h.send(WORKER, "pedido").await;
    h.send(WORKER, "acmx").await;

    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingClient));
    let reply = h.last_reply(WORKER);
    assert!(reply.contains("• ACME"));
    assert!(!reply.contains("Betão"));
}

#[tokio::test]
async fn default_client_word_uses_contact_default() {
    let h = TestHarness::builder().build().await.unwrap();
    h.add_contact_list(
        "Clientes",
        true,
        false,
        vec![ContactEntry {
            client_code: Some("C001".into()),
            technician_code: Some("T7".into()),
            ..TestHarness::contact("Rui", WORKER)
        }],
    )
    .await
    .unwrap();
    h.backend.add_client("C001", "ACME");

    h.send(WORKER, "pedido").await;
    assert!(h.last_reply(WORKER).contains("padrão"));
    h.send(WORKER, "padrão").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingProblem));

    h.send(WORKER, "Sem luz").await;
    h.send(WORKER, "2").await;
    h.send(WORKER, "SIM").await;
    let ticket = &h.backend.tickets()[0];
    assert_eq!(ticket.client_code, "C001");
    assert_eq!(ticket.technician, "T7");
    assert_eq!(ticket.priority, TicketPriority::Medium);
}

#[tokio::test]
async fn declining_confirmation_cancels_without_submitting() {
    let h = ticket_harness().await;
    h.send(WORKER, "pedido").await;
    h.send(WORKER, "ACME").await;
    h.send(WORKER, "Infiltração").await;
    h.send(WORKER, "2").await;
    h.send(WORKER, "não").await;

    assert!(h.conversation(WORKER).is_none());
    assert!(h.backend.tickets().is_empty());
    assert!(h.last_reply(WORKER).contains("cancelada"));
}

#[tracing_test::traced_test]
#[tokio::test]
async fn masked_ticket_failure_replies_success_and_logs_error() {
    let h = ticket_harness().await;
    h.backend.fail("tickets", "HTTP 503");

    h.send(WORKER, "pedido").await;
    h.send(WORKER, "ACME").await;
    h.send(WORKER, "Elevador parado").await;
    h.send(WORKER, "3").await;
    h.send(WORKER, "sim").await;

    assert!(h.conversation(WORKER).is_none());
    assert!(h.last_reply(WORKER).starts_with("✅ Pedido registado."));
    let errors = h.activity.query(&ActivityFilter {
        severity: Some(Severity::Error),
        ..Default::default()
    });
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("HTTP 503"));
    assert!(errors[0].details.is_some());
    assert!(logs_contain("ticket submission failed"));
    assert!(logs_contain("HTTP 503"));
}

#[tokio::test]
async fn unmasked_ticket_failure_reports_error() {
    let h = TestHarness::builder()
        .with_config(|c| c.mask_ticket_failures = false)
        .build()
        .await
        .unwrap();
    h.add_contact_list("A", true, false, vec![TestHarness::contact("Rui", WORKER)])
        .await
        .unwrap();
    h.backend.add_client("C001", "ACME");
    h.backend.fail("tickets", "HTTP 503");

    h.send(WORKER, "pedido").await;
    h.send(WORKER, "ACME").await;
    h.send(WORKER, "Elevador parado").await;
    h.send(WORKER, "3").await;
    h.send(WORKER, "sim").await;

    assert!(h.conversation(WORKER).is_none());
    let reply = h.last_reply(WORKER);
    assert!(reply.contains("Ocorreu um erro"));
    assert!(reply.contains("tickets service error: HTTP 503"));
}

#[tokio::test]
async fn collaborator_error_tears_conversation_down() {
    let h = ticket_harness().await;
    h.send(WORKER, "pedido").await;
    h.backend.fail("clients", "connection refused");

    h.send(WORKER, "ACME").await;
    assert!(h.conversation(WORKER).is_none());
    assert!(h.last_reply(WORKER).contains("connection refused"));

    h.send(WORKER, "olá").await;
    assert!(h.last_reply(WORKER).contains("Escreva *pedido*"));
}

// --- Authorization ---

#[tokio::test]
async fn unknown_number_is_refused() {
    let h = ticket_harness().await;
    h.send(OTHER, "pedido").await;
    assert!(h.conversation(OTHER).is_none());
    assert!(h.last_reply(OTHER).contains("não está registado"));
}

#[tokio::test]
async fn missing_capability_is_refused() {
    let h = attendance_harness().await;
    h.send(WORKER, "quero abrir um pedido").await;
    assert!(h.conversation(WORKER).is_none());
    assert!(h.last_reply(WORKER).contains("não tem permissão"));
}

#[tokio::test]
async fn attendance_without_linked_user_is_refused() {
    let h = TestHarness::builder().build().await.unwrap();
    h.add_contact_list("Obra", false, true, vec![TestHarness::contact("Ana", WORKER)])
        .await
        .unwrap();
    h.send(WORKER, "ponto").await;
    assert!(h.conversation(WORKER).is_none());
    assert!(h.last_reply(WORKER).contains("utilizador interno"));
}

// --- Attendance flow ---

#[tokio::test]
async fn attendance_with_no_sites_proceeds_without_site() {
    let h = attendance_harness().await;
    h.chat.set_shared_location(WORKER, GeoPoint::new(41.15, -8.61));

    h.send(WORKER, "ponto").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingConfirmation));
    assert!(h.last_reply(WORKER).contains("Não há obras ativas"));

    h.send(WORKER, "1").await;
    assert!(h.conversation(WORKER).is_none());
    let clock = &h.backend.clocks()[0];
    assert_eq!(clock.user_id, 42);
    assert_eq!(clock.site_id, None);
    assert_eq!(clock.clock_type, ClockType::In);
    assert_eq!((clock.latitude, clock.longitude), (41.15, -8.61));
    assert!(h.last_reply(WORKER).contains("localização partilhada"));
}

#[tokio::test]
async fn attendance_with_one_site_selects_it() {
    let h = attendance_harness().await;
    h.backend.set_sites(vec![site(7, "Hospital", None)]);
    h.chat.set_shared_location(WORKER, GeoPoint::new(41.0, -8.0));

    h.send(WORKER, "Presença").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingConfirmation));
    assert!(h.last_reply(WORKER).contains("Obra: Hospital"));

    h.send(WORKER, "saída").await;
    let clock = &h.backend.clocks()[0];
    assert_eq!(clock.site_id, Some(7));
    assert_eq!(clock.clock_type, ClockType::Out);
}

#[tokio::test]
async fn attendance_site_choice_is_bounded() {
    let h = attendance_harness().await;
    h.backend
        .set_sites(vec![site(1, "Escola", None), site(2, "Ponte", None)]);
    h.chat.set_shared_location(WORKER, GeoPoint::new(41.0, -8.0));

    h.send(WORKER, "ponto").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingSite));

    h.send(WORKER, "3").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingSite));
    assert!(h.last_reply(WORKER).contains("entre 1 e 2"));

    h.send(WORKER, "abc").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingSite));

    h.send(WORKER, "2").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingConfirmation));

    h.send(WORKER, "9").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingConfirmation));
    assert!(h.last_reply(WORKER).contains("Opção inválida"));

    h.send(WORKER, "entrada").await;
    assert!(h.conversation(WORKER).is_none());
    assert_eq!(h.backend.clocks()[0].site_id, Some(2));
}

#[tokio::test]
async fn attendance_failure_reports_user_and_site() {
    let h = attendance_harness().await;
    h.backend.set_sites(vec![site(7, "Hospital", None)]);
    h.backend.fail("attendance", "HTTP 422 duplicate");
    h.chat.set_shared_location(WORKER, GeoPoint::new(41.0, -8.0));

    h.send(WORKER, "ponto").await;
    h.send(WORKER, "1").await;

    assert!(h.conversation(WORKER).is_none());
    let reply = h.last_reply(WORKER);
    assert!(reply.contains("HTTP 422 duplicate"));
    assert!(reply.contains("Utilizador: 42"));
    assert!(reply.contains("Obra: 7"));
}

#[tokio::test]
async fn site_list_failure_tears_down() {
    let h = attendance_harness().await;
    h.backend.fail("sites", "timeout");
    h.send(WORKER, "ponto").await;
    assert!(h.conversation(WORKER).is_none());
    assert!(h.last_reply(WORKER).contains("sites service error: timeout"));
}

// --- Cancellation and precedence ---

#[tokio::test]
async fn cancel_from_every_ticket_state_then_fresh_start() {
    let h = ticket_harness().await;
    let steps = ["ACME", "Fuga", "2"];

    for depth in 0..=steps.len() {
        h.send(WORKER, "pedido").await;
        for text in &steps[..depth] {
            h.send(WORKER, text).await;
        }
        assert!(h.conversation(WORKER).is_some());

        h.send(WORKER, "Cancelar").await;
        assert!(h.conversation(WORKER).is_none(), "depth {depth}");
        assert!(h.last_reply(WORKER).contains("cancelada"));

        h.send(WORKER, "ACME").await;
        assert!(h.conversation(WORKER).is_none());
        assert!(h.last_reply(WORKER).contains("Escreva *pedido*"));
    }
    assert!(h.backend.tickets().is_empty());
}

#[tokio::test]
async fn cancel_from_attendance_site_choice() {
    let h = attendance_harness().await;
    h.backend
        .set_sites(vec![site(1, "Escola", None), site(2, "Ponte", None)]);
    h.send(WORKER, "ponto").await;
    h.send(WORKER, "cancelar").await;
    assert!(h.conversation(WORKER).is_none());
    assert!(h.backend.clocks().is_empty());
}

#[tokio::test]
async fn cancel_without_conversation_says_nothing_to_cancel() {
    let h = ticket_harness().await;
    h.send(WORKER, "cancelar").await;
    assert!(h.last_reply(WORKER).contains("Não há nenhuma operação"));
}

#[tokio::test]
async fn trigger_word_discards_previous_draft() {
    let h = TestHarness::builder().build().await.unwrap();
    h.add_contact_list(
        "Todos",
        true,
        true,
        vec![ContactEntry {
            user_id: Some(5),
            ..TestHarness::contact("Rui", WORKER)
        }],
    )
    .await
    .unwrap();
    h.backend.add_client("C001", "ACME");

    h.send(WORKER, "pedido").await;
    h.send(WORKER, "ACME").await;
    let first_id = h.conversation(WORKER).unwrap().id;

    h.send(WORKER, "afinal quero marcar ponto").await;
    let conversation = h.conversation(WORKER).unwrap();
    assert_ne!(conversation.id, first_id);
    assert!(matches!(conversation.draft, Draft::Attendance(_)));
    assert_eq!(h.conversations.len(), 1);

    h.send(WORKER, "novo pedido").await;
    let conversation = h.conversation(WORKER).unwrap();
    assert_eq!(conversation.state, DialogueState::WaitingClient);
    match conversation.draft {
        Draft::Ticket(d) => assert!(d.client.is_none()),
        Draft::Attendance(_) => panic!("expected ticket draft"),
    }

    let implicit = h.activity.query(&ActivityFilter {
        scope: Some(WORKER.into()),
        ..Default::default()
    });
    assert_eq!(
        implicit
            .iter()
            .filter(|e| e.message.starts_with("implicit cancel"))
            .count(),
        2
    );
}

#[tokio::test]
async fn trigger_word_inside_problem_description_restarts() {
    let h = ticket_harness().await;
    h.send(WORKER, "pedido").await;
    h.send(WORKER, "ACME").await;
    h.send(WORKER, "ticket urgente").await;
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingClient));
}

// --- Misc ---

#[tokio::test]
async fn conversations_are_per_phone() {
    let h = TestHarness::builder().build().await.unwrap();
    h.add_contact_list(
        "Equipa",
        true,
        false,
        vec![
            TestHarness::contact("Rui", WORKER),
            TestHarness::contact("Zé", OTHER),
        ],
    )
    .await
    .unwrap();
    h.backend.add_client("C001", "ACME");

    h.send(WORKER, "pedido").await;
    h.send(OTHER, "pedido").await;
    h.send(WORKER, "ACME").await;
    h.send(WORKER, "pedido").await;

    assert_eq!(h.conversations.len(), 2);
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingClient));
    assert_eq!(state(&h, OTHER), Some(DialogueState::WaitingClient));
}

#[tokio::test]
async fn no_conversation_and_no_trigger_gets_welcome() {
    let h = ticket_harness().await;
    h.send(OTHER, "bom dia").await;
    assert!(h.last_reply(OTHER).contains("Olá"));
    assert!(h.conversations.is_empty());
}

#[tokio::test]
async fn blank_messages_are_ignored() {
    let h = ticket_harness().await;
    h.send(WORKER, "   ").await;
    assert_eq!(h.chat.sent_count(), 0);
}

#[tokio::test]
async fn idle_conversations_expire_and_user_is_told() {
    let h = ticket_harness().await;
    h.add_contact_list("B", true, false, vec![TestHarness::contact("Zé", OTHER)])
        .await
        .unwrap();

    h.send(WORKER, "pedido").await;
    h.clock.advance(chrono::Duration::minutes(20));
    h.send(OTHER, "pedido").await;
    h.clock.advance(chrono::Duration::minutes(11));

    assert_eq!(h.engine.sweep_idle().await, 1);
    assert!(h.conversation(WORKER).is_none());
    assert!(h.conversation(OTHER).is_some());
    assert!(h.last_reply(WORKER).contains("inatividade"));

    h.send(WORKER, "ACME").await;
    assert!(h.last_reply(WORKER).contains("Escreva *pedido*"));
}

#[tokio::test]
async fn activity_in_conversation_resets_idle_timer() {
    let h = ticket_harness().await;
    h.send(WORKER, "pedido").await;
    h.clock.advance(chrono::Duration::minutes(25));
    h.send(WORKER, "ACME").await;
    h.clock.advance(chrono::Duration::minutes(25));

    assert_eq!(h.engine.sweep_idle().await, 0);
    assert_eq!(state(&h, WORKER), Some(DialogueState::WaitingProblem));
}

#[tokio::test]
async fn expiry_notice_failure_is_not_fatal() {
    let h = ticket_harness().await;
    h.send(WORKER, "pedido").await;
    h.chat.fail_sends_to(WORKER);
    h.clock.advance(chrono::Duration::minutes(31));
    assert_eq!(h.engine.sweep_idle().await, 1);
    assert!(h.conversation(WORKER).is_none());
}
