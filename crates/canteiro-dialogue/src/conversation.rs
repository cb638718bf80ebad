// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-phone conversation state and its in-memory store.

use canteiro_core::{ClientRecord, ClockType, Contract, Site, TicketPriority};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::contacts::ContactAuthorization;

/// Where a conversation is in its dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DialogueState {
    /// Created by a trigger, authorization still pending.
    Initial,
    WaitingClient,
    WaitingContract,
    WaitingProblem,
    WaitingPriority,
    WaitingConfirmation,
    WaitingSite,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketDraft {
    pub client: Option<ClientRecord>,
    /// Candidates offered while in `WaitingContract`.
    pub contracts: Vec<Contract>,
    pub contract: Option<Contract>,
    pub description: Option<String>,
    pub technician: Option<String>,
    pub origin: Option<String>,
    pub category: Option<String>,
    pub priority: Option<TicketPriority>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceDraft {
    pub user_id: Option<i64>,
    /// Candidates offered while in `WaitingSite`.
    pub sites: Vec<Site>,
    pub site: Option<Site>,
    pub clock_type: Option<ClockType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Draft {
    Ticket(TicketDraft),
    Attendance(AttendanceDraft),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    /// Distinguishes a conversation from a later one on the same phone.
    pub id: Uuid,
    /// Normalized phone number; the store key.
    pub phone: String,
    /// Raw chat address replies go to.
    pub reply_to: String,
    pub state: DialogueState,
    pub draft: Draft,
    pub authorization: Option<ContactAuthorization>,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(
        phone: impl Into<String>,
        reply_to: impl Into<String>,
        draft: Draft,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            phone: phone.into(),
            reply_to: reply_to.into(),
            state: DialogueState::Initial,
            draft,
            authorization: None,
            started_at: now,
            last_activity_at: now,
        }
    }
}

/// Storage for active conversations, at most one per phone.
pub trait ConversationRepository: Send + Sync + 'static {
    fn get(&self, phone: &str) -> Option<Conversation>;

    /// Stores `conversation`, returning the one it replaced.
    fn insert(&self, conversation: Conversation) -> Option<Conversation>;

    /// Writes back `conversation` only if the stored one has the same id.
    fn update(&self, conversation: Conversation) -> bool;

    fn remove(&self, phone: &str) -> Option<Conversation>;

    /// Removes `conversation` only if it is still the stored one.
    fn discard(&self, conversation: &Conversation) -> bool;

    /// Removes and returns every conversation idle since before `cutoff`.
    fn expire_idle(&self, cutoff: DateTime<Utc>) -> Vec<Conversation>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct InMemoryConversations {
    entries: DashMap<String, Conversation>,
}

impl InMemoryConversations {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationRepository for InMemoryConversations {
    fn get(&self, phone: &str) -> Option<Conversation> {
        self.entries.get(phone).map(|c| c.value().clone())
    }

    fn insert(&self, conversation: Conversation) -> Option<Conversation> {
        self.entries.insert(conversation.phone.clone(), conversation)
    }

    fn update(&self, conversation: Conversation) -> bool {
        match self.entries.get_mut(&conversation.phone) {
            Some(mut current) if current.id == conversation.id => {
                *current = conversation;
                true
            }
            _ => false,
        }
    }

    fn remove(&self, phone: &str) -> Option<Conversation> {
        self.entries.remove(phone).map(|(_, c)| c)
    }

    fn discard(&self, conversation: &Conversation) -> bool {
        self.entries
            .remove_if(&conversation.phone, |_, c| c.id == conversation.id)
            .is_some()
    }

    fn expire_idle(&self, cutoff: DateTime<Utc>) -> Vec<Conversation> {
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.last_activity_at < cutoff)
            .map(|e| e.key().clone())
            .collect();

        // Re-check under the shard lock; a message may have touched it since.
        stale
            .into_iter()
            .filter_map(|phone| {
                self.entries
                    .remove_if(&phone, |_, c| c.last_activity_at < cutoff)
                    .map(|(_, c)| c)
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ticket(phone: &str, at: DateTime<Utc>) -> Conversation {
        Conversation::new(phone, format!("{phone}@c.us"), Draft::Ticket(TicketDraft::default()), at)
    }

    #[test]
    fn insert_replaces_and_returns_previous() {
        let store = InMemoryConversations::new();
        let now = Utc::now();
        assert!(store.insert(ticket("911", now)).is_none());

        let mut second = ticket("911", now);
        second.draft = Draft::Attendance(AttendanceDraft::default());
        let previous = store.insert(second.clone()).unwrap();
        assert!(matches!(previous.draft, Draft::Ticket(_)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("911").unwrap().id, second.id);
    }

    #[test]
    fn update_ignores_replaced_conversation() {
        let store = InMemoryConversations::new();
        let now = Utc::now();
        let mut old = ticket("911", now);
        store.insert(old.clone());
        let new = ticket("911", now);
        store.insert(new.clone());

        old.state = DialogueState::WaitingProblem;
        assert!(!store.update(old));
        assert_eq!(store.get("911").unwrap().state, DialogueState::Initial);

        let mut new = new;
        new.state = DialogueState::WaitingClient;
        assert!(store.update(new));
        assert_eq!(store.get("911").unwrap().state, DialogueState::WaitingClient);
    }

    #[test]
    fn update_does_not_resurrect_removed_conversation() {
        let store = InMemoryConversations::new();
        let conv = ticket("911", Utc::now());
        store.insert(conv.clone());
        store.remove("911");
        assert!(!store.update(conv));
        assert!(store.is_empty());
    }

    #[test]
    fn discard_only_removes_same_conversation() {
        let store = InMemoryConversations::new();
        let now = Utc::now();
        let old = ticket("911", now);
        store.insert(old.clone());
        let new = ticket("911", now);
        store.insert(new.clone());

        assert!(!store.discard(&old));
        assert_eq!(store.len(), 1);
        assert!(store.discard(&new));
        assert!(store.is_empty());
    }

    #[test]
    fn expire_idle_removes_only_stale() {
        let store = InMemoryConversations::new();
        let now = Utc::now();
        store.insert(ticket("old", now - Duration::minutes(45)));
        store.insert(ticket("fresh", now - Duration::minutes(5)));

        let expired = store.expire_idle(now - Duration::minutes(30));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].phone, "old");
        assert!(store.get("fresh").is_some());
        assert!(store.get("old").is_none());
    }

    #[test]
    fn state_display_is_snake_case() {
        assert_eq!(DialogueState::WaitingConfirmation.to_string(), "waiting_confirmation");
    }
}
