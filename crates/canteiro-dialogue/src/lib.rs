// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation handling for the Canteiro bot.
//!
//! [`BotLoop`] consumes chat events and hands each inbound message to the
//! [`DialogueEngine`] in its own task. Messages from the same phone number
//! are serialized through a per-phone lock; different numbers proceed
//! concurrently. The loop also runs the idle-conversation sweep and drains
//! in-flight messages on shutdown.

pub mod contacts;
pub mod conversation;
pub mod engine;
pub mod keywords;
pub mod location;
pub mod messages;
pub mod shutdown;
pub mod subscription;

use std::sync::Arc;
use std::time::Duration;

use canteiro_core::{ChatClient, ChatEvent, InboundMessage};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

pub use contacts::{ContactAuthorization, ContactDirectory, normalize_phone, phones_match};
pub use conversation::{
    AttendanceDraft, Conversation, ConversationRepository, DialogueState, Draft,
    InMemoryConversations, TicketDraft,
};
pub use engine::{Backends, DialogueEngine, EngineDeps};
pub use location::{LocationResolver, LocationSource, ResolvedLocation};

/// Per-phone locks; entries are dropped once nobody holds or waits on them.
type PhoneLocks = DashMap<String, Arc<Mutex<()>>>;

pub struct BotLoop {
    engine: Arc<DialogueEngine>,
    chat: Arc<dyn ChatClient>,
    locks: Arc<PhoneLocks>,
    tracker: TaskTracker,
    sweep_interval: Duration,
    drain_timeout: Duration,
}

impl BotLoop {
    pub fn new(
        engine: Arc<DialogueEngine>,
        chat: Arc<dyn ChatClient>,
        sweep_interval: Duration,
        drain_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            chat,
            locks: Arc::new(DashMap::new()),
            tracker: TaskTracker::new(),
            sweep_interval,
            drain_timeout,
        }
    }

    /// Runs until `cancel` fires or the event stream closes, then drains.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut events = self.chat.subscribe();
        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        sweep.tick().await;

        info!("bot loop started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("bot loop shutting down");
                    break;
                }
                _ = sweep.tick() => {
                    let engine = Arc::clone(&self.engine);
                    self.tracker.spawn(async move {
                        let expired = engine.sweep_idle().await;
                        if expired > 0 {
                            info!(expired, "idle conversations swept");
                        }
                    });
                }
                event = events.recv() => match event {
                    Ok(ChatEvent::Message(message)) => self.dispatch(message),
                    Ok(ChatEvent::Ready) => info!("chat client ready"),
                    Ok(ChatEvent::Disconnected { reason }) => {
                        warn!(reason = %reason, "chat client disconnected");
                    }
                    Ok(ChatEvent::Qr { .. }) => info!("chat client waiting for pairing"),
                    Err(RecvError::Lagged(skipped)) => {
                        error!(skipped, "bot loop lagged behind chat events, messages lost");
                    }
                    Err(RecvError::Closed) => {
                        warn!("chat event stream closed");
                        break;
                    }
                },
            }
        }

        shutdown::drain_tasks(&self.tracker, self.drain_timeout).await;
    }

    fn dispatch(&self, message: InboundMessage) {
        let phone = normalize_phone(&message.from);
        let lock = Arc::clone(self.locks.entry(phone.clone()).or_default().value());
        let locks = Arc::clone(&self.locks);
        let engine = Arc::clone(&self.engine);

        self.tracker.spawn(async move {
            {
                let _guard = lock.lock().await;
                debug!(phone = %phone, "handling message");
                engine.handle_message(message).await;
            }
            drop(lock);
            locks.remove_if(&phone, |_, l| Arc::strong_count(l) == 1);
        });
    }

    /// Number of messages currently queued or being handled.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }
}
