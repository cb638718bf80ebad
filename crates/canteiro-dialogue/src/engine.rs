// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ticket and attendance dialogues.
//!
//! Each inbound message is classified as a trigger, a cancellation, a reply to
//! an active conversation, or noise. Replies run through the handler for the
//! conversation's state; whatever a handler returns decides whether the
//! conversation is written back or torn down. Collaborator errors always tear
//! the conversation down after telling the user.

use std::sync::Arc;
use std::time::Duration;

use canteiro_config::model::DialogueConfig;
use canteiro_core::{
    ActivityLog, AttendanceService, CanteiroError, Capability, ChatClient, ClientDirectory, Clock,
    ClockRequest, GeoLocator, InboundMessage, Notification, NotificationService, Severity,
    SiteDirectory, StorageAdapter, TicketReceipt, TicketRequest, TicketService,
};
use tracing::{debug, error, info, warn};

use crate::contacts::{ContactAuthorization, ContactDirectory, normalize_phone};
use crate::conversation::{
    AttendanceDraft, Conversation, ConversationRepository, DialogueState, Draft, TicketDraft,
};
use crate::keywords::{self, Flow, TriggerWords};
use crate::location::LocationResolver;
use crate::messages;

/// Downstream services the dialogues call.
#[derive(Clone)]
pub struct Backends {
    pub clients: Arc<dyn ClientDirectory>,
    pub tickets: Arc<dyn TicketService>,
    pub attendance: Arc<dyn AttendanceService>,
    pub sites: Arc<dyn SiteDirectory>,
    pub notifications: Arc<dyn NotificationService>,
}

/// Everything the engine is wired to.
pub struct EngineDeps {
    pub chat: Arc<dyn ChatClient>,
    pub storage: Arc<dyn StorageAdapter>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub backends: Backends,
    pub geo: Arc<dyn GeoLocator>,
    pub geo_timeout: Duration,
    pub activity: Arc<ActivityLog>,
    pub clock: Arc<dyn Clock>,
}

/// Result of one handler step.
enum Step {
    /// Keep the conversation and send this reply.
    Continue(String),
    /// Drop the conversation and send this reply.
    Finish(String),
}

pub struct DialogueEngine {
    chat: Arc<dyn ChatClient>,
    contacts: ContactDirectory,
    conversations: Arc<dyn ConversationRepository>,
    backends: Backends,
    location: LocationResolver,
    activity: Arc<ActivityLog>,
    clock: Arc<dyn Clock>,
    triggers: TriggerWords,
    config: DialogueConfig,
}

impl DialogueEngine {
    pub fn new(config: DialogueConfig, deps: EngineDeps) -> Self {
        let location = LocationResolver::new(
            Arc::clone(&deps.chat),
            deps.geo,
            &config,
            deps.geo_timeout,
        );
        Self {
            contacts: ContactDirectory::new(deps.storage),
            triggers: TriggerWords::new(&config.ticket_keywords, &config.attendance_keywords),
            chat: deps.chat,
            conversations: deps.conversations,
            backends: deps.backends,
            location,
            activity: deps.activity,
            clock: deps.clock,
            config,
        }
    }

    pub fn conversations(&self) -> &Arc<dyn ConversationRepository> {
        &self.conversations
    }

    /// Handles one inbound message to completion.
    pub async fn handle_message(&self, message: InboundMessage) {
        let phone = normalize_phone(&message.from);
        let text = message.body.trim();
        if phone.is_empty() {
            debug!(from = %message.from, "ignoring message without a phone number");
            return;
        }
        if text.is_empty() {
            debug!(phone = %phone, "ignoring message without text");
            return;
        }

        if let Some(flow) = self.triggers.detect(text) {
            self.start(flow, &phone, &message.from).await;
        } else if keywords::is_cancel(text) {
            self.cancel(&phone, &message.from).await;
        } else if let Some(mut conversation) = self.conversations.get(&phone) {
            let step = self.step(&mut conversation, text).await;
            self.settle(conversation, step).await;
        } else {
            self.reply(&message.from, &messages::welcome()).await;
        }
    }

    /// Expires idle conversations and tells their users. Returns how many expired.
    pub async fn sweep_idle(&self) -> usize {
        let idle = chrono::Duration::from_std(self.config.idle_timeout())
            .unwrap_or(chrono::Duration::MAX);
        let Some(cutoff) = self.clock.now().checked_sub_signed(idle) else {
            return 0;
        };

        let expired = self.conversations.expire_idle(cutoff);
        for conversation in &expired {
            info!(
                phone = %conversation.phone,
                state = %conversation.state,
                "conversation expired after inactivity"
            );
            self.activity.append(
                &conversation.phone,
                Severity::Info,
                format!("conversation expired in state {}", conversation.state),
                None,
            );
            if let Err(e) = self
                .chat
                .send_message(&conversation.reply_to, &messages::expired())
                .await
            {
                warn!(phone = %conversation.phone, error = %e, "could not notify idle expiry");
            }
        }
        expired.len()
    }

    async fn start(&self, flow: Flow, phone: &str, reply_to: &str) {
        let draft = match flow {
            Flow::Ticket => Draft::Ticket(TicketDraft::default()),
            Flow::Attendance => Draft::Attendance(AttendanceDraft::default()),
        };
        let mut conversation = Conversation::new(phone, reply_to, draft, self.clock.now());

        // Replace-or-create happens here, before the first await.
        if let Some(previous) = self.conversations.insert(conversation.clone()) {
            info!(
                phone,
                previous_state = %previous.state,
                %flow,
                "conversation restarted by trigger word"
            );
            self.activity.append(
                phone,
                Severity::Info,
                format!("implicit cancel of conversation in state {}", previous.state),
                None,
            );
        }

        let capability = match flow {
            Flow::Ticket => Capability::CreateTickets,
            Flow::Attendance => Capability::RegisterAttendance,
        };
        let step = match self.contacts.resolve(phone, capability).await {
            Ok(authorization) => self.begin(&mut conversation, authorization).await,
            Err(CanteiroError::Authorization(failure)) => {
                info!(phone, %capability, reason = %failure, "sender not authorized");
                Ok(Step::Finish(messages::unauthorized(capability, &failure)))
            }
            Err(e) => Err(e),
        };
        self.settle(conversation, step).await;
    }

    async fn begin(
        &self,
        conversation: &mut Conversation,
        authorization: ContactAuthorization,
    ) -> Result<Step, CanteiroError> {
        let has_default_client = authorization.default_client_code.is_some();
        let user_id = authorization.internal_user_id;
        conversation.authorization = Some(authorization);

        match &mut conversation.draft {
            Draft::Ticket(_) => {
                conversation.state = DialogueState::WaitingClient;
                Ok(Step::Continue(messages::ask_client(has_default_client)))
            }
            Draft::Attendance(draft) => {
                draft.user_id = user_id;
                let sites = self.backends.sites.list_active_sites().await?;
                debug!(phone = %conversation.phone, sites = sites.len(), "active sites loaded");
                if sites.len() > 1 {
                    let reply = messages::choose_site(&sites);
                    draft.sites = sites;
                    conversation.state = DialogueState::WaitingSite;
                    return Ok(Step::Continue(reply));
                }
                draft.site = sites.into_iter().next();
                conversation.state = DialogueState::WaitingConfirmation;
                Ok(Step::Continue(messages::ask_clock_type(draft.site.as_ref())))
            }
        }
    }

    async fn cancel(&self, phone: &str, reply_to: &str) {
        match self.conversations.remove(phone) {
            Some(conversation) => {
                info!(phone, state = %conversation.state, "conversation cancelled by user");
                self.reply(reply_to, &messages::cancelled()).await;
            }
            None => self.reply(reply_to, &messages::nothing_to_cancel()).await,
        }
    }

    async fn step(&self, conversation: &mut Conversation, text: &str) -> Result<Step, CanteiroError> {
        let Conversation {
            phone,
            reply_to,
            state,
            draft,
            authorization,
            ..
        } = conversation;
        let authorization = authorization.as_ref();

        match (draft, *state) {
            (Draft::Ticket(d), DialogueState::WaitingClient) => {
                self.on_client(state, d, authorization, text).await
            }
            (Draft::Ticket(d), DialogueState::WaitingContract) => on_contract(state, d, text),
            (Draft::Ticket(d), DialogueState::WaitingProblem) => {
                Ok(self.on_problem(state, d, authorization, text))
            }
            (Draft::Ticket(d), DialogueState::WaitingPriority) => on_priority(state, d, text),
            (Draft::Ticket(d), DialogueState::WaitingConfirmation) => {
                self.on_ticket_confirmation(d, phone, text).await
            }
            (Draft::Attendance(d), DialogueState::WaitingSite) => Ok(on_site(state, d, text)),
            (Draft::Attendance(d), DialogueState::WaitingConfirmation) => {
                self.on_clock_type(d, phone, reply_to, text).await
            }
            (_, other) => {
                warn!(phone = %phone, state = %other, "message for conversation in unexpected state");
                Ok(Step::Finish(messages::welcome()))
            }
        }
    }

    /// Writes back or tears down the conversation, then replies.
    async fn settle(&self, mut conversation: Conversation, step: Result<Step, CanteiroError>) {
        match step {
            Ok(Step::Continue(reply)) => {
                conversation.last_activity_at = self.clock.now();
                debug!(phone = %conversation.phone, state = %conversation.state, "conversation advanced");
                if !self.conversations.update(conversation.clone()) {
                    debug!(phone = %conversation.phone, "conversation replaced while handling");
                }
                self.reply(&conversation.reply_to, &reply).await;
            }
            Ok(Step::Finish(reply)) => {
                self.conversations.discard(&conversation);
                self.reply(&conversation.reply_to, &reply).await;
            }
            Err(e) => {
                self.conversations.discard(&conversation);
                error!(
                    phone = %conversation.phone,
                    state = %conversation.state,
                    error = %e,
                    "dialogue step failed"
                );
                self.activity.append(
                    &conversation.phone,
                    Severity::Error,
                    format!("conversation aborted in state {}: {e}", conversation.state),
                    None,
                );
                self.reply(&conversation.reply_to, &messages::failure(&e)).await;
            }
        }
    }

    async fn on_client(
        &self,
        state: &mut DialogueState,
        draft: &mut TicketDraft,
        authorization: Option<&ContactAuthorization>,
        text: &str,
    ) -> Result<Step, CanteiroError> {
        let query = match authorization.and_then(|a| a.default_client_code.as_deref()) {
            Some(code) if keywords::is_default_client(text) => code,
            _ => text,
        };

        let lookup = self.backends.clients.lookup_client(query).await?;
        let client = match lookup.client {
            Some(client) if lookup.exists => client,
            _ => {
                let suggestions: Vec<String> = lookup
                    .suggestions
                    .into_iter()
                    .filter(|s| keywords::shares_prefix(text, s))
                    .collect();
                return Ok(Step::Continue(messages::client_not_found(text, &suggestions)));
            }
        };

        let contracts = self
            .backends
            .clients
            .lookup_contracts(&client.code)
            .await?
            .active_contracts;

        let reply = if contracts.len() > 1 {
            *state = DialogueState::WaitingContract;
            let reply = messages::choose_contract(&client, &contracts);
            draft.contracts = contracts;
            reply
        } else {
            draft.contract = contracts.into_iter().next();
            *state = DialogueState::WaitingProblem;
            messages::ask_problem(&client, draft.contract.as_ref())
        };
        draft.client = Some(client);
        Ok(Step::Continue(reply))
    }

    fn on_problem(
        &self,
        state: &mut DialogueState,
        draft: &mut TicketDraft,
        authorization: Option<&ContactAuthorization>,
        text: &str,
    ) -> Step {
        draft.description = Some(text.to_string());
        draft.technician = Some(
            authorization
                .and_then(|a| a.default_technician_code.clone())
                .unwrap_or_else(|| self.config.default_technician.clone()),
        );
        draft.origin = Some(self.config.default_origin.clone());
        draft.category = Some(self.config.default_category.clone());
        *state = DialogueState::WaitingPriority;
        Step::Continue(messages::ask_priority())
    }

    async fn on_ticket_confirmation(
        &self,
        draft: &TicketDraft,
        phone: &str,
        text: &str,
    ) -> Result<Step, CanteiroError> {
        if !keywords::is_yes(text) {
            info!(phone, "ticket discarded at confirmation");
            return Ok(Step::Finish(messages::cancelled()));
        }

        let request = self.ticket_request(draft, phone)?;
        match self.backends.tickets.submit_ticket(request.clone()).await {
            Ok(receipt) => {
                info!(
                    phone,
                    ticket_id = %receipt.ticket_id,
                    priority = %request.priority,
                    "ticket submitted"
                );
                self.activity.append(
                    phone,
                    Severity::Success,
                    format!("ticket {} created for {}", receipt.ticket_id, request.client_name),
                    None,
                );
                self.notify_technician(&request, &receipt);
                Ok(Step::Finish(messages::ticket_created(Some(&receipt.ticket_id))))
            }
            Err(e) if self.config.mask_ticket_failures => {
                error!(phone, error = %e, "ticket submission failed; user sees success reply");
                self.activity.append(
                    phone,
                    Severity::Error,
                    format!("ticket submission failed: {e}"),
                    serde_json::to_value(&request).ok(),
                );
                Ok(Step::Finish(messages::ticket_created(None)))
            }
            Err(e) => Err(e),
        }
    }

    fn ticket_request(&self, draft: &TicketDraft, phone: &str) -> Result<TicketRequest, CanteiroError> {
        let client = draft
            .client
            .as_ref()
            .ok_or_else(|| CanteiroError::Internal("ticket draft has no client".into()))?;
        let description = draft
            .description
            .clone()
            .ok_or_else(|| CanteiroError::Internal("ticket draft has no description".into()))?;

        Ok(TicketRequest {
            client_code: client.code.clone(),
            client_name: client.name.clone(),
            description,
            priority: draft.priority.unwrap_or(canteiro_core::TicketPriority::Medium),
            technician: draft
                .technician
                .clone()
                .unwrap_or_else(|| self.config.default_technician.clone()),
            origin: draft
                .origin
                .clone()
                .unwrap_or_else(|| self.config.default_origin.clone()),
            category: draft
                .category
                .clone()
                .unwrap_or_else(|| self.config.default_category.clone()),
            contract_id: draft.contract.as_ref().map(|c| c.id.clone()),
            requested_by: phone.to_string(),
        })
    }

    /// Fire-and-forget push to the assigned technician.
    fn notify_technician(&self, request: &TicketRequest, receipt: &TicketReceipt) {
        let notifications = Arc::clone(&self.backends.notifications);
        let notification = Notification {
            target_technician: request.technician.clone(),
            title: format!("Novo pedido {}", receipt.ticket_id),
            body: format!("{}: {}", request.client_name, request.description),
            ticket_id: Some(receipt.ticket_id.clone()),
        };
        tokio::spawn(async move {
            if let Err(e) = notifications.notify(notification).await {
                warn!(error = %e, "technician notification failed");
            }
        });
    }

    async fn on_clock_type(
        &self,
        draft: &mut AttendanceDraft,
        phone: &str,
        reply_to: &str,
        text: &str,
    ) -> Result<Step, CanteiroError> {
        let Some(clock_type) = keywords::parse_clock_type(text) else {
            return Ok(Step::Continue(messages::invalid_clock_type()));
        };
        draft.clock_type = Some(clock_type);
        let user_id = draft
            .user_id
            .ok_or_else(|| CanteiroError::Internal("attendance draft has no user".into()))?;

        let location = self.location.resolve(reply_to, phone, draft.site.as_ref()).await;
        let site_id = draft.site.as_ref().map(|s| s.id);
        let request = ClockRequest {
            user_id,
            site_id,
            clock_type,
            latitude: location.point.latitude,
            longitude: location.point.longitude,
        };

        match self.backends.attendance.register_clock(request).await {
            Ok(receipt) => {
                info!(
                    phone,
                    user_id,
                    %clock_type,
                    record_id = %receipt.record_id,
                    location_source = %location.source,
                    "attendance registered"
                );
                self.activity.append(
                    phone,
                    Severity::Success,
                    format!("{clock_type} registered for user {user_id}"),
                    None,
                );
                Ok(Step::Finish(messages::clock_registered(
                    clock_type,
                    draft.site.as_ref(),
                    &location,
                    &receipt,
                )))
            }
            Err(e) => {
                error!(phone, user_id, ?site_id, error = %e, "attendance registration failed");
                self.activity.append(
                    phone,
                    Severity::Error,
                    format!("attendance registration failed for user {user_id}: {e}"),
                    None,
                );
                Ok(Step::Finish(messages::clock_failed(&e, user_id, site_id)))
            }
        }
    }

    async fn reply(&self, to: &str, text: &str) {
        match self.chat.send_message(to, text).await {
            Ok(id) => debug!(to, message_id = %id.0, "reply sent"),
            Err(CanteiroError::ClientNotReady) => warn!(to, "chat client not ready, reply dropped"),
            Err(e) => error!(to, error = %e, "failed to send reply"),
        }
    }
}

fn on_contract(
    state: &mut DialogueState,
    draft: &mut TicketDraft,
    text: &str,
) -> Result<Step, CanteiroError> {
    let client = draft
        .client
        .clone()
        .ok_or_else(|| CanteiroError::Internal("ticket draft has no client".into()))?;

    let Some(index) = keywords::parse_choice(text, draft.contracts.len()) else {
        return Ok(Step::Continue(format!(
            "{}\n\n{}",
            messages::invalid_choice(draft.contracts.len()),
            messages::choose_contract(&client, &draft.contracts)
        )));
    };

    draft.contract = std::mem::take(&mut draft.contracts).into_iter().nth(index);
    *state = DialogueState::WaitingProblem;
    Ok(Step::Continue(messages::ask_problem(&client, draft.contract.as_ref())))
}

fn on_priority(
    state: &mut DialogueState,
    draft: &mut TicketDraft,
    text: &str,
) -> Result<Step, CanteiroError> {
    let priority = keywords::parse_priority(text);
    draft.priority = Some(priority);

    let client = draft
        .client
        .as_ref()
        .ok_or_else(|| CanteiroError::Internal("ticket draft has no client".into()))?;
    let description = draft.description.as_deref().unwrap_or_default();

    *state = DialogueState::WaitingConfirmation;
    Ok(Step::Continue(messages::confirm_ticket(
        client,
        priority,
        description,
        draft.contract.as_ref(),
    )))
}

fn on_site(state: &mut DialogueState, draft: &mut AttendanceDraft, text: &str) -> Step {
    let Some(index) = keywords::parse_choice(text, draft.sites.len()) else {
        return Step::Continue(format!(
            "{}\n\n{}",
            messages::invalid_choice(draft.sites.len()),
            messages::choose_site(&draft.sites)
        ));
    };

    draft.site = std::mem::take(&mut draft.sites).into_iter().nth(index);
    *state = DialogueState::WaitingConfirmation;
    Step::Continue(messages::ask_clock_type(draft.site.as_ref()))
}
