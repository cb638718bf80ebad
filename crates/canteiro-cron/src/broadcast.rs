// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequential delivery of one message to a list of recipients.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use canteiro_core::{
    ActivityLog, BroadcastPriority, CanteiroError, ChatClient, Recipient, Severity, chat_address,
    normalize_phone,
};

/// Outcome for a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent { message_id: String },
    NotRegistered,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientResult {
    pub name: String,
    pub phone: String,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

impl RecipientResult {
    pub fn is_sent(&self) -> bool {
        matches!(self.status, DeliveryStatus::Sent { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub success_count: u64,
    pub error_count: u64,
    pub results: Vec<RecipientResult>,
}

/// Delivers broadcasts through the chat client, one recipient at a time.
pub struct BroadcastExecutor {
    chat: Arc<dyn ChatClient>,
    activity: Arc<ActivityLog>,
    send_delay: Duration,
}

impl BroadcastExecutor {
    pub fn new(chat: Arc<dyn ChatClient>, activity: Arc<ActivityLog>, send_delay: Duration) -> Self {
        Self {
            chat,
            activity,
            send_delay,
        }
    }

    /// Sends `message` to every recipient in order.
    ///
    /// Returns [`CanteiroError::ClientNotReady`] before sending anything when
    /// the chat session is down. Per-recipient failures are recorded in the
    /// report and the activity log; they never abort the batch.
    pub async fn execute(
        &self,
        scope: &str,
        message: &str,
        recipients: &[Recipient],
        priority: BroadcastPriority,
    ) -> Result<BroadcastReport, CanteiroError> {
        if !self.chat.is_ready() {
            return Err(CanteiroError::ClientNotReady);
        }

        let text = priority.decorate(message);
        let mut report = BroadcastReport::default();
        info!(scope, recipients = recipients.len(), %priority, "starting broadcast");

        for recipient in recipients {
            let status = self.deliver(scope, recipient, &text).await;
            match &status {
                DeliveryStatus::Sent { .. } => report.success_count += 1,
                DeliveryStatus::NotRegistered => {
                    report.error_count += 1;
                    self.activity.append(
                        scope,
                        Severity::Warning,
                        format!(
                            "{} ({}) is not a registered WhatsApp user",
                            recipient.name, recipient.phone
                        ),
                        None,
                    );
                }
                DeliveryStatus::Failed { error } => {
                    report.error_count += 1;
                    self.activity.append(
                        scope,
                        Severity::Error,
                        format!(
                            "delivery to {} ({}) failed: {error}",
                            recipient.name, recipient.phone
                        ),
                        None,
                    );
                }
            }
            report.results.push(RecipientResult {
                name: recipient.name.clone(),
                phone: recipient.phone.clone(),
                status,
            });
        }

        let severity = if report.error_count == 0 {
            Severity::Success
        } else {
            Severity::Warning
        };
        self.activity.append(
            scope,
            severity,
            format!(
                "broadcast finished: {} sent, {} failed",
                report.success_count, report.error_count
            ),
            Some(serde_json::json!({
                "success_count": report.success_count,
                "error_count": report.error_count,
            })),
        );

        Ok(report)
    }

    async fn deliver(&self, scope: &str, recipient: &Recipient, text: &str) -> DeliveryStatus {
        let phone = normalize_phone(&recipient.phone);
        if phone.is_empty() {
            return DeliveryStatus::Failed {
                error: format!("invalid phone number `{}`", recipient.phone),
            };
        }
        let address = chat_address(&phone);

        match self.chat.is_registered_user(&address).await {
            Ok(true) => {}
            Ok(false) => return DeliveryStatus::NotRegistered,
            Err(e) => {
                return DeliveryStatus::Failed {
                    error: e.to_string(),
                };
            }
        }

        let status = match self.chat.send_message(&address, text).await {
            Ok(id) => {
                debug!(scope, phone = %phone, message_id = %id.0, "broadcast message sent");
                DeliveryStatus::Sent { message_id: id.0 }
            }
            Err(e) => {
                warn!(scope, phone = %phone, error = %e, "broadcast send failed");
                DeliveryStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        status
    }
}
