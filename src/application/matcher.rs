use super::webhook::WebhookNotifier;
use crate::domain::instruction::InstructionStatus;
use crate::domain::notification::{InboundNotification, StatusHint};
use crate::domain::ports::InstructionStoreRef;
use crate::error::{RelayError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Timestamp of the last notification the matcher saw, shared with the
/// health endpoint. Explicit state owned by the process wiring, not a
/// process-wide global.
#[derive(Debug, Default, Clone)]
pub struct MailboxHeartbeat {
    last_seen: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl MailboxHeartbeat {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn touch(&self, now: DateTime<Utc>) {
        *self.last_seen.write().await = Some(now);
    }

    pub async fn last_seen(&self) -> Option<DateTime<Utc>> {
        *self.last_seen.read().await
    }
}

#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    /// The notification advanced an instruction's state.
    Matched {
        instruction_id: String,
        status: InstructionStatus,
    },
    /// Matched an instruction but carried nothing new: a reconfirmation,
    /// an unknown hint, or a replayed notification.
    Reconfirmed {
        instruction_id: String,
        status: InstructionStatus,
    },
    /// Unrelated mail volume is expected; this is not an error.
    NoMatch,
}

/// Correlates unstructured bank notifications to open instructions.
///
/// The only usable key is exact amount equality: notification text does not
/// reliably carry the instruction code. Most-recently-created wins ties.
pub struct InboundMatcher {
    instructions: InstructionStoreRef,
    notifier: WebhookNotifier,
    heartbeat: MailboxHeartbeat,
}

impl InboundMatcher {
    pub fn new(
        instructions: InstructionStoreRef,
        notifier: WebhookNotifier,
        heartbeat: MailboxHeartbeat,
    ) -> Self {
        Self {
            instructions,
            notifier,
            heartbeat,
        }
    }

    pub async fn handle(&self, notification: InboundNotification) -> Result<MatchOutcome> {
        self.heartbeat.touch(Utc::now()).await;

        let mut candidates = self
            .instructions
            .find_open_by_amount(notification.amount_cents)
            .await?;
        candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let Some(instruction) = candidates.into_iter().next() else {
            tracing::info!(
                amount_cents = notification.amount_cents,
                source_uid = %notification.source_uid,
                "no open instruction matches notification, dropping"
            );
            return Ok(MatchOutcome::NoMatch);
        };

        // An explicit cancellation hint must land on CANCELLED; unrecognized
        // hints are reconfirmations, never a default to REQUESTED.
        let target = match notification.status_hint {
            StatusHint::Approved => Some(InstructionStatus::Approved),
            StatusHint::Deposited => Some(InstructionStatus::Deposited),
            StatusHint::Cancelled => Some(InstructionStatus::Cancelled),
            StatusHint::Requested | StatusHint::Unknown => None,
        };
        let Some(target) = target else {
            return Ok(MatchOutcome::Reconfirmed {
                instruction_id: instruction.id,
                status: instruction.status,
            });
        };
        if instruction.status == target {
            // Replayed notification; the first application already landed.
            return Ok(MatchOutcome::Reconfirmed {
                instruction_id: instruction.id,
                status: instruction.status,
            });
        }

        let updated = match self
            .instructions
            .transition(&instruction.id, instruction.status, target, None)
            .await
        {
            Ok(updated) => updated,
            Err(
                err @ (RelayError::StaleTransition { .. } | RelayError::IllegalTransition { .. }),
            ) => {
                tracing::warn!(
                    instruction_id = %instruction.id,
                    source_uid = %notification.source_uid,
                    error = %err,
                    "notification lost a transition race, treating as reconfirmation"
                );
                return Ok(MatchOutcome::Reconfirmed {
                    instruction_id: instruction.id,
                    status: instruction.status,
                });
            }
            Err(err) => return Err(err),
        };

        tracing::info!(
            instruction_id = %updated.id,
            instruction_code = %updated.instruction_code,
            status = %updated.status,
            source_uid = %notification.source_uid,
            "notification matched"
        );
        self.notifier.notify(&updated).await;

        Ok(MatchOutcome::Matched {
            instruction_id: updated.id.clone(),
            status: updated.status,
        })
    }
}
