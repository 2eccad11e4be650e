use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Hard ceiling on delivery retries for a single instruction.
pub const MAX_RESENDS: u8 = 2;

/// Lifecycle of a payment instruction.
///
/// Transitions are one-directional: an instruction never moves backward and
/// never leaves a terminal state. `can_advance_to` is the single authority on
/// which moves are legal; every store enforces it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum InstructionStatus {
    /// Created and queued for the bank automation worker.
    Waiting,
    /// The worker confirmed the request was submitted to the bank.
    Requested,
    /// A mailbox notification reported the transfer as accepted.
    Approved,
    /// Funds received. Terminal.
    Deposited,
    /// Explicitly declined or cancelled. Terminal.
    Cancelled,
}

impl InstructionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Deposited | Self::Cancelled)
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_advance_to(self, next: Self) -> bool {
        use InstructionStatus::*;
        matches!(
            (self, next),
            (Waiting, Requested | Approved | Deposited | Cancelled)
                | (Requested, Approved | Deposited | Cancelled)
                | (Approved, Deposited | Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Requested => "requested",
            Self::Approved => "approved",
            Self::Deposited => "deposited",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for InstructionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The durable record of one outbound e-Transfer request tied to one order.
///
/// Owned exclusively by the instruction store; mutated only through the
/// store's conditional operations.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentInstruction {
    pub id: String,
    pub order_id: String,
    /// Amount in currency minor units (cents).
    pub amount_cents: i64,
    pub currency: String,
    /// The contact the payer uses to receive and accept the transfer.
    pub payer_handle: String,
    /// The claimed sender alias address the request goes out from.
    pub recipient_alias: String,
    pub alias_id: String,
    pub bank_slug: String,
    /// Human-traceable code quoted in outbound email and webhooks.
    pub instruction_code: String,
    pub status: InstructionStatus,
    pub resend_count: u8,
    /// Reference returned by the bank once submission succeeds.
    pub request_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentInstruction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_id: impl Into<String>,
        amount_cents: i64,
        currency: impl Into<String>,
        payer_handle: impl Into<String>,
        recipient_alias: impl Into<String>,
        alias_id: impl Into<String>,
        bank_slug: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.into(),
            amount_cents,
            currency: currency.into(),
            payer_handle: payer_handle.into(),
            recipient_alias: recipient_alias.into(),
            alias_id: alias_id.into(),
            bank_slug: bank_slug.into(),
            instruction_code: generate_instruction_code(),
            status: InstructionStatus::Waiting,
            resend_count: 0,
            request_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Open instructions are the ones inbound notifications may still match.
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Generates a short traceable code, e.g. `ETR-7K2PQX9M`.
pub fn generate_instruction_code() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    let tail: String = (0..8)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("ETR-{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(now: DateTime<Utc>) -> PaymentInstruction {
        PaymentInstruction::new(
            "order-1",
            2500,
            "CAD",
            "payer@example.com",
            "pay1@merchant.ca",
            "alias-1",
            "scotia",
            now,
        )
    }

    #[test]
    fn test_new_instruction_starts_waiting() {
        let now = Utc::now();
        let instruction = sample(now);
        assert_eq!(instruction.status, InstructionStatus::Waiting);
        assert_eq!(instruction.resend_count, 0);
        assert!(instruction.request_ref.is_none());
        assert_eq!(instruction.created_at, instruction.updated_at);
    }

    #[test]
    fn test_forward_transitions_allowed() {
        use InstructionStatus::*;
        assert!(Waiting.can_advance_to(Requested));
        assert!(Waiting.can_advance_to(Approved));
        assert!(Waiting.can_advance_to(Cancelled));
        assert!(Requested.can_advance_to(Approved));
        assert!(Requested.can_advance_to(Deposited));
        assert!(Requested.can_advance_to(Cancelled));
        assert!(Approved.can_advance_to(Deposited));
        assert!(Approved.can_advance_to(Cancelled));
    }

    #[test]
    fn test_no_backward_or_terminal_transitions() {
        use InstructionStatus::*;
        assert!(!Requested.can_advance_to(Waiting));
        assert!(!Approved.can_advance_to(Requested));
        for terminal in [Deposited, Cancelled] {
            for next in [Waiting, Requested, Approved, Deposited, Cancelled] {
                assert!(!terminal.can_advance_to(next));
            }
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(InstructionStatus::Deposited.is_terminal());
        assert!(InstructionStatus::Cancelled.is_terminal());
        assert!(!InstructionStatus::Waiting.is_terminal());
        assert!(!InstructionStatus::Requested.is_terminal());
        assert!(!InstructionStatus::Approved.is_terminal());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&InstructionStatus::Waiting).unwrap();
        assert_eq!(json, "\"waiting\"");
    }

    #[test]
    fn test_instruction_code_shape() {
        let code = generate_instruction_code();
        assert!(code.starts_with("ETR-"));
        assert_eq!(code.len(), 12);
    }
}
