use super::alias::EmailAlias;
use super::instruction::{InstructionStatus, PaymentInstruction};
use super::job::OutboundJob;
use super::risk::{BlacklistEntry, RiskCandidate};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub type InstructionStoreRef = Arc<dyn InstructionStore>;
pub type AliasStoreRef = Arc<dyn AliasStore>;
pub type BlacklistStoreRef = Arc<dyn BlacklistStore>;
pub type JobQueueRef = Arc<dyn JobQueue>;
pub type WebhookTransportRef = Arc<dyn WebhookTransport>;

/// Owner of all `PaymentInstruction` rows. Every mutation is conditional:
/// a transition either fully applies against the expected current state or
/// fails with a structured error, so concurrent writers cannot silently
/// overwrite each other.
#[async_trait]
pub trait InstructionStore: Send + Sync {
    async fn insert(&self, instruction: PaymentInstruction) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<PaymentInstruction>>;

    /// Advances `id` from `expected` to `next`, stamping `updated_at` and
    /// recording `request_ref` when given. Fails with `StaleTransition` if
    /// the row is no longer in `expected`, and with `IllegalTransition` if
    /// the move is not in the state machine's table.
    async fn transition(
        &self,
        id: &str,
        expected: InstructionStatus,
        next: InstructionStatus,
        request_ref: Option<String>,
    ) -> Result<PaymentInstruction>;

    /// Increments `resend_count` unless it has already reached `max`.
    async fn increment_resend(&self, id: &str, max: u8) -> Result<PaymentInstruction>;

    async fn set_payer_handle(&self, id: &str, payer_handle: &str) -> Result<PaymentInstruction>;

    /// Velocity input: how many instructions `payer_handle` created at or
    /// after `since`.
    async fn count_created_since(&self, payer_handle: &str, since: DateTime<Utc>) -> Result<u64>;

    /// All non-terminal instructions with exactly this amount. The caller
    /// applies the most-recently-created tie-break.
    async fn find_open_by_amount(&self, amount_cents: i64) -> Result<Vec<PaymentInstruction>>;
}

/// Owner of the alias pool. `claim` is the atomic primitive: qualification
/// (capacity + cool-off) and the side effect (bump `daily_total_cents`, set
/// `last_used_at`) happen in one critical section. A separate read-then-write
/// would let two concurrent claims overshoot the daily cap.
#[async_trait]
pub trait AliasStore: Send + Sync {
    async fn insert(&self, alias: EmailAlias) -> Result<()>;

    async fn get(&self, alias_id: &str) -> Result<Option<EmailAlias>>;

    /// Atomically selects and claims one alias for `amount_cents`, returning
    /// the alias as claimed. `None` means no alias currently qualifies.
    async fn claim(&self, amount_cents: i64, now: DateTime<Utc>) -> Result<Option<EmailAlias>>;

    async fn active_count(&self) -> Result<u64>;
}

#[async_trait]
pub trait BlacklistStore: Send + Sync {
    async fn insert(&self, entry: BlacklistEntry) -> Result<()>;

    /// First match wins, checked in email, phone, ip order.
    async fn find_match(&self, candidate: &RiskCandidate) -> Result<Option<BlacklistEntry>>;
}

/// Durable work queue between admission and the bank automation worker.
/// Delivery is at-least-once; consumers must be idempotent per `job_id`.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: OutboundJob) -> Result<()>;

    /// Hands the next job to a worker, or `None` when the queue is empty.
    /// Never blocks waiting for work.
    async fn claim(&self) -> Result<Option<OutboundJob>>;

    async fn depth(&self) -> Result<u64>;
}

/// Header the transport sets to the hex-encoded HMAC-SHA256 of the body.
pub const SIGNATURE_HEADER: &str = "X-Relay-Signature";

/// A signed webhook ready for delivery.
#[derive(Debug, PartialEq, Clone)]
pub struct WebhookDelivery {
    pub url: String,
    /// Exact serialized body the signature was computed over.
    pub body: String,
    /// Hex-encoded HMAC-SHA256 of `body`.
    pub signature: String,
}

/// Outbound side of webhook delivery. The real HTTP client lives outside the
/// core; failures are reported back so the caller can log them, never to
/// roll back a state change.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn deliver(&self, delivery: WebhookDelivery) -> Result<()>;
}
