use async_trait::async_trait;
use chrono::{DateTime, Utc};
use etransfer_relay::config::{AppConfig, WebhookConfig};
use etransfer_relay::domain::alias::EmailAlias;
use etransfer_relay::domain::instruction::{InstructionStatus, PaymentInstruction};
use etransfer_relay::domain::job::OutboundJob;
use etransfer_relay::domain::ports::{InstructionStore, JobQueue};
use etransfer_relay::error::{RelayError, Result};
use etransfer_relay::infrastructure::in_memory::{
    InMemoryAliasStore, InMemoryBlacklistStore, InMemoryInstructionStore,
};
use etransfer_relay::infrastructure::queue::InMemoryJobQueue;
use etransfer_relay::infrastructure::webhook::RecordingWebhookTransport;
use etransfer_relay::interfaces::http::state::AppState;
use std::sync::Arc;

/// Full in-memory service graph plus handles onto every adapter, so tests
/// can reach around the HTTP surface and assert on state directly.
pub struct TestHarness {
    pub state: AppState,
    pub instructions: InMemoryInstructionStore,
    pub aliases: InMemoryAliasStore,
    pub blacklist: InMemoryBlacklistStore,
    pub queue: InMemoryJobQueue,
    pub webhooks: RecordingWebhookTransport,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        webhook: WebhookConfig {
            url: Some("https://orders.example/webhook".to_string()),
            secret: "test-secret".to_string(),
        },
        ..AppConfig::default()
    }
}

pub fn harness() -> TestHarness {
    let config = test_config();
    let instructions = InMemoryInstructionStore::new();
    let aliases = InMemoryAliasStore::new();
    let blacklist = InMemoryBlacklistStore::new();
    let queue = InMemoryJobQueue::new();
    let webhooks = RecordingWebhookTransport::new();

    let state = AppState::assemble(
        &config,
        Arc::new(instructions.clone()),
        Arc::new(aliases.clone()),
        Arc::new(blacklist.clone()),
        Arc::new(queue.clone()),
        Arc::new(webhooks.clone()),
    );

    TestHarness {
        state,
        instructions,
        aliases,
        blacklist,
        queue,
        webhooks,
    }
}

pub fn alias(id: &str, daily_cap_cents: i64) -> EmailAlias {
    EmailAlias {
        alias_id: id.to_string(),
        email: format!("{id}@merchant.ca"),
        bank_slug: "scotia".to_string(),
        weight: 1,
        daily_total_cents: 0,
        daily_cap_cents,
        cool_off_minutes: 0,
        last_used_at: None,
        active: true,
    }
}

pub fn instruction(amount_cents: i64, created_at: DateTime<Utc>) -> PaymentInstruction {
    PaymentInstruction::new(
        "order-1",
        amount_cents,
        "CAD",
        "payer@example.com",
        "pay1@merchant.ca",
        "alias-1",
        "scotia",
        created_at,
    )
}

/// A queue that rejects every enqueue, for exercising the enqueue-failure
/// path after the instruction row is already durable.
#[derive(Default, Clone)]
pub struct FailingJobQueue;

#[async_trait]
impl JobQueue for FailingJobQueue {
    async fn enqueue(&self, _job: OutboundJob) -> Result<()> {
        Err(RelayError::Internal("queue transport down".to_string()))
    }

    async fn claim(&self) -> Result<Option<OutboundJob>> {
        Ok(None)
    }

    async fn depth(&self) -> Result<u64> {
        Ok(0)
    }
}

/// An instruction store whose reads fail, for exercising the assessor's
/// fail-closed path.
#[derive(Default, Clone)]
pub struct FailingInstructionStore;

#[async_trait]
impl InstructionStore for FailingInstructionStore {
    async fn insert(&self, _instruction: PaymentInstruction) -> Result<()> {
        Err(RelayError::Internal("store unavailable".to_string()))
    }

    async fn get(&self, _id: &str) -> Result<Option<PaymentInstruction>> {
        Err(RelayError::Internal("store unavailable".to_string()))
    }

    async fn transition(
        &self,
        _id: &str,
        _expected: InstructionStatus,
        _next: InstructionStatus,
        _request_ref: Option<String>,
    ) -> Result<PaymentInstruction> {
        Err(RelayError::Internal("store unavailable".to_string()))
    }

    async fn increment_resend(&self, _id: &str, _max: u8) -> Result<PaymentInstruction> {
        Err(RelayError::Internal("store unavailable".to_string()))
    }

    async fn set_payer_handle(
        &self,
        _id: &str,
        _payer_handle: &str,
    ) -> Result<PaymentInstruction> {
        Err(RelayError::Internal("store unavailable".to_string()))
    }

    async fn count_created_since(
        &self,
        _payer_handle: &str,
        _since: DateTime<Utc>,
    ) -> Result<u64> {
        Err(RelayError::Internal("store unavailable".to_string()))
    }

    async fn find_open_by_amount(&self, _amount_cents: i64) -> Result<Vec<PaymentInstruction>> {
        Err(RelayError::Internal("store unavailable".to_string()))
    }
}
