mod common;

use common::{FailingJobQueue, alias, harness, test_config};
use etransfer_relay::application::admission::AdmissionRequest;
use etransfer_relay::domain::instruction::InstructionStatus;
use etransfer_relay::domain::ports::{AliasStore, BlacklistStore, InstructionStore, JobQueue};
use etransfer_relay::domain::risk::{BlacklistEntry, BlacklistKind};
use etransfer_relay::error::RelayError;
use etransfer_relay::infrastructure::in_memory::{
    InMemoryAliasStore, InMemoryBlacklistStore, InMemoryInstructionStore,
};
use etransfer_relay::infrastructure::webhook::RecordingWebhookTransport;
use etransfer_relay::interfaces::http::state::AppState;
use std::sync::Arc;

fn request(order_id: &str, amount_cents: i64, payer: &str) -> AdmissionRequest {
    AdmissionRequest {
        order_id: order_id.to_string(),
        amount_cents,
        payer_handle: payer.to_string(),
        currency: None,
        email: Some(payer.to_string()),
        phone: None,
        ip_address: None,
        billing_address: None,
        shipping_address: None,
    }
}

#[tokio::test]
async fn test_admission_happy_path() {
    let h = harness();
    h.aliases.insert(alias("alias-1", 100_000)).await.unwrap();

    let outcome = h
        .state
        .admission
        .admit(request("order-1", 2500, "a@b.com"))
        .await
        .unwrap();

    assert_eq!(outcome.status, InstructionStatus::Waiting);
    assert!(outcome.instruction_code.starts_with("ETR-"));

    // The claim spent alias capacity and exactly one job was queued.
    let claimed = h.aliases.get("alias-1").await.unwrap().unwrap();
    assert_eq!(claimed.daily_total_cents, 2500);
    assert_eq!(h.queue.depth().await.unwrap(), 1);

    let stored = h
        .instructions
        .get(&outcome.instruction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, InstructionStatus::Waiting);
    assert_eq!(stored.recipient_alias, "alias-1@merchant.ca");
    assert_eq!(stored.currency, "CAD");
}

#[tokio::test]
async fn test_denial_has_no_side_effects() {
    let h = harness();
    h.aliases.insert(alias("alias-1", 100_000)).await.unwrap();
    h.blacklist
        .insert(BlacklistEntry {
            kind: BlacklistKind::Email,
            value: "fraud@example.com".to_string(),
            reason: "chargeback history".to_string(),
        })
        .await
        .unwrap();

    let err = h
        .state
        .admission
        .admit(request("order-1", 2500, "fraud@example.com"))
        .await
        .unwrap_err();
    let RelayError::DeniedByRisk { score, reasons } = err else {
        panic!("expected risk denial");
    };
    assert_eq!(score, 100);
    assert!(!reasons.is_empty());

    // No alias claimed, no row persisted, nothing queued.
    let untouched = h.aliases.get("alias-1").await.unwrap().unwrap();
    assert_eq!(untouched.daily_total_cents, 0);
    assert!(untouched.last_used_at.is_none());
    assert_eq!(h.queue.depth().await.unwrap(), 0);
    assert!(
        h.instructions
            .find_open_by_amount(2500)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_empty_pool_is_no_capacity() {
    let h = harness();
    let err = h
        .state
        .admission
        .admit(request("order-1", 2500, "a@b.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::NoCapacityAvailable));
}

#[tokio::test]
async fn test_enqueue_failure_keeps_durable_row() {
    let instructions = InMemoryInstructionStore::new();
    let aliases = InMemoryAliasStore::new();
    aliases.insert(alias("alias-1", 100_000)).await.unwrap();
    let state = AppState::assemble(
        &test_config(),
        Arc::new(instructions.clone()),
        Arc::new(aliases.clone()),
        Arc::new(InMemoryBlacklistStore::new()),
        Arc::new(FailingJobQueue),
        Arc::new(RecordingWebhookTransport::new()),
    );

    let err = state
        .admission
        .admit(request("order-1", 2500, "a@b.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::EnqueueFailure(_)));

    // The instruction survived the enqueue failure and is retriable.
    let rows = instructions.find_open_by_amount(2500).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, InstructionStatus::Waiting);

    // The claim's capacity cost is not rolled back.
    let claimed = aliases.get("alias-1").await.unwrap().unwrap();
    assert_eq!(claimed.daily_total_cents, 2500);
}

#[tokio::test]
async fn test_explicit_currency_is_kept() {
    let h = harness();
    h.aliases.insert(alias("alias-1", 100_000)).await.unwrap();

    let mut req = request("order-1", 2500, "a@b.com");
    req.currency = Some("USD".to_string());
    let outcome = h.state.admission.admit(req).await.unwrap();

    let stored = h
        .instructions
        .get(&outcome.instruction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.currency, "USD");
}
