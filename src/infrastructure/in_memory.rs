use crate::domain::alias::{EmailAlias, select_alias};
use crate::domain::instruction::{InstructionStatus, PaymentInstruction};
use crate::domain::ports::{AliasStore, BlacklistStore, InstructionStore};
use crate::domain::risk::{BlacklistEntry, BlacklistKind, RiskCandidate};
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory instruction store.
///
/// Uses `Arc<RwLock<HashMap>>` for shared concurrent access. Conditional
/// mutations (transitions, resend increments) run under one write lock, so
/// they are atomic with their own qualification check.
#[derive(Default, Clone)]
pub struct InMemoryInstructionStore {
    rows: Arc<RwLock<HashMap<String, PaymentInstruction>>>,
}

impl InMemoryInstructionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstructionStore for InMemoryInstructionStore {
    async fn insert(&self, instruction: PaymentInstruction) -> Result<()> {
        let mut rows = self.rows.write().await;
        rows.insert(instruction.id.clone(), instruction);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<PaymentInstruction>> {
        let rows = self.rows.read().await;
        Ok(rows.get(id).cloned())
    }

    async fn transition(
        &self,
        id: &str,
        expected: InstructionStatus,
        next: InstructionStatus,
        request_ref: Option<String>,
    ) -> Result<PaymentInstruction> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(id)
            .ok_or_else(|| RelayError::NotFound(id.to_string()))?;
        if row.status != expected {
            return Err(RelayError::StaleTransition {
                id: id.to_string(),
                expected,
                actual: row.status,
            });
        }
        if !expected.can_advance_to(next) {
            return Err(RelayError::IllegalTransition {
                from: expected,
                to: next,
            });
        }
        row.status = next;
        if let Some(reference) = request_ref {
            row.request_ref = Some(reference);
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn increment_resend(&self, id: &str, max: u8) -> Result<PaymentInstruction> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(id)
            .ok_or_else(|| RelayError::NotFound(id.to_string()))?;
        if row.resend_count >= max {
            return Err(RelayError::MaxResendsExceeded(id.to_string()));
        }
        row.resend_count += 1;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn set_payer_handle(&self, id: &str, payer_handle: &str) -> Result<PaymentInstruction> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(id)
            .ok_or_else(|| RelayError::NotFound(id.to_string()))?;
        row.payer_handle = payer_handle.to_string();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn count_created_since(&self, payer_handle: &str, since: DateTime<Utc>) -> Result<u64> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|row| row.payer_handle == payer_handle && row.created_at >= since)
            .count() as u64)
    }

    async fn find_open_by_amount(&self, amount_cents: i64) -> Result<Vec<PaymentInstruction>> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|row| row.is_open() && row.amount_cents == amount_cents)
            .cloned()
            .collect())
    }
}

/// A thread-safe in-memory alias pool.
///
/// `claim` holds the write lock across selection and mutation, which is what
/// keeps concurrent claims from jointly overshooting a daily cap.
#[derive(Default, Clone)]
pub struct InMemoryAliasStore {
    aliases: Arc<RwLock<HashMap<String, EmailAlias>>>,
}

impl InMemoryAliasStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AliasStore for InMemoryAliasStore {
    async fn insert(&self, alias: EmailAlias) -> Result<()> {
        let mut aliases = self.aliases.write().await;
        aliases.insert(alias.alias_id.clone(), alias);
        Ok(())
    }

    async fn get(&self, alias_id: &str) -> Result<Option<EmailAlias>> {
        let aliases = self.aliases.read().await;
        Ok(aliases.get(alias_id).cloned())
    }

    async fn claim(&self, amount_cents: i64, now: DateTime<Utc>) -> Result<Option<EmailAlias>> {
        let mut aliases = self.aliases.write().await;
        let chosen = select_alias(aliases.values(), amount_cents, now)
            .map(|alias| alias.alias_id.clone());
        if let Some(alias_id) = chosen
            && let Some(alias) = aliases.get_mut(&alias_id)
        {
            alias.record_claim(amount_cents, now);
            return Ok(Some(alias.clone()));
        }
        Ok(None)
    }

    async fn active_count(&self) -> Result<u64> {
        let aliases = self.aliases.read().await;
        Ok(aliases.values().filter(|alias| alias.active).count() as u64)
    }
}

/// In-memory deny list, loaded at boot and read-only afterwards.
#[derive(Default, Clone)]
pub struct InMemoryBlacklistStore {
    entries: Arc<RwLock<Vec<BlacklistEntry>>>,
}

impl InMemoryBlacklistStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlacklistStore for InMemoryBlacklistStore {
    async fn insert(&self, entry: BlacklistEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        Ok(())
    }

    async fn find_match(&self, candidate: &RiskCandidate) -> Result<Option<BlacklistEntry>> {
        let entries = self.entries.read().await;
        let lookup = |kind: BlacklistKind, value: Option<&String>| {
            value.and_then(|value| {
                entries
                    .iter()
                    .find(|entry| entry.kind == kind && entry.value == *value)
                    .cloned()
            })
        };
        Ok(lookup(BlacklistKind::Email, candidate.email.as_ref())
            .or_else(|| lookup(BlacklistKind::Phone, candidate.phone.as_ref()))
            .or_else(|| lookup(BlacklistKind::Ip, candidate.ip_address.as_ref())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instruction(amount_cents: i64) -> PaymentInstruction {
        PaymentInstruction::new(
            "order-1",
            amount_cents,
            "CAD",
            "payer@example.com",
            "pay1@merchant.ca",
            "alias-1",
            "scotia",
            Utc::now(),
        )
    }

    fn alias(id: &str, cap: i64) -> EmailAlias {
        EmailAlias {
            alias_id: id.to_string(),
            email: format!("{id}@merchant.ca"),
            bank_slug: "scotia".to_string(),
            weight: 1,
            daily_total_cents: 0,
            daily_cap_cents: cap,
            cool_off_minutes: 0,
            last_used_at: None,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_transition_stamps_updated_at() {
        let store = InMemoryInstructionStore::new();
        let row = instruction(2500);
        store.insert(row.clone()).await.unwrap();

        let updated = store
            .transition(
                &row.id,
                InstructionStatus::Waiting,
                InstructionStatus::Requested,
                Some("REF-1".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, InstructionStatus::Requested);
        assert_eq!(updated.request_ref.as_deref(), Some("REF-1"));
        assert!(updated.updated_at >= row.updated_at);
    }

    #[tokio::test]
    async fn test_stale_transition_rejected() {
        let store = InMemoryInstructionStore::new();
        let row = instruction(2500);
        store.insert(row.clone()).await.unwrap();
        store
            .transition(
                &row.id,
                InstructionStatus::Waiting,
                InstructionStatus::Requested,
                None,
            )
            .await
            .unwrap();

        let err = store
            .transition(
                &row.id,
                InstructionStatus::Waiting,
                InstructionStatus::Requested,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::StaleTransition { .. }));
    }

    #[tokio::test]
    async fn test_terminal_state_cannot_be_left() {
        let store = InMemoryInstructionStore::new();
        let row = instruction(2500);
        store.insert(row.clone()).await.unwrap();
        store
            .transition(
                &row.id,
                InstructionStatus::Waiting,
                InstructionStatus::Cancelled,
                None,
            )
            .await
            .unwrap();

        let err = store
            .transition(
                &row.id,
                InstructionStatus::Cancelled,
                InstructionStatus::Approved,
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn test_resend_counter_capped() {
        let store = InMemoryInstructionStore::new();
        let row = instruction(2500);
        store.insert(row.clone()).await.unwrap();

        assert_eq!(store.increment_resend(&row.id, 2).await.unwrap().resend_count, 1);
        assert_eq!(store.increment_resend(&row.id, 2).await.unwrap().resend_count, 2);
        let err = store.increment_resend(&row.id, 2).await.unwrap_err();
        assert!(matches!(err, RelayError::MaxResendsExceeded(_)));
    }

    #[tokio::test]
    async fn test_find_open_excludes_terminal() {
        let store = InMemoryInstructionStore::new();
        let open = instruction(2500);
        let closed = instruction(2500);
        store.insert(open.clone()).await.unwrap();
        store.insert(closed.clone()).await.unwrap();
        store
            .transition(
                &closed.id,
                InstructionStatus::Waiting,
                InstructionStatus::Cancelled,
                None,
            )
            .await
            .unwrap();

        let found = store.find_open_by_amount(2500).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, open.id);
    }

    #[tokio::test]
    async fn test_claim_consumes_capacity() {
        let store = InMemoryAliasStore::new();
        store.insert(alias("a", 5_000)).await.unwrap();

        let now = Utc::now();
        let claimed = store.claim(3_000, now).await.unwrap().unwrap();
        assert_eq!(claimed.daily_total_cents, 3_000);

        // 3000 + 3000 would overshoot the 5000 cap.
        assert!(store.claim(3_000, now).await.unwrap().is_none());
        assert!(store.claim(2_000, now).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_blacklist_first_match_order() {
        let store = InMemoryBlacklistStore::new();
        store
            .insert(BlacklistEntry {
                kind: BlacklistKind::Ip,
                value: "10.0.0.1".to_string(),
                reason: "abuse".to_string(),
            })
            .await
            .unwrap();
        store
            .insert(BlacklistEntry {
                kind: BlacklistKind::Email,
                value: "fraud@example.com".to_string(),
                reason: "chargeback history".to_string(),
            })
            .await
            .unwrap();

        let candidate = RiskCandidate {
            email: Some("fraud@example.com".to_string()),
            ip_address: Some("10.0.0.1".to_string()),
            ..RiskCandidate::default()
        };
        let hit = store.find_match(&candidate).await.unwrap().unwrap();
        assert_eq!(hit.kind, BlacklistKind::Email);
    }
}
