use crate::domain::alias::{EmailAlias, select_alias};
use crate::domain::instruction::{InstructionStatus, PaymentInstruction};
use crate::domain::ports::{AliasStore, InstructionStore};
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for instruction rows.
pub const CF_INSTRUCTIONS: &str = "instructions";
/// Column Family for the alias pool.
pub const CF_ALIASES: &str = "aliases";

/// A persistent store implementation using RocksDB.
///
/// Instructions and aliases live in separate Column Families with JSON
/// values. Conditional mutations (transitions, resend increments, claims)
/// are read-modify-write sequences, so they all run under `write_gate`: one
/// serialized critical section per store, which is what makes the claim's
/// qualification check atomic with its side effect in a single-process
/// deployment.
///
/// `Clone` shares the underlying `Arc<DB>` and the gate.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_gate: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// both column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_instructions = ColumnFamilyDescriptor::new(CF_INSTRUCTIONS, Options::default());
        let cf_aliases = ColumnFamilyDescriptor::new(CF_ALIASES, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_instructions, cf_aliases])
            .map_err(|err| RelayError::Internal(format!("failed to open RocksDB: {err}")))?;

        Ok(Self {
            db: Arc::new(db),
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| RelayError::Internal(format!("column family {name} not found")))
    }

    fn put_json<T: serde::Serialize>(&self, cf_name: &str, key: &str, value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)
            .map_err(|err| RelayError::Internal(format!("serialization error: {err}")))?;
        self.db
            .put_cf(&cf, key.as_bytes(), bytes)
            .map_err(|err| RelayError::Internal(format!("RocksDB write error: {err}")))
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &str,
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        let result = self
            .db
            .get_cf(&cf, key.as_bytes())
            .map_err(|err| RelayError::Internal(format!("RocksDB read error: {err}")))?;
        match result {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|err| RelayError::Internal(format!("deserialization error: {err}")))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn scan_json<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(&cf, rocksdb::IteratorMode::Start) {
            let (_key, bytes) = item
                .map_err(|err| RelayError::Internal(format!("RocksDB iteration error: {err}")))?;
            let value = serde_json::from_slice(&bytes)
                .map_err(|err| RelayError::Internal(format!("deserialization error: {err}")))?;
            values.push(value);
        }
        Ok(values)
    }
}

#[async_trait]
impl InstructionStore for RocksDBStore {
    async fn insert(&self, instruction: PaymentInstruction) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        self.put_json(CF_INSTRUCTIONS, &instruction.id, &instruction)
    }

    async fn get(&self, id: &str) -> Result<Option<PaymentInstruction>> {
        self.get_json(CF_INSTRUCTIONS, id)
    }

    async fn transition(
        &self,
        id: &str,
        expected: InstructionStatus,
        next: InstructionStatus,
        request_ref: Option<String>,
    ) -> Result<PaymentInstruction> {
        let _gate = self.write_gate.lock().await;
        let mut row: PaymentInstruction = self
            .get_json(CF_INSTRUCTIONS, id)?
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
        self.put_json(CF_INSTRUCTIONS, id, &row)?;
        Ok(row)
    }

    async fn increment_resend(&self, id: &str, max: u8) -> Result<PaymentInstruction> {
        let _gate = self.write_gate.lock().await;
        let mut row: PaymentInstruction = self
            .get_json(CF_INSTRUCTIONS, id)?
            .ok_or_else(|| RelayError::NotFound(id.to_string()))?;
        if row.resend_count >= max {
            return Err(RelayError::MaxResendsExceeded(id.to_string()));
        }
        row.resend_count += 1;
        row.updated_at = Utc::now();
        self.put_json(CF_INSTRUCTIONS, id, &row)?;
        Ok(row)
    }

    async fn set_payer_handle(&self, id: &str, payer_handle: &str) -> Result<PaymentInstruction> {
        let _gate = self.write_gate.lock().await;
        let mut row: PaymentInstruction = self
            .get_json(CF_INSTRUCTIONS, id)?
            .ok_or_else(|| RelayError::NotFound(id.to_string()))?;
        row.payer_handle = payer_handle.to_string();
        row.updated_at = Utc::now();
        self.put_json(CF_INSTRUCTIONS, id, &row)?;
        Ok(row)
    }

    async fn count_created_since(&self, payer_handle: &str, since: DateTime<Utc>) -> Result<u64> {
        let rows: Vec<PaymentInstruction> = self.scan_json(CF_INSTRUCTIONS)?;
        Ok(rows
            .iter()
            .filter(|row| row.payer_handle == payer_handle && row.created_at >= since)
            .count() as u64)
    }

    async fn find_open_by_amount(&self, amount_cents: i64) -> Result<Vec<PaymentInstruction>> {
        let rows: Vec<PaymentInstruction> = self.scan_json(CF_INSTRUCTIONS)?;
        Ok(rows
            .into_iter()
            .filter(|row| row.is_open() && row.amount_cents == amount_cents)
            .collect())
    }
}

#[async_trait]
impl AliasStore for RocksDBStore {
    async fn insert(&self, alias: EmailAlias) -> Result<()> {
        let _gate = self.write_gate.lock().await;
        self.put_json(CF_ALIASES, &alias.alias_id, &alias)
    }

    async fn get(&self, alias_id: &str) -> Result<Option<EmailAlias>> {
        self.get_json(CF_ALIASES, alias_id)
    }

    async fn claim(&self, amount_cents: i64, now: DateTime<Utc>) -> Result<Option<EmailAlias>> {
        let _gate = self.write_gate.lock().await;
        let aliases: Vec<EmailAlias> = self.scan_json(CF_ALIASES)?;
        let Some(chosen) = select_alias(aliases.iter(), amount_cents, now) else {
            return Ok(None);
        };
        let mut claimed = chosen.clone();
        claimed.record_claim(amount_cents, now);
        self.put_json(CF_ALIASES, &claimed.alias_id, &claimed)?;
        Ok(Some(claimed))
    }

    async fn active_count(&self) -> Result<u64> {
        let aliases: Vec<EmailAlias> = self.scan_json(CF_ALIASES)?;
        Ok(aliases.iter().filter(|alias| alias.active).count() as u64)
    }
}
