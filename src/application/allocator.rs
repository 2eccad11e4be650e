use crate::domain::alias::EmailAlias;
use crate::domain::ports::AliasStoreRef;
use crate::error::{RelayError, Result};
use chrono::Utc;

/// Claims one capacity-limited sender identity per admitted payment.
///
/// Selection and the claim's side effect are atomic inside the store; this
/// service only maps the outcome. Capacity is never reserved speculatively
/// and a failed downstream step does not roll the claim back.
pub struct AliasAllocator {
    aliases: AliasStoreRef,
}

impl AliasAllocator {
    pub fn new(aliases: AliasStoreRef) -> Self {
        Self { aliases }
    }

    pub async fn claim(&self, amount_cents: i64) -> Result<EmailAlias> {
        match self.aliases.claim(amount_cents, Utc::now()).await? {
            Some(alias) => {
                tracing::info!(
                    alias = %alias.email,
                    bank = %alias.bank_slug,
                    amount_cents,
                    daily_total_cents = alias.daily_total_cents,
                    "claimed sender alias"
                );
                Ok(alias)
            }
            None => Err(RelayError::NoCapacityAvailable),
        }
    }
}
