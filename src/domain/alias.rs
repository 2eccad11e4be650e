use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A sender identity a partner bank associates with transfer requests.
///
/// Each alias carries a daily volume cap and a minimum spacing between uses;
/// both are checked at claim time, atomically with the claim's side effect.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct EmailAlias {
    pub alias_id: String,
    pub email: String,
    pub bank_slug: String,
    /// Selection priority; higher weight wins.
    pub weight: i32,
    /// Cumulative claimed amount for the rolling day, in cents.
    pub daily_total_cents: i64,
    /// Hard ceiling on `daily_total_cents`.
    pub daily_cap_cents: i64,
    /// Minimum idle time between uses. Zero disables the cool-off.
    pub cool_off_minutes: i64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl EmailAlias {
    /// Whether this alias may be claimed for `amount_cents` at `now`.
    pub fn can_accept(&self, amount_cents: i64, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        if self.daily_total_cents + amount_cents > self.daily_cap_cents {
            return false;
        }
        if self.cool_off_minutes > 0
            && let Some(last) = self.last_used_at
            && now.signed_duration_since(last) <= Duration::minutes(self.cool_off_minutes)
        {
            return false;
        }
        true
    }

    /// Applies the claim's side effect. Must only be called while the caller
    /// holds whatever lock made the `can_accept` check atomic with this write.
    pub fn record_claim(&mut self, amount_cents: i64, now: DateTime<Utc>) {
        self.daily_total_cents += amount_cents;
        self.last_used_at = Some(now);
    }
}

/// The one canonical selection policy: among qualifying aliases, highest
/// weight wins, least-recently-used breaks ties (never-used first).
pub fn select_alias<'a, I>(aliases: I, amount_cents: i64, now: DateTime<Utc>) -> Option<&'a EmailAlias>
where
    I: IntoIterator<Item = &'a EmailAlias>,
{
    let mut qualified: Vec<&EmailAlias> = aliases
        .into_iter()
        .filter(|alias| alias.can_accept(amount_cents, now))
        .collect();
    qualified.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then(a.last_used_at.cmp(&b.last_used_at))
            .then(a.alias_id.cmp(&b.alias_id))
    });
    qualified.first().copied()
}
