use serde::{Deserialize, Serialize};
use std::fmt;

/// Score at which a candidate is denied even without an explicit veto.
pub const MAX_RISK_SCORE: u32 = 100;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum BlacklistKind {
    Email,
    Phone,
    Ip,
}

impl fmt::Display for BlacklistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email => f.write_str("email"),
            Self::Phone => f.write_str("phone"),
            Self::Ip => f.write_str("ip"),
        }
    }
}

/// A single deny-list entry. Read-only from the assessor's perspective.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct BlacklistEntry {
    pub kind: BlacklistKind,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct Address {
    pub line1: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Mismatch on any of line, city, postal code or country counts.
    pub fn differs_from(&self, other: &Address) -> bool {
        self.line1 != other.line1
            || self.city != other.city
            || self.postal_code != other.postal_code
            || self.country != other.country
    }
}

/// Everything the assessor gets to look at for one candidate payment.
#[derive(Debug, Clone, Default)]
pub struct RiskCandidate {
    pub payer_handle: String,
    pub amount_cents: i64,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub ip_address: Option<String>,
    pub billing_address: Option<Address>,
    pub shipping_address: Option<Address>,
}

/// Produced fresh per assessment call; never persisted.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct RiskVerdict {
    pub allow: bool,
    pub score: u32,
    pub reasons: Vec<String>,
}
