use serde::Serialize;

/// Best-effort classification of what a bank notification is telling us.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum StatusHint {
    Approved,
    Deposited,
    Cancelled,
    Requested,
    Unknown,
}

impl StatusHint {
    /// Maps the watcher's hint token to a variant. Tolerant of the spelling
    /// variants the upstream parser emits ("canceled", "declined",
    /// "accepted"); anything unrecognized is `Unknown`, never `Requested`.
    pub fn parse(raw: &str) -> Self {
        let token = raw.trim().to_ascii_lowercase();
        if token.contains("deposit") {
            Self::Deposited
        } else if token.contains("cancel") || token.contains("declin") {
            Self::Cancelled
        } else if token.contains("approv") || token.contains("accept") {
            Self::Approved
        } else if token.contains("request") {
            Self::Requested
        } else {
            Self::Unknown
        }
    }
}

/// One parsed mailbox notification, produced by the external watcher and
/// consumed exactly once by the matcher.
#[derive(Debug, Clone)]
pub struct InboundNotification {
    pub status_hint: StatusHint,
    pub amount_cents: i64,
    /// Best-effort; bank notification text does not reliably carry it.
    pub order_reference: Option<String>,
    pub raw_text: String,
    /// Mailbox UID of the source message, for tracing.
    pub source_uid: String,
}
