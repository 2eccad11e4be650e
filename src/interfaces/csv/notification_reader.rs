use crate::domain::notification::{InboundNotification, StatusHint};
use crate::error::{RelayError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct NotificationRow {
    source_uid: String,
    status_hint: String,
    amount_cents: i64,
    order_reference: Option<String>,
    text: String,
}

impl From<NotificationRow> for InboundNotification {
    fn from(row: NotificationRow) -> Self {
        Self {
            status_hint: StatusHint::parse(&row.status_hint),
            amount_cents: row.amount_cents,
            order_reference: row.order_reference.filter(|r| !r.is_empty()),
            raw_text: row.text,
            source_uid: row.source_uid,
        }
    }
}

/// Reads mailbox notifications from a CSV export.
///
/// Wraps `csv::Reader` and provides an iterator over
/// `Result<InboundNotification>`, trimming whitespace and tolerating
/// flexible record lengths. Used by the `replay` subcommand to re-reconcile
/// from an exported notification log.
pub struct NotificationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> NotificationReader<R> {
    /// Creates a new `NotificationReader` from any `Read` source.
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and deserializes notifications, streaming large exports
    /// without loading them into memory.
    pub fn notifications(self) -> impl Iterator<Item = Result<InboundNotification>> {
        self.reader
            .into_deserialize::<NotificationRow>()
            .map(|result| result.map(Into::into).map_err(RelayError::from))
    }
}
