use crate::domain::instruction::InstructionStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    /// Terminal for this attempt; carries machine-readable reasons.
    #[error("payment denied by risk assessment (score {score})")]
    DeniedByRisk { score: u32, reasons: Vec<String> },

    /// Transient: retry later or add alias capacity.
    #[error("no sender alias has capacity for this amount")]
    NoCapacityAvailable,

    /// Terminal for the instruction's delivery retries.
    #[error("max resends exceeded for instruction {0}")]
    MaxResendsExceeded(String),

    #[error("instruction {0} not found")]
    NotFound(String),

    /// Transient: the instruction row is persisted and safe to retry.
    #[error("failed to enqueue outbound job: {0}")]
    EnqueueFailure(String),

    /// Optimistic concurrency: the row moved on since it was read.
    #[error("stale transition on instruction {id}: expected {expected}, found {actual}")]
    StaleTransition {
        id: String,
        expected: InstructionStatus,
        actual: InstructionStatus,
    },

    #[error("illegal transition {from} -> {to}")]
    IllegalTransition {
        from: InstructionStatus,
        to: InstructionStatus,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;
