use super::instruction::PaymentInstruction;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One unit of work for the bank automation worker: the full instruction
/// snapshot plus the claimed alias. The `job_id` is unique per enqueue so
/// worker-side processing can be idempotent under at-least-once delivery.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct OutboundJob {
    pub job_id: String,
    pub alias_id: String,
    pub instruction: PaymentInstruction,
}

impl OutboundJob {
    pub fn for_instruction(instruction: PaymentInstruction) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            alias_id: instruction.alias_id.clone(),
            instruction,
        }
    }
}
