use crate::domain::instruction::{InstructionStatus, PaymentInstruction};
use crate::domain::job::OutboundJob;
use crate::domain::ports::{InstructionStoreRef, JobQueueRef};
use crate::error::{RelayError, Result};

/// The core's side of the bank automation worker contract. The worker itself
/// is an external collaborator: it claims jobs, drives a bank website, and
/// reports the outcome back here.
pub struct OutboundService {
    instructions: InstructionStoreRef,
    queue: JobQueueRef,
}

impl OutboundService {
    pub fn new(instructions: InstructionStoreRef, queue: JobQueueRef) -> Self {
        Self {
            instructions,
            queue,
        }
    }

    pub async fn next_job(&self) -> Result<Option<OutboundJob>> {
        self.queue.claim().await
    }

    /// Records a successful bank submission: WAITING -> REQUESTED with the
    /// bank's reference. Replayed completions fail the conditional check, so
    /// an at-least-once queue cannot double-apply.
    pub async fn complete_submission(
        &self,
        instruction_id: &str,
        request_ref: &str,
    ) -> Result<PaymentInstruction> {
        let updated = self
            .instructions
            .transition(
                instruction_id,
                InstructionStatus::Waiting,
                InstructionStatus::Requested,
                Some(request_ref.to_string()),
            )
            .await?;
        tracing::info!(
            instruction_id = %updated.id,
            request_ref = %request_ref,
            "bank submission confirmed"
        );
        Ok(updated)
    }

    /// Records a failed bank submission. The instruction stays WAITING and a
    /// fresh snapshot job is queued so the worker pool can try again.
    pub async fn fail_submission(
        &self,
        instruction_id: &str,
        reason: &str,
    ) -> Result<PaymentInstruction> {
        let instruction = self
            .instructions
            .get(instruction_id)
            .await?
            .ok_or_else(|| RelayError::NotFound(instruction_id.to_string()))?;
        tracing::warn!(
            instruction_id = %instruction.id,
            reason = %reason,
            status = %instruction.status,
            "bank submission failed"
        );
        if instruction.status == InstructionStatus::Waiting {
            self.queue
                .enqueue(OutboundJob::for_instruction(instruction.clone()))
                .await
                .map_err(|err| RelayError::EnqueueFailure(err.to_string()))?;
        }
        Ok(instruction)
    }
}
