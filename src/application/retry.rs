use crate::domain::instruction::PaymentInstruction;
use crate::domain::job::OutboundJob;
use crate::domain::ports::{InstructionStoreRef, JobQueueRef};
use crate::error::{RelayError, Result};

/// Bounded resend and handle-correction paths. Both re-enqueue an existing
/// instruction without re-running risk or claiming a new alias, and each
/// call produces exactly one new outbound job.
pub struct RetryController {
    instructions: InstructionStoreRef,
    queue: JobQueueRef,
    max_resends: u8,
}

impl RetryController {
    pub fn new(instructions: InstructionStoreRef, queue: JobQueueRef, max_resends: u8) -> Self {
        Self {
            instructions,
            queue,
            max_resends,
        }
    }

    /// Counts against the resend limit; the third attempt fails with
    /// `MaxResendsExceeded`.
    pub async fn resend(&self, id: &str) -> Result<PaymentInstruction> {
        let updated = self
            .instructions
            .increment_resend(id, self.max_resends)
            .await?;
        self.enqueue_snapshot(&updated).await?;
        tracing::info!(
            instruction_id = %updated.id,
            resend_count = updated.resend_count,
            "resend queued"
        );
        Ok(updated)
    }

    /// Corrects payer-provided input; does not consume the resend limit.
    pub async fn update_handle(&self, id: &str, payer_handle: &str) -> Result<PaymentInstruction> {
        let updated = self
            .instructions
            .set_payer_handle(id, payer_handle)
            .await?;
        self.enqueue_snapshot(&updated).await?;
        tracing::info!(instruction_id = %updated.id, "payer handle updated, resend queued");
        Ok(updated)
    }

    async fn enqueue_snapshot(&self, instruction: &PaymentInstruction) -> Result<()> {
        self.queue
            .enqueue(OutboundJob::for_instruction(instruction.clone()))
            .await
            .map_err(|err| RelayError::EnqueueFailure(err.to_string()))
    }
}
