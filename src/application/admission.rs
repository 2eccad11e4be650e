use super::allocator::AliasAllocator;
use super::risk::RiskAssessor;
use crate::domain::instruction::{InstructionStatus, PaymentInstruction};
use crate::domain::job::OutboundJob;
use crate::domain::ports::{InstructionStoreRef, JobQueueRef};
use crate::domain::risk::{Address, RiskCandidate};
use crate::error::{RelayError, Result};
use chrono::Utc;
use serde::Deserialize;

/// Everything the caller submits to open a payment instruction.
#[derive(Debug, Deserialize, Clone)]
pub struct AdmissionRequest {
    pub order_id: String,
    pub amount_cents: i64,
    pub payer_handle: String,
    pub currency: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub ip_address: Option<String>,
    pub billing_address: Option<Address>,
    pub shipping_address: Option<Address>,
}

impl AdmissionRequest {
    fn risk_candidate(&self) -> RiskCandidate {
        RiskCandidate {
            payer_handle: self.payer_handle.clone(),
            amount_cents: self.amount_cents,
            email: self.email.clone(),
            phone: self.phone.clone(),
            ip_address: self.ip_address.clone(),
            billing_address: self.billing_address.clone(),
            shipping_address: self.shipping_address.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdmissionOutcome {
    pub instruction_id: String,
    pub instruction_code: String,
    pub status: InstructionStatus,
}

/// Front door of the core: risk verdict, alias claim, durable `Waiting` row,
/// one enqueued outbound job, in that order. A denial has no side effects at
/// all, and the durable row survives any enqueue failure.
pub struct AdmissionController {
    assessor: RiskAssessor,
    allocator: AliasAllocator,
    instructions: InstructionStoreRef,
    queue: JobQueueRef,
    default_currency: String,
}

impl AdmissionController {
    pub fn new(
        assessor: RiskAssessor,
        allocator: AliasAllocator,
        instructions: InstructionStoreRef,
        queue: JobQueueRef,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            assessor,
            allocator,
            instructions,
            queue,
            default_currency: default_currency.into(),
        }
    }

    pub async fn admit(&self, request: AdmissionRequest) -> Result<AdmissionOutcome> {
        let verdict = self.assessor.assess(&request.risk_candidate()).await;
        if !verdict.allow {
            tracing::info!(
                order_id = %request.order_id,
                score = verdict.score,
                reasons = ?verdict.reasons,
                "admission denied by risk"
            );
            return Err(RelayError::DeniedByRisk {
                score: verdict.score,
                reasons: verdict.reasons,
            });
        }

        let alias = self.allocator.claim(request.amount_cents).await?;

        let currency = request
            .currency
            .unwrap_or_else(|| self.default_currency.clone());
        let instruction = PaymentInstruction::new(
            request.order_id,
            request.amount_cents,
            currency,
            request.payer_handle,
            alias.email,
            alias.alias_id,
            alias.bank_slug,
            Utc::now(),
        );
        // The durable row must exist before any asynchronous processing.
        self.instructions.insert(instruction.clone()).await?;

        let outcome = AdmissionOutcome {
            instruction_id: instruction.id.clone(),
            instruction_code: instruction.instruction_code.clone(),
            status: instruction.status,
        };

        if let Err(err) = self.queue.enqueue(OutboundJob::for_instruction(instruction)).await {
            // The instruction stays WAITING and retriable; surface the
            // enqueue failure as transient, not as a denial.
            tracing::warn!(
                instruction_id = %outcome.instruction_id,
                error = %err,
                "instruction persisted but outbound enqueue failed"
            );
            return Err(RelayError::EnqueueFailure(err.to_string()));
        }

        tracing::info!(
            instruction_id = %outcome.instruction_id,
            instruction_code = %outcome.instruction_code,
            "instruction admitted and queued"
        );
        Ok(outcome)
    }
}
