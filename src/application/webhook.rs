use crate::config::WebhookConfig;
use crate::domain::instruction::{InstructionStatus, PaymentInstruction};
use crate::domain::ports::{WebhookDelivery, WebhookTransportRef};
use crate::error::{RelayError, Result};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    instruction_code: &'a str,
    status: InstructionStatus,
    order_id: &'a str,
}

/// Computes the signature the receiver verifies: HMAC-SHA256 over the exact
/// serialized body bytes, hex-encoded.
pub fn compute_signature(secret: &[u8], payload: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|err| RelayError::Internal(format!("invalid webhook secret: {err}")))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Pushes state changes to the external order system. Delivery is strictly
/// best-effort: a failure is logged and never rolls back the state change
/// that triggered it.
pub struct WebhookNotifier {
    transport: WebhookTransportRef,
    url: Option<String>,
    secret: Vec<u8>,
}

impl WebhookNotifier {
    pub fn new(transport: WebhookTransportRef, config: &WebhookConfig) -> Self {
        Self {
            transport,
            url: config.url.clone(),
            secret: config.secret.as_bytes().to_vec(),
        }
    }

    pub async fn notify(&self, instruction: &PaymentInstruction) {
        let Some(url) = &self.url else {
            tracing::debug!(
                instruction_code = %instruction.instruction_code,
                "webhook url not configured, skipping delivery"
            );
            return;
        };

        let payload = WebhookPayload {
            instruction_code: &instruction.instruction_code,
            status: instruction.status,
            order_id: &instruction.order_id,
        };
        let delivery = match serde_json::to_string(&payload)
            .map_err(|err| RelayError::Internal(err.to_string()))
            .and_then(|body| {
                let signature = compute_signature(&self.secret, body.as_bytes())?;
                Ok(WebhookDelivery {
                    url: url.clone(),
                    body,
                    signature,
                })
            }) {
            Ok(delivery) => delivery,
            Err(err) => {
                tracing::warn!(
                    instruction_code = %instruction.instruction_code,
                    error = %err,
                    "failed to build webhook delivery"
                );
                return;
            }
        };

        if let Err(err) = self.transport.deliver(delivery).await {
            tracing::warn!(
                instruction_code = %instruction.instruction_code,
                status = %instruction.status,
                error = %err,
                "webhook delivery failed"
            );
        }
    }
}
