use crate::config::RiskConfig;
use crate::domain::ports::{BlacklistStoreRef, InstructionStoreRef};
use crate::domain::risk::{RiskCandidate, RiskVerdict};
use crate::error::Result;
use chrono::{Duration, Utc};

/// Admission-control gatekeeper. Runs four independent checks and combines
/// them into a single verdict: hard vetoes force denial regardless of score,
/// and an accumulated score at the maximum denies even without a veto.
///
/// All checks always run, so `reasons` is complete even when an early check
/// already vetoed.
pub struct RiskAssessor {
    instructions: InstructionStoreRef,
    blacklist: BlacklistStoreRef,
    config: RiskConfig,
}

impl RiskAssessor {
    pub fn new(
        instructions: InstructionStoreRef,
        blacklist: BlacklistStoreRef,
        config: RiskConfig,
    ) -> Self {
        Self {
            instructions,
            blacklist,
            config,
        }
    }

    /// Never fails: any backend error fails closed into a denial verdict.
    /// A denial-by-default here is a system health signal, not a user error.
    pub async fn assess(&self, candidate: &RiskCandidate) -> RiskVerdict {
        match self.run_checks(candidate).await {
            Ok(verdict) => verdict,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    payer_handle = %candidate.payer_handle,
                    "risk assessment backend failure, failing closed"
                );
                RiskVerdict {
                    allow: false,
                    score: self.config.max_score,
                    reasons: vec!["risk assessment system error".to_string()],
                }
            }
        }
    }

    async fn run_checks(&self, candidate: &RiskCandidate) -> Result<RiskVerdict> {
        let mut score: u32 = 0;
        let mut reasons: Vec<String> = Vec::new();
        let mut veto = false;
        let mut blacklisted = false;

        // Velocity: instructions from the same payer handle in the window.
        let limit = self.config.velocity_limit;
        if limit > 0 {
            let window = self.config.velocity_window_hours;
            let since = Utc::now() - Duration::hours(window);
            let recent = self
                .instructions
                .count_created_since(&candidate.payer_handle, since)
                .await?;
            if recent >= limit {
                veto = true;
                score += 50;
                reasons.push(format!(
                    "velocity limit reached: {recent} instructions for {} in the last {window}h",
                    candidate.payer_handle
                ));
            } else if recent * 5 >= limit * 4 {
                score += 20;
                reasons.push(format!(
                    "velocity approaching limit: {recent}/{limit} instructions in the last {window}h"
                ));
            }
        }

        // Blacklist: any hit vetoes and pins the score at the maximum.
        if let Some(entry) = self.blacklist.find_match(candidate).await? {
            veto = true;
            blacklisted = true;
            reasons.push(format!(
                "blacklisted {} {}: {}",
                entry.kind, entry.value, entry.reason
            ));
        }

        // Amount threshold: flags for manual review, no veto by itself.
        if candidate.amount_cents >= self.config.review_threshold_cents {
            score += 30;
            reasons.push(format!(
                "amount {} cents at or above manual review threshold",
                candidate.amount_cents
            ));
        }

        // Address mismatch.
        if let (Some(billing), Some(shipping)) =
            (&candidate.billing_address, &candidate.shipping_address)
            && billing.differs_from(shipping)
        {
            score += 15;
            reasons.push("billing and shipping addresses differ".to_string());
        }

        if blacklisted {
            score = self.config.max_score;
        }
        let allow = !veto && score < self.config.max_score;

        Ok(RiskVerdict {
            allow,
            score,
            reasons,
        })
    }
}
