use crate::domain::instruction::MAX_RESENDS;
use crate::domain::risk::MAX_RISK_SCORE;
use serde::{Deserialize, Serialize};
use std::env;

/// Tunables for the risk assessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Instructions per payer handle in the trailing window before a hard veto.
    pub velocity_limit: u64,
    pub velocity_window_hours: i64,
    /// Amounts at or above this (in cents) add a manual-review score bump.
    pub review_threshold_cents: i64,
    pub max_score: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            velocity_limit: 5,
            velocity_window_hours: 24,
            review_threshold_cents: 500_000,
            max_score: MAX_RISK_SCORE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// No URL disables delivery (signing still runs in tests).
    pub url: Option<String>,
    pub secret: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            secret: "insecure-dev-secret".to_string(),
        }
    }
}

/// Application configuration, loaded from environment variables with
/// sensible defaults. CLI flags on the binary override individual fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub default_currency: String,
    pub max_resends: u8,
    pub risk: RiskConfig,
    pub webhook: WebhookConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            default_currency: "CAD".to_string(),
            max_resends: MAX_RESENDS,
            risk: RiskConfig::default(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_env("PORT", defaults.port),
            default_currency: env::var("DEFAULT_CURRENCY").unwrap_or(defaults.default_currency),
            max_resends: parse_env("MAX_RESENDS", defaults.max_resends),
            risk: RiskConfig {
                velocity_limit: parse_env("VELOCITY_LIMIT", defaults.risk.velocity_limit),
                velocity_window_hours: parse_env(
                    "VELOCITY_WINDOW_HOURS",
                    defaults.risk.velocity_window_hours,
                ),
                review_threshold_cents: parse_env(
                    "REVIEW_THRESHOLD_CENTS",
                    defaults.risk.review_threshold_cents,
                ),
                max_score: defaults.risk.max_score,
            },
            webhook: WebhookConfig {
                url: env::var("WEBHOOK_URL").ok(),
                secret: env::var("WEBHOOK_SECRET").unwrap_or(defaults.webhook.secret),
            },
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
