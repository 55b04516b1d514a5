//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate endpoints and value ranges (budgets > 0, limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::{BudgetConfig, ClientConfig, SettleMode};

/// One semantic problem, keyed by its config field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.chain.endpoint) {
        Ok(url) if matches!(url.scheme(), "ws" | "wss") => {}
        Ok(url) => errors.push(ValidationError::new(
            "chain.endpoint",
            format!("scheme must be ws or wss, got {}", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("chain.endpoint", e.to_string())),
    }
    if config.chain.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.connect_timeout_secs", "must be greater than 0"));
    }

    if config.contract.address.trim().is_empty() {
        errors.push(ValidationError::new("contract.address", "must be set"));
    }
    check_budget(&mut errors, "contract.query_budget", &config.contract.query_budget);
    check_budget(&mut errors, "contract.call_budget", &config.contract.call_budget);

    if let Some(provider_url) = &config.signer.provider_url {
        match Url::parse(provider_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::new(
                "signer.provider_url",
                format!("scheme must be http or https, got {}", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new("signer.provider_url", e.to_string())),
        }
    }
    if config.signer.app_name.trim().is_empty() {
        errors.push(ValidationError::new("signer.app_name", "must not be empty"));
    }

    if config.feed.page_limit == 0 {
        errors.push(ValidationError::new("feed.page_limit", "must be greater than 0"));
    }
    if config.feed.top_count == 0 {
        errors.push(ValidationError::new("feed.top_count", "must be greater than 0"));
    }

    let tx = &config.transactions;
    if tx.settle_strategy == SettleMode::Confirm {
        if tx.confirm_max_attempts == 0 {
            errors.push(ValidationError::new(
                "transactions.confirm_max_attempts",
                "must be greater than 0 when settle_strategy = confirm",
            ));
        }
        if tx.confirm_base_delay_ms > tx.confirm_max_delay_ms {
            errors.push(ValidationError::new(
                "transactions.confirm_base_delay_ms",
                "must not exceed confirm_max_delay_ms",
            ));
        }
    }
    if tx.inclusion_timeout_secs == Some(0) {
        errors.push(ValidationError::new(
            "transactions.inclusion_timeout_secs",
            "must be greater than 0 when set",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address {}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_budget(errors: &mut Vec<ValidationError>, field: &'static str, budget: &BudgetConfig) {
    if budget.ref_time == 0 || budget.proof_size == 0 {
        errors.push(ValidationError::new(field, "ref_time and proof_size must be greater than 0"));
    }
}
