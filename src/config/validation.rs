//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, attempts ≥ 1)
//! - Check that URLs parse and fee settings are consistent
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RevealConfig → Result<(), Vec<ValidationError>>
//! - A key handle is optional here; commands that sign require it themselves

use std::fmt;

use crate::config::schema::{FeePolicyKind, RevealConfig};

/// A single semantic problem in the configuration.
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

/// Check a loaded configuration, collecting every problem found.
pub fn validate_config(config: &RevealConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "node.rpc_url", &config.node.rpc_url);
    for url in &config.node.failover_urls {
        check_url(&mut errors, "node.failover_urls", url);
    }
    if config.node.timeout_secs == 0 {
        errors.push(ValidationError::new("node.timeout_secs", "must be greater than 0"));
    }
    if config.node.chain.trim().is_empty() {
        errors.push(ValidationError::new("node.chain", "must not be empty"));
    }

    check_url(&mut errors, "signer.endpoint", &config.signer.endpoint);
    if config.signer.timeout_secs == 0 {
        errors.push(ValidationError::new("signer.timeout_secs", "must be greater than 0"));
    }
    if let Some(handle) = &config.signer.key_handle {
        if handle.trim().is_empty() {
            errors.push(ValidationError::new("signer.key_handle", "must not be empty"));
        } else if handle.starts_with('/') || handle.ends_with('/') {
            errors.push(ValidationError::new(
                "signer.key_handle",
                "must be a resource name without leading or trailing '/'",
            ));
        }
    }
    if config.signer.access_token_env.trim().is_empty() {
        errors.push(ValidationError::new("signer.access_token_env", "must not be empty"));
    }

    let fees = &config.fees;
    if fees.policy == FeePolicyKind::Fixed {
        match fees.fixed_fee {
            None => errors.push(ValidationError::new(
                "fees.fixed_fee",
                "required when policy is \"fixed\"",
            )),
            Some(fee) if fee > fees.max_fee => errors.push(ValidationError::new(
                "fees.fixed_fee",
                format!("{} exceeds max_fee {}", fee, fees.max_fee),
            )),
            Some(_) => {}
        }
    }
    if fees.fee_hint > fees.max_fee {
        errors.push(ValidationError::new(
            "fees.fee_hint",
            format!("{} exceeds max_fee {}", fees.fee_hint, fees.max_fee),
        ));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed max_delay_ms",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e))),
    }
}
