//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, connection bound > 0)
//! - Check that every URL parses
//! - Detect duplicate credential records
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ConnectorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::config::schema::ConnectorConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("connection.{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("invalid URL '{url}' for {context}: {reason}")]
    InvalidUrl {
        context: String,
        url: String,
        reason: String,
    },

    #[error("credentials entry {0} has an empty service_id")]
    EmptyServiceId(usize),

    #[error("duplicate credentials for service '{0}'")]
    DuplicateService(String),

    #[error("gateway endpoint {0} has an empty service_id or function")]
    EmptyGatewayEndpoint(usize),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ConnectorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.connection.request_secs == 0 {
        errors.push(ValidationError::ZeroValue("request_secs"));
    }
    if config.connection.connect_secs == 0 {
        errors.push(ValidationError::ZeroValue("connect_secs"));
    }
    if config.connection.max_concurrent == 0 {
        errors.push(ValidationError::ZeroValue("max_concurrent"));
    }

    let mut seen = HashSet::new();
    for (i, creds) in config.credentials.iter().enumerate() {
        if creds.service_id.is_empty() {
            errors.push(ValidationError::EmptyServiceId(i));
            continue;
        }
        if !seen.insert(creds.service_id.as_str()) {
            errors.push(ValidationError::DuplicateService(creds.service_id.clone()));
        }
        check_url(&mut errors, &creds.url, format!("service '{}'", creds.service_id));
    }

    if config.gateway.enabled {
        check_url(&mut errors, &config.gateway.url, "gateway".to_string());
        for (i, endpoint) in config.gateway.endpoints.iter().enumerate() {
            if endpoint.service_id.is_empty() || endpoint.function.is_empty() {
                errors.push(ValidationError::EmptyGatewayEndpoint(i));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, url: &str, context: String) {
    if let Err(e) = Url::parse(url) {
        errors.push(ValidationError::InvalidUrl {
            context,
            url: url.to_string(),
            reason: e.to_string(),
        });
    }
}
