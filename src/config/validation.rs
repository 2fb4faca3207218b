//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate header names the pipeline will use
//! - Validate value ranges (timeouts > 0, size limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::{HeaderName, HeaderValue};

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid header name {value:?}")]
    InvalidHeaderName { field: &'static str, value: String },

    #[error("{0}: not a valid header value")]
    InvalidHeaderValue(&'static str),

    #[error("upstream.scheme: expected \"http\" or \"https\", got {0:?}")]
    UnsupportedScheme(String),

    #[error("{0}: must be greater than zero")]
    Zero(&'static str),

    #[error("upstream.default_host: must not be blank")]
    BlankDefaultHost,
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let header_fields = [
        ("auth.token_header", &config.auth.token_header),
        ("upstream.host_header", &config.upstream.host_header),
        ("upstream.credential_header", &config.upstream.credential_header),
    ];
    for (field, value) in header_fields {
        if HeaderName::from_bytes(value.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName {
                field,
                value: value.clone(),
            });
        }
    }

    if let Some(credential) = &config.upstream.credential {
        if HeaderValue::from_str(credential).is_err() {
            errors.push(ValidationError::InvalidHeaderValue("upstream.credential"));
        }
    }

    let scheme = config.upstream.scheme.as_str();
    if scheme != "http" && scheme != "https" {
        errors.push(ValidationError::UnsupportedScheme(scheme.to_string()));
    }

    if config.upstream.timeout_ms == 0 {
        errors.push(ValidationError::Zero("upstream.timeout_ms"));
    }
    if config.upstream.relay_timeout_ms == Some(0) {
        errors.push(ValidationError::Zero("upstream.relay_timeout_ms"));
    }
    if config.upstream.max_body_size == 0 {
        errors.push(ValidationError::Zero("upstream.max_body_size"));
    }

    if let Some(host) = &config.upstream.default_host {
        if host.trim().is_empty() {
            errors.push(ValidationError::BlankDefaultHost);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
