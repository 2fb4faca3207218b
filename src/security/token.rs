//! Caller token gate.
//!
//! The caller must present exactly one token header whose value equals the
//! configured secret. Runs before anything touches the upstream.

use axum::http::{HeaderMap, HeaderName};
use subtle::ConstantTimeEq;

use crate::error::ProxyError;

/// Validates the caller-supplied token against the configured secret.
#[derive(Debug, Clone)]
pub struct TokenGate {
    header: HeaderName,
    secret: Option<String>,
}

impl TokenGate {
    pub fn new(header: HeaderName, secret: Option<String>) -> Self {
        Self { header, secret }
    }

    /// Whether a secret is configured at all. Without one every request fails.
    pub fn is_armed(&self) -> bool {
        self.secret.is_some()
    }

    /// Check the request headers. Absent or repeated token headers are
    /// `MissingToken`; anything else that is not the secret is `InvalidToken`.
    pub fn check(&self, headers: &HeaderMap) -> Result<(), ProxyError> {
        let mut values = headers.get_all(&self.header).iter();
        let presented = match (values.next(), values.next()) {
            (Some(value), None) => value,
            _ => return Err(ProxyError::MissingToken),
        };
        if presented.is_empty() {
            return Err(ProxyError::MissingToken);
        }

        match &self.secret {
            Some(secret) if constant_time_eq(presented.as_bytes(), secret.as_bytes()) => Ok(()),
            _ => Err(ProxyError::InvalidToken),
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    bool::from(a.ct_eq(b))
}
