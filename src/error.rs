//! Request-path failure taxonomy.
//!
//! `Display` is the detailed server-side message; `client_message` is what
//! the caller sees inside the JSON envelope.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Every way a proxied request can fail. All are terminal.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("token header missing or repeated")]
    MissingToken,

    #[error("token header does not match the configured secret")]
    InvalidToken,

    #[error("no host-override header and no default upstream host")]
    MissingHost,

    #[error("cannot build upstream URL: {0}")]
    InvalidUrl(String),

    #[error("upstream did not respond within {0:?}")]
    GatewayTimeout(std::time::Duration),

    #[error("upstream responded with {0}")]
    Upstream(StatusCode),

    #[error("upstream body exceeded {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("gzip decompression failed: {0}")]
    DecompressionFailed(#[source] std::io::Error),

    #[error("transport failure: {0}")]
    BadGateway(String),
}

impl ProxyError {
    /// HTTP status returned to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingToken | ProxyError::InvalidToken => StatusCode::UNAUTHORIZED,
            ProxyError::MissingHost | ProxyError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ProxyError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Upstream(status) => *status,
            ProxyError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::DecompressionFailed(_) | ProxyError::BadGateway(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Message placed in the error envelope.
    pub fn client_message(&self) -> String {
        match self {
            ProxyError::MissingToken => "Unauthorized: missing token".to_string(),
            ProxyError::InvalidToken => "Unauthorized: invalid token".to_string(),
            ProxyError::MissingHost => {
                "Missing X-Proxy-Host header and no default upstream host configured".to_string()
            }
            ProxyError::InvalidUrl(_) => "Invalid URL".to_string(),
            ProxyError::GatewayTimeout(_) => "Gateway Timeout".to_string(),
            ProxyError::Upstream(_) => "Upstream error".to_string(),
            ProxyError::PayloadTooLarge { .. } => "Response too large".to_string(),
            ProxyError::DecompressionFailed(_) => "Decompression failed".to_string(),
            ProxyError::BadGateway(detail) => format!("Fetch failed: {}", detail),
        }
    }

    /// Caller-side mistakes are logged at warn, everything else at error.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ProxyError::MissingToken
                | ProxyError::InvalidToken
                | ProxyError::MissingHost
                | ProxyError::InvalidUrl(_)
        )
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MissingToken | ProxyError::InvalidToken => "unauthorized",
            ProxyError::MissingHost | ProxyError::InvalidUrl(_) => "bad_request",
            ProxyError::GatewayTimeout(_) => "timeout",
            ProxyError::Upstream(_) => "upstream_status",
            ProxyError::PayloadTooLarge { .. } => "too_large",
            ProxyError::DecompressionFailed(_) => "decompression",
            ProxyError::BadGateway(_) => "bad_gateway",
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            code: self.status().as_u16(),
            message: self.client_message(),
        }
    }
}

/// The sole response shape on every failure path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: u16,
    pub message: String,
}

/// Render an error chain as one line, outermost first.
pub fn describe_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = inner.source();
    }
    out
}
