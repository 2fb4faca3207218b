//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Caller authentication.
    pub auth: AuthConfig,

    /// Upstream selection, credential injection and limits.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port. Zero asks the OS for an ephemeral port.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Caller authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret callers must present. When unset every request is rejected.
    pub token: Option<String>,

    /// Header carrying the caller's token.
    pub token_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: None,
            token_header: "x-proxy-token".to_string(),
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Host used when the request carries no host-override header.
    pub default_host: Option<String>,

    /// Header that overrides the upstream host per request.
    pub host_header: String,

    /// URL scheme for upstream requests.
    pub scheme: String,

    /// Secret injected into every upstream request, if set.
    pub credential: Option<String>,

    /// Header the upstream credential is written to.
    pub credential_header: String,

    /// Deadline for dispatch and receipt of response headers, in milliseconds.
    pub timeout_ms: u64,

    /// Optional deadline for reading the response body, in milliseconds.
    pub relay_timeout_ms: Option<u64>,

    /// Maximum upstream response body size in bytes.
    pub max_body_size: usize,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn relay_timeout(&self) -> Option<Duration> {
        self.relay_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            default_host: None,
            host_header: "x-proxy-host".to_string(),
            scheme: "https".to_string(),
            credential: None,
            credential_header: "X-QW-Api-Key".to_string(),
            timeout_ms: 10_000,
            relay_timeout_ms: None,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl ProxyConfig {
    /// Copy of this config with secrets replaced, for printing.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.auth.token.is_some() {
            copy.auth.token = Some("<redacted>".to_string());
        }
        if copy.upstream.credential.is_some() {
            copy.upstream.credential = Some("<redacted>".to_string());
        }
        copy
    }
}
