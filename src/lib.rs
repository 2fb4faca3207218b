//! Authenticating single-hop reverse proxy.
//!
//! Validates a shared-secret token, forwards the request to one upstream
//! host over HTTPS with a substituted credential, and relays the response
//! as JSON, gunzipping it when needed and enforcing a size ceiling.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;

pub use config::schema::ProxyConfig;
pub use error::{ErrorEnvelope, ProxyError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
