//! Upstream target resolution.
//!
//! # Responsibilities
//! - Pick the upstream host: host-override header, else configured default
//! - Build the absolute upstream URL from scheme, host and the inbound
//!   path and query, verbatim
//!
//! DNS resolvability is not checked here; that surfaces at dispatch.

use std::str::FromStr;

use axum::http::uri::Authority;
use axum::http::{HeaderMap, HeaderName, Uri};
use url::Url;

use crate::error::ProxyError;

/// Where the upstream host came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSource {
    Default,
    Override,
}

impl HostSource {
    /// Bounded label for metrics. The host itself is caller-controlled.
    pub fn label(self) -> &'static str {
        match self {
            HostSource::Default => "default",
            HostSource::Override => "override",
        }
    }
}

/// Resolved destination for one request.
#[derive(Debug, Clone)]
pub struct Target {
    /// Host (and optional port) the request goes to.
    pub host: String,
    pub source: HostSource,
    /// Absolute upstream URI.
    pub uri: Uri,
}

/// Resolves the upstream host and URL for each request.
#[derive(Debug, Clone)]
pub struct TargetResolver {
    scheme: String,
    host_header: HeaderName,
    default_host: Option<String>,
}

impl TargetResolver {
    pub fn new(scheme: String, host_header: HeaderName, default_host: Option<String>) -> Self {
        Self {
            scheme,
            host_header,
            default_host,
        }
    }

    /// Resolve the target for a request with the given headers and
    /// origin-form request URI.
    pub fn resolve(&self, headers: &HeaderMap, request_uri: &Uri) -> Result<Target, ProxyError> {
        let (host, source) = self.resolve_host(headers)?;
        let path_and_query = request_uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let uri = self.build_uri(&host, path_and_query)?;
        Ok(Target { host, source, uri })
    }

    fn resolve_host(&self, headers: &HeaderMap) -> Result<(String, HostSource), ProxyError> {
        let mut values = headers.get_all(&self.host_header).iter();
        match (values.next(), values.next()) {
            (Some(value), None) => {
                let host = value
                    .to_str()
                    .map_err(|_| ProxyError::InvalidUrl("host header is not ASCII".into()))?
                    .trim();
                if !host.is_empty() {
                    return Ok((host.to_string(), HostSource::Override));
                }
            }
            (Some(_), Some(_)) => return Err(ProxyError::MissingHost),
            (None, _) => {}
        }

        self.default_host
            .as_ref()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .map(|h| (h.to_string(), HostSource::Default))
            .ok_or(ProxyError::MissingHost)
    }

    fn build_uri(&self, host: &str, path_and_query: &str) -> Result<Uri, ProxyError> {
        // A host must be a bare authority; anything carrying a path, query or
        // userinfo would silently change where the request goes.
        let authority = Authority::from_str(host)
            .map_err(|e| ProxyError::InvalidUrl(format!("host {:?}: {}", host, e)))?;
        if authority.as_str().contains('@') {
            return Err(ProxyError::InvalidUrl(format!(
                "host {:?}: userinfo not allowed",
                host
            )));
        }
        if !path_and_query.starts_with('/') {
            return Err(ProxyError::InvalidUrl(format!(
                "path {:?} is not origin-form",
                path_and_query
            )));
        }

        let raw = format!("{}://{}{}", self.scheme, authority, path_and_query);
        let parsed =
            Url::parse(&raw).map_err(|e| ProxyError::InvalidUrl(format!("{}: {}", raw, e)))?;
        if parsed.host_str().is_none() {
            return Err(ProxyError::InvalidUrl(format!("{}: no host", raw)));
        }

        Uri::try_from(raw.as_str()).map_err(|e| ProxyError::InvalidUrl(format!("{}: {}", raw, e)))
    }
}
