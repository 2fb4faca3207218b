//! Outbound header sanitization and upstream credential injection.
//!
//! # Responsibilities
//! - Copy inbound headers to the upstream request, keeping every value of
//!   multi-valued headers
//! - Drop `Host`, the caller token header and the host-override header
//! - Strip hop-by-hop headers (the upstream connection is a new hop)
//! - Set the upstream credential last, so a client-supplied value never wins

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Hop-by-hop headers that never cross the proxy.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-connection"
            | "te"
            | "trailer"
            | "upgrade"
            | "transfer-encoding"
    )
}

/// Builds the header set sent upstream.
#[derive(Debug, Clone)]
pub struct HeaderSanitizer {
    token_header: HeaderName,
    host_header: HeaderName,
    credential: Option<(HeaderName, HeaderValue)>,
}

impl HeaderSanitizer {
    pub fn new(
        token_header: HeaderName,
        host_header: HeaderName,
        credential: Option<(HeaderName, HeaderValue)>,
    ) -> Self {
        Self {
            token_header,
            host_header,
            credential,
        }
    }

    /// Produce the outbound headers. `forwards_body` is false for methods
    /// whose body is not sent, in which case `content-length` is dropped too.
    pub fn sanitize(&self, inbound: &HeaderMap, forwards_body: bool) -> HeaderMap {
        let connection_listed: Vec<HeaderName> = inbound
            .get_all(header::CONNECTION)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
            .collect();

        let mut outbound = HeaderMap::with_capacity(inbound.len());
        for (name, value) in inbound.iter() {
            if self.is_stripped(name, forwards_body) || connection_listed.contains(name) {
                continue;
            }
            outbound.append(name.clone(), value.clone());
        }

        // insert() replaces every client-supplied value for this name
        if let Some((name, value)) = &self.credential {
            outbound.insert(name.clone(), value.clone());
        }

        outbound
    }

    fn is_stripped(&self, name: &HeaderName, forwards_body: bool) -> bool {
        *name == header::HOST
            || *name == self.token_header
            || *name == self.host_header
            || is_hop_by_hop(name)
            || (!forwards_body && *name == header::CONTENT_LENGTH)
    }
}
