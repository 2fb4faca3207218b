//! Upstream dispatch.
//!
//! # Responsibilities
//! - Issue the outbound request with the original method and sanitized headers
//! - Stream the inbound body through for methods that carry one
//! - Bound dispatch + response-header receipt with the request deadline
//! - Classify the upstream status: anything outside 2xx becomes an error
//!   and the upstream's own body is discarded
//!
//! # Design Decisions
//! - One attempt only; no retries
//! - Transport failures carry the full error chain into the 502 message

use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, Response};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::error::{describe_chain, ProxyError};
use crate::resilience::Deadline;
use crate::routing::Target;

/// HTTP client used for every upstream request. Speaks HTTPS and, for
/// plaintext upstreams, HTTP.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Build the shared upstream client.
pub fn build_client() -> UpstreamClient {
    let https = HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(TokioExecutor::new()).build(https)
}

/// Whether the inbound body is forwarded for this method.
pub fn forwards_body(method: &Method) -> bool {
    *method != Method::GET && *method != Method::HEAD
}

/// Per-request values derived once before dispatch. Owned by the request.
#[derive(Debug)]
pub struct ProxyContext {
    pub method: Method,
    pub target: Target,
    pub headers: HeaderMap,
    pub deadline: Deadline,
}

/// Sends requests upstream under a deadline.
#[derive(Clone)]
pub struct UpstreamDispatcher {
    client: UpstreamClient,
    timeout: Duration,
}

impl UpstreamDispatcher {
    pub fn new(client: UpstreamClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Start the deadline for a request about to be dispatched.
    pub fn context(&self, method: Method, target: Target, headers: HeaderMap) -> ProxyContext {
        ProxyContext {
            method,
            target,
            headers,
            deadline: Deadline::after(self.timeout),
        }
    }

    /// Send the request and wait for the response head.
    ///
    /// Returns only 2xx responses. The deadline stops applying once the head
    /// has arrived.
    pub async fn dispatch(
        &self,
        ctx: ProxyContext,
        body: Body,
    ) -> Result<Response<Incoming>, ProxyError> {
        let body = if forwards_body(&ctx.method) {
            body
        } else {
            Body::empty()
        };

        let mut request = Request::builder()
            .method(ctx.method)
            .uri(ctx.target.uri)
            .body(body)
            .map_err(|e| ProxyError::InvalidUrl(e.to_string()))?;
        *request.headers_mut() = ctx.headers;

        let response = ctx
            .deadline
            .run(self.client.request(request))
            .await?
            .map_err(|e| ProxyError::BadGateway(describe_chain(&e)))?;

        let status = response.status();
        if !status.is_success() {
            // Body dropped unread: error bodies are never relayed.
            return Err(ProxyError::Upstream(status));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwards_body() {
        assert!(!forwards_body(&Method::GET));
        assert!(!forwards_body(&Method::HEAD));
        assert!(forwards_body(&Method::POST));
        assert!(forwards_body(&Method::PUT));
        assert!(forwards_body(&Method::PATCH));
        assert!(forwards_body(&Method::DELETE));
        assert!(forwards_body(&Method::OPTIONS));
    }
}
