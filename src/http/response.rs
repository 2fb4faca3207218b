//! Response writing and error translation.
//!
//! A response moves through `NotStarted → HeadersSent → Completed` exactly
//! once. Each state is a type that is consumed by the transition out of it:
//!
//! ```text
//! PendingResponse ──fail()──▶ Response (error envelope)
//!        │
//!     begin(status)
//!        ▼
//! StartedResponse ──finish()/finish_stream()──▶ Response
//! ```
//!
//! Errors discovered after `begin` cannot reach the caller as a status;
//! they are logged only.

use std::fmt::Display;
use std::io;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Response, StatusCode};
use futures_util::{Stream, TryStreamExt};
use serde::Serialize;

use crate::error::ProxyError;

/// Emitted when an envelope cannot be serialized.
pub const FALLBACK_ENVELOPE: &str = r#"{"code":500,"message":"Internal Error"}"#;

/// Serialize a JSON error body. Serialization failure never fails the
/// error path: it degrades to a fixed 500 envelope.
pub fn render_json<T: Serialize>(status: StatusCode, value: &T) -> (StatusCode, Bytes) {
    match serde_json::to_vec(value) {
        Ok(bytes) => (status, Bytes::from(bytes)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize error envelope");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(FALLBACK_ENVELOPE.as_bytes()),
            )
        }
    }
}

fn json_response(status: StatusCode, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// A response nothing has been written to yet.
#[must_use]
#[derive(Debug)]
pub struct PendingResponse {
    request_id: String,
}

impl PendingResponse {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    /// Terminate with the error envelope for `err`.
    pub fn fail(self, err: &ProxyError) -> Response<Body> {
        let status = err.status();
        if err.is_client_error() {
            tracing::warn!(
                request_id = %self.request_id,
                status = status.as_u16(),
                error = %err,
                "Request rejected"
            );
        } else {
            tracing::error!(
                request_id = %self.request_id,
                status = status.as_u16(),
                error = %err,
                "Proxy error"
            );
        }

        let (status, body) = render_json(status, &err.envelope());
        json_response(status, Body::from(body))
    }

    /// Commit the status line and content type.
    pub fn begin(self, status: StatusCode) -> StartedResponse {
        StartedResponse {
            request_id: self.request_id,
            status,
        }
    }
}

/// A response whose head is committed. Only the body remains.
#[must_use]
#[derive(Debug)]
pub struct StartedResponse {
    request_id: String,
    status: StatusCode,
}

impl StartedResponse {
    /// Complete with a body already in hand.
    pub fn finish(self, body: impl Into<Body>) -> Response<Body> {
        json_response(self.status, body.into())
    }

    /// Complete with a body produced while writing. A stream error after
    /// this point is logged only and aborts the body.
    pub fn finish_stream<S>(self, stream: S) -> Response<Body>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        let request_id = self.request_id.clone();
        let status = self.status;
        let stream = stream.inspect_err(move |e| late_error(&request_id, e));
        json_response(status, Body::from_stream(stream))
    }
}

/// Record an error that can no longer change the response.
fn late_error(request_id: &str, err: &dyn Display) {
    tracing::error!(
        request_id = %request_id,
        error = %err,
        "Error after response head was sent; not retracted"
    );
}
