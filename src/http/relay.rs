//! Response relay.
//!
//! # Responsibilities
//! - Read the upstream body with a running byte count and a hard ceiling
//! - Decide how the body is written: verbatim, or gunzipped in chunks
//! - Optionally bound the read phase with its own deadline
//!
//! # Design Decisions
//! - The body is buffered up to the ceiling before the response is
//!   committed, so an oversize body becomes a clean 413
//! - Without `relay_timeout_ms` the read phase has no wall-clock cap; the
//!   dispatch deadline ends when the response head arrives

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{Response, StatusCode};
use futures_util::StreamExt;
use hyper::body::Incoming;

use crate::error::{describe_chain, ProxyError};
use crate::http::encoding::{is_gzip, GzipChunks};
use crate::resilience::Deadline;

/// How the relayed body reaches the caller.
pub enum RelayBody {
    /// Written as received.
    Verbatim(Bytes),
    /// Decoded chunk by chunk while writing.
    Gunzip(GzipChunks),
}

/// Outcome of a successful relay, ready to be committed.
pub struct Relayed {
    pub status: StatusCode,
    /// Bytes received from upstream (before any decoding).
    pub upstream_bytes: usize,
    pub body: RelayBody,
}

/// Reads upstream responses under a size ceiling.
#[derive(Debug, Clone)]
pub struct ResponseRelay {
    max_body_size: usize,
    relay_timeout: Option<Duration>,
}

impl ResponseRelay {
    pub fn new(max_body_size: usize, relay_timeout: Option<Duration>) -> Self {
        Self {
            max_body_size,
            relay_timeout,
        }
    }

    pub async fn relay(&self, response: Response<Incoming>) -> Result<Relayed, ProxyError> {
        let (parts, incoming) = response.into_parts();
        let body = Body::new(incoming);

        let buffered = match self.relay_timeout {
            Some(budget) => {
                Deadline::after(budget)
                    .run(read_capped(body, self.max_body_size))
                    .await??
            }
            None => read_capped(body, self.max_body_size).await?,
        };
        let upstream_bytes = buffered.len();

        let body = if is_gzip(&parts.headers) && !buffered.is_empty() {
            let chunks = GzipChunks::start(buffered).map_err(ProxyError::DecompressionFailed)?;
            RelayBody::Gunzip(chunks)
        } else {
            RelayBody::Verbatim(buffered)
        };

        Ok(Relayed {
            status: parts.status,
            upstream_bytes,
            body,
        })
    }
}

/// Read a body to the end, failing as soon as the running total exceeds
/// `limit`. Nothing past the limit is read.
pub async fn read_capped(body: Body, limit: usize) -> Result<Bytes, ProxyError> {
    let mut stream = body.into_data_stream();
    let mut buffer: Vec<u8> = Vec::new();
    let mut total: usize = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ProxyError::BadGateway(describe_chain(&e)))?;
        total = total.saturating_add(chunk.len());
        if total > limit {
            return Err(ProxyError::PayloadTooLarge { limit });
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buffer))
}
