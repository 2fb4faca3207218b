//! Content-encoding handling for relayed bodies.
//!
//! Gzip bodies are decoded in fixed-size chunks. The first chunk is decoded
//! before the response is committed, so a stream that is corrupt from the
//! start becomes a 502. A failure in a later chunk cannot change a response
//! whose head is already out: late decompression errors are not retracted.
//! The error is logged and the body is cut off with an error, so the caller
//! sees an aborted body rather than a clean end.

use std::io::{self, Cursor, Read};

use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use flate2::read::MultiGzDecoder;

/// Decompressed bytes produced per chunk.
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Whether the upstream declared a gzip content-encoding.
pub fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::CONTENT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.to_ascii_lowercase().contains("gzip"))
}

/// Incremental gzip decoder over a buffered body. Every member of a
/// multi-member stream is decoded.
pub struct GzipChunks {
    decoder: MultiGzDecoder<Cursor<Bytes>>,
    first: Option<Bytes>,
    done: bool,
}

impl GzipChunks {
    /// Decode the first chunk eagerly. Errors here mean nothing has been
    /// produced yet.
    pub fn start(compressed: Bytes) -> io::Result<Self> {
        let mut chunks = Self {
            decoder: MultiGzDecoder::new(Cursor::new(compressed)),
            first: None,
            done: false,
        };
        chunks.first = chunks.read_chunk()?;
        if chunks.first.is_none() {
            chunks.done = true;
        }
        Ok(chunks)
    }

    fn read_chunk(&mut self) -> io::Result<Option<Bytes>> {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let n = loop {
            match self.decoder.read(&mut buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other?,
            }
        };
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(Bytes::from(buf)))
    }
}

impl Iterator for GzipChunks {
    type Item = io::Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(first) = self.first.take() {
            return Some(Ok(first));
        }
        if self.done {
            return None;
        }
        match self.read_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
