//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → token.rs (caller token must match the shared secret)
//!     → [target resolution]
//!     → headers.rs (strip proxy-control headers, inject upstream credential)
//!     → Pass to dispatch
//! ```
//!
//! # Design Decisions
//! - Fail closed: no configured secret means no request passes
//! - The caller's token never reaches the upstream; the upstream credential
//!   is always the proxy's own

pub mod headers;
pub mod token;

pub use headers::HeaderSanitizer;
pub use token::TokenGate;
