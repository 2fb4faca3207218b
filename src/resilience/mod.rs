//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (deadline over dispatch + response headers)
//!     → on expiry: 504, request aborted
//! ```
//!
//! # Design Decisions
//! - Every upstream call has a deadline
//! - No retries: every failure is terminal, retrying is the caller's concern

pub mod timeouts;

pub use timeouts::Deadline;
