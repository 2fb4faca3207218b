//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request headers + URI
//!     → target.rs (host-override header, else default host)
//!     → Target { host, absolute upstream URI }
//! ```
//!
//! # Design Decisions
//! - Exactly one upstream per request; no load balancing
//! - Path and query are forwarded verbatim

pub mod target;

pub use target::{HostSource, Target, TargetResolver};
