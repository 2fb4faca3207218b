//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every pipeline stage produces:
//!     → logging.rs (structured log events, request_id on each)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all log events
//! - Every failure is logged with more detail than the caller receives

pub mod logging;
pub mod metrics;
