//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound the dispatch + response-header phase with one deadline
//! - Optionally bound the body relay phase
//! - Cancel the pending operation cleanly on expiry
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the timer is dropped with the future,
//!   so no exit path can leave one armed
//! - Timeout errors are distinct from other errors
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::ProxyError;

/// A fixed point in time by which an operation must complete.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    /// Run `fut` until it completes or the deadline passes. Expiry drops
    /// (and so aborts) the pending future.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, ProxyError>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout_at(self.at, fut)
            .await
            .map_err(|_| ProxyError::GatewayTimeout(self.budget))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_completes_within_deadline() {
        let deadline = Deadline::after(Duration::from_millis(100));
        let value = deadline.run(async { 7 }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_maps_to_gateway_timeout() {
        let deadline = Deadline::after(Duration::from_millis(50));
        let err = deadline
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::GatewayTimeout(d) if d == Duration::from_millis(50)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_is_fixed_at_creation() {
        let deadline = Deadline::after(Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(80)).await;
        let err = deadline
            .run(tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::GatewayTimeout(_)));
    }
}
