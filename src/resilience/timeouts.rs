//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap probes, connects and outbound calls with a deadline
//! - Cancel operations cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Probe deadlines are separate from heartbeat and HTTP request deadlines

use std::future::Future;
use std::time::Duration;

/// An operation did not finish within its deadline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} timed out after {}ms", limit.as_millis())]
pub struct TimedOut {
    pub operation: &'static str,
    pub limit: Duration,
}

/// Run `fut` with a deadline. The future is dropped when the deadline passes.
pub async fn bounded<F>(operation: &'static str, limit: Duration, fut: F) -> Result<F::Output, TimedOut>
where
    F: Future,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| TimedOut { operation, limit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_through_result() {
        let out = bounded("quick", Duration::from_secs(1), async { 7 }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let out = bounded("slow", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
        })
        .await;

        let err = out.unwrap_err();
        assert_eq!(err.operation, "slow");
        assert_eq!(err.to_string(), "slow timed out after 50ms");
    }
}
