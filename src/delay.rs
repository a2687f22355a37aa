//! Suspension primitive used between status checks and publish retries

use async_trait::async_trait;

/// Non-blocking sleep supplied by the host
#[async_trait]
pub trait Delay: Send + Sync {
    /// Suspend the current item for `ms` milliseconds
    async fn sleep_ms(&self, ms: u64);
}

/// [`Delay`] backed by `tokio::time::sleep`
#[cfg(feature = "native")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[cfg(feature = "native")]
#[async_trait]
impl Delay for TokioDelay {
    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    }
}
