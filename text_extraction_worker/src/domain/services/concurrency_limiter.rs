use std::sync::Arc;

use common::helper::error_chain_fmt;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

pub const DEFAULT_MAX_CONCURRENT_EXTRACTIONS: usize = 3;

/// Fixed-capacity pool of permits bounding the number of extractions in flight
///
/// A single limiter is shared by every extraction task of every job: cloning it shares
/// the same permits.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Permit held during one extraction, released when dropped
#[derive(Debug)]
pub struct ExtractionPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// A capacity of 0 is handled as 1, otherwise no extraction could ever run
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);

        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Waits until a permit is available
    ///
    /// Permits are granted in the order they were requested.
    pub async fn acquire(&self) -> Result<ExtractionPermit, ConcurrencyLimiterError> {
        let permit = self.semaphore.clone().acquire_owned().await?;

        Ok(ExtractionPermit { _permit: permit })
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_EXTRACTIONS)
    }
}

#[derive(thiserror::Error)]
pub enum ConcurrencyLimiterError {
    #[error("The permit pool has been closed")]
    Closed(#[from] AcquireError),
}

impl std::fmt::Debug for ConcurrencyLimiterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
