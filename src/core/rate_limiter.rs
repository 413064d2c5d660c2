use crate::utils::error::{CrptError, Result};
use crate::utils::validation::{validate_non_zero_duration, validate_range};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Fixed-window limiter: at most `request_limit` permits are handed out per
/// `period`. Consumed permits are never returned; a background task tops the
/// pool back up to `request_limit` at the start of every window.
///
/// Clones share the same window. The refill task stops once the last clone
/// is dropped.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

struct Inner {
    semaphore: Arc<Semaphore>,
    request_limit: usize,
    period: Duration,
    refill: JoinHandle<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.refill.abort();
    }
}

impl RateLimiter {
    /// Must be called from within a Tokio runtime.
    pub fn new(request_limit: usize, period: Duration) -> Result<Self> {
        validate_range("request_limit", request_limit, 1, Semaphore::MAX_PERMITS)?;
        validate_non_zero_duration("period", period)?;

        let handle = tokio::runtime::Handle::try_current().map_err(|e| CrptError::ConfigError {
            message: format!("RateLimiter must be created inside a Tokio runtime: {}", e),
        })?;

        let semaphore = Arc::new(Semaphore::new(request_limit));
        let refill = handle.spawn(refill_loop(semaphore.clone(), request_limit, period));

        tracing::debug!(
            "Rate limiter created: {} requests per {:?}",
            request_limit,
            period
        );

        Ok(Self {
            inner: Arc::new(Inner {
                semaphore,
                request_limit,
                period,
                refill,
            }),
        })
    }

    /// Waits until the current window has a free slot and consumes it.
    pub async fn acquire(&self) -> Result<()> {
        let permit = self
            .inner
            .semaphore
            .acquire()
            .await
            .map_err(|_| CrptError::RateLimiterClosed)?;
        permit.forget();
        Ok(())
    }

    pub fn try_acquire(&self) -> bool {
        match self.inner.semaphore.try_acquire() {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(_) => false,
        }
    }

    pub fn available_permits(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    pub fn request_limit(&self) -> usize {
        self.inner.request_limit
    }

    pub fn period(&self) -> Duration {
        self.inner.period
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("request_limit", &self.inner.request_limit)
            .field("period", &self.inner.period)
            .field("available_permits", &self.available_permits())
            .finish()
    }
}

async fn refill_loop(semaphore: Arc<Semaphore>, request_limit: usize, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let available = semaphore.available_permits();
        if available < request_limit {
            semaphore.add_permits(request_limit - available);
        }
        tracing::trace!(
            "Rate limiter window reset, {} of {} permits were unused",
            available,
            request_limit
        );
    }
}
