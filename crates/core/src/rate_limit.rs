//! Minimum spacing between provider calls.

use std::sync::{Mutex, MutexGuard};
use std::thread::sleep;
use std::time::{Duration, Instant};

/// Enforces a minimum spacing between outbound calls of one client.
///
/// The lock is held while waiting, so concurrent callers line up behind
/// each other and every pair of consecutive dispatches is at least
/// `min_interval` apart. Separate limiters know nothing of each other.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter that has not seen any request yet.
    #[inline]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Blocks the calling thread until a request may be sent, then records
    /// it. Returns how long the caller waited.
    pub fn acquire(&self) -> Duration {
        let mut last_request = self.lock();
        let mut waited = Duration::ZERO;
        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                waited = self.min_interval - elapsed;
                debug!("rate limited, waiting for {waited:?}");
                sleep(waited);
            }
        }
        *last_request = Some(Instant::now());
        waited
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, Option<Instant>> {
        self.last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
