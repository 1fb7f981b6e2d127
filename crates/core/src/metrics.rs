use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

/// A snapshot of the client counters.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct Metrics {
    /// Top-level calls, whatever their outcome.
    pub total_requests: u64,
    /// Calls that completed without an error.
    pub successful_requests: u64,
    /// Calls that ended with an error fragment.
    pub failed_requests: u64,
    /// Calls answered from the cache without reaching the provider.
    pub cache_hits: u64,
    /// Provider attempts that were retried after a failure.
    pub retry_attempts: u64,
    /// Approximate tokens of every fragment produced by the provider.
    pub total_tokens: u64,
}

/// Records the counters of one client.
///
/// All counters sit behind one lock, so a snapshot or a reset always sees
/// them as a consistent unit.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    metrics: Mutex<Metrics>,
}

impl MetricsRecorder {
    /// Counts a new top-level call.
    #[inline]
    pub fn record_request(&self) {
        self.lock().total_requests += 1;
    }

    /// Counts a call that completed without an error.
    #[inline]
    pub fn record_success(&self) {
        self.lock().successful_requests += 1;
    }

    /// Counts a call that ended with an error.
    #[inline]
    pub fn record_failure(&self) {
        self.lock().failed_requests += 1;
    }

    /// Counts a call answered from the cache.
    #[inline]
    pub fn record_cache_hit(&self) {
        self.lock().cache_hits += 1;
    }

    /// Counts one retried provider attempt.
    #[inline]
    pub fn record_retry(&self) {
        self.lock().retry_attempts += 1;
    }

    /// Adds `tokens` to the produced token count.
    #[inline]
    pub fn add_tokens(&self, tokens: usize) {
        self.lock().total_tokens += tokens as u64;
    }

    /// Returns a copy of the current counters.
    #[inline]
    pub fn snapshot(&self) -> Metrics {
        *self.lock()
    }

    /// Sets every counter back to zero.
    #[inline]
    pub fn reset(&self) {
        *self.lock() = Metrics::default();
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, Metrics> {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_reset() {
        let recorder = MetricsRecorder::default();
        recorder.record_request();
        recorder.record_request();
        recorder.record_success();
        recorder.record_failure();
        recorder.record_cache_hit();
        recorder.record_retry();
        recorder.add_tokens(5);

        assert_eq!(
            recorder.snapshot(),
            Metrics {
                total_requests: 2,
                successful_requests: 1,
                failed_requests: 1,
                cache_hits: 1,
                retry_attempts: 1,
                total_tokens: 5,
            }
        );

        recorder.reset();
        assert_eq!(recorder.snapshot(), Metrics::default());
    }
}
