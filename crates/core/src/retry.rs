//! Exponential backoff around a single fallible operation.

use std::time::Duration;

use backoff::Error as BackoffError;
use backoff::backoff::Backoff;
use rand::Rng;

/// Parameters of the retry loop.
///
/// Every wait grows from the previous one: it is
/// `min(previous * backoff_base, max_wait)`, starting from `initial_wait`.
/// With `jitter` enabled the result is then scaled by a random factor in
/// `[0.5, 1.5)` and the scaled value is what the next wait grows from.
/// Without jitter the `n`-th wait is `min(initial_wait * backoff_base^n,
/// max_wait)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// The wait the progression starts from.
    pub initial_wait: Duration,
    /// Upper bound of a single wait before jitter.
    pub max_wait: Duration,
    /// Growth factor between two consecutive waits.
    pub backoff_base: f64,
    /// Whether waits are randomized.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    #[inline]
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(60),
            backoff_base: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Creates the backoff schedule for one retry loop.
    #[inline]
    pub fn backoff(&self) -> RetryBackoff {
        RetryBackoff {
            policy: *self,
            wait: self.initial_wait,
        }
    }
}

/// The wait schedule of one retry loop, see [`RetryPolicy`].
#[derive(Clone, Debug)]
pub struct RetryBackoff {
    policy: RetryPolicy,
    wait: Duration,
}

impl Backoff for RetryBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        let policy = &self.policy;
        let mut wait =
            scale(self.wait, policy.backoff_base, policy.max_wait)
                .min(policy.max_wait);
        if policy.jitter {
            let factor = rand::rng().random_range(0.5..1.5);
            wait = scale(wait, factor, policy.max_wait);
        }
        self.wait = wait;
        Some(wait)
    }

    fn reset(&mut self) {
        self.wait = self.policy.initial_wait;
    }
}

// Falls back to `cap` when the product is not a valid duration.
#[inline]
fn scale(wait: Duration, factor: f64, cap: Duration) -> Duration {
    Duration::try_from_secs_f64(wait.as_secs_f64() * factor).unwrap_or(cap)
}

/// Runs `op` until it succeeds or `policy.max_attempts` attempts failed.
///
/// `op` receives the 1-based attempt number. Before every wait `on_retry`
/// is called with the error of the failed attempt and the upcoming wait.
/// The error of the final attempt is returned unchanged. The calling thread
/// is blocked while waiting.
pub fn retry_with_backoff<T, E, F, N>(
    policy: &RetryPolicy,
    mut op: F,
    mut on_retry: N,
) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    N: FnMut(&E, Duration),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    let result = backoff::retry_notify(
        policy.backoff(),
        || {
            attempt += 1;
            op(attempt).map_err(|err| {
                if attempt >= max_attempts {
                    BackoffError::permanent(err)
                } else {
                    BackoffError::transient(err)
                }
            })
        },
        |err: E, wait: Duration| on_retry(&err, wait),
    );
    result.map_err(|err| match err {
        BackoffError::Permanent(err) => err,
        BackoffError::Transient { err, .. } => err,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_wait: Duration::from_millis(1),
            max_wait: Duration::from_millis(4),
            backoff_base: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_succeeds_after_failures() {
        let calls = Cell::new(0);
        let mut waits = vec![];
        let result = retry_with_backoff(
            &fast_policy(5),
            |attempt| {
                calls.set(calls.get() + 1);
                assert_eq!(attempt, calls.get());
                if attempt <= 3 { Err("flaky") } else { Ok(attempt) }
            },
            |_, wait| waits.push(wait),
        );
        assert_eq!(result, Ok(4));
        assert_eq!(calls.get(), 4);
        assert_eq!(
            waits,
            [
                Duration::from_millis(2),
                Duration::from_millis(4),
                Duration::from_millis(4)
            ]
        );
    }

    #[test]
    fn test_exhausts_attempts() {
        let calls = Cell::new(0);
        let mut retries = 0;
        let result: Result<(), String> = retry_with_backoff(
            &fast_policy(3),
            |attempt| {
                calls.set(calls.get() + 1);
                Err(format!("attempt {attempt} failed"))
            },
            |_, _| retries += 1,
        );
        assert_eq!(result.unwrap_err(), "attempt 3 failed");
        assert_eq!(calls.get(), 3);
        assert_eq!(retries, 2);
    }

    #[test]
    fn test_zero_attempts_runs_once() {
        let calls = Cell::new(0);
        let result: Result<(), ()> = retry_with_backoff(
            &fast_policy(0),
            |_| {
                calls.set(calls.get() + 1);
                Err(())
            },
            |_, _| {},
        );
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_backoff_bound_without_jitter() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(60),
            backoff_base: 2.0,
            jitter: false,
        };
        let mut backoff = policy.backoff();
        let waits: Vec<_> = (0..8)
            .map(|_| backoff.next_backoff().unwrap().as_secs())
            .collect();
        assert_eq!(waits, [2, 4, 8, 16, 32, 60, 60, 60]);
    }

    #[test]
    fn test_jitter_carries_forward() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_wait: Duration::from_millis(1),
            max_wait: Duration::from_secs(3600),
            backoff_base: 2.0,
            jitter: true,
        };
        for _ in 0..200 {
            let mut backoff = policy.backoff();
            let mut previous = backoff.next_backoff().unwrap();
            for _ in 0..5 {
                let wait = backoff.next_backoff().unwrap();
                let ratio = wait.as_secs_f64() / previous.as_secs_f64();
                assert!((0.999..3.001).contains(&ratio), "{ratio}");
                previous = wait;
            }
        }
    }

    #[test]
    fn test_overflowing_base_is_capped() {
        let policy = RetryPolicy {
            backoff_base: f64::INFINITY,
            jitter: false,
            ..RetryPolicy::default()
        };
        let mut backoff = policy.backoff();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(60)));

        let policy = RetryPolicy {
            backoff_base: f64::NAN,
            ..policy
        };
        let mut backoff = policy.backoff();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy {
            initial_wait: Duration::from_millis(100),
            max_wait: Duration::from_millis(100),
            ..RetryPolicy::default()
        };
        let mut backoff = policy.backoff();
        for _ in 0..100 {
            let wait = backoff.next_backoff().unwrap();
            assert!(wait >= Duration::from_millis(50), "{wait:?}");
            assert!(wait <= Duration::from_millis(150), "{wait:?}");
        }
    }
}
