//! Bounded retry with a fixed delay for blockchain data source calls.
//!
//! Only transient [`SourceError`]s are retried. The counter tracks
//! consecutive failures across calls and is reset by any success; when it
//! reaches the limit the failure that tripped it is returned unchanged.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use waypath_core::error::SourceError;

pub const DEFAULT_RETRY_LIMIT: u32 = 5;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive transient failures tolerated before giving up.
    pub limit: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            limit: DEFAULT_RETRY_LIMIT,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Blocking pause between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, delay: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

pub struct Retrier {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    failures: u32,
}

impl Retrier {
    pub fn new(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            policy,
            sleeper,
            failures: 0,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Consecutive transient failures seen so far.
    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// Run `op` until it succeeds, fails permanently, or exhausts the limit.
    pub fn call<T>(
        &mut self,
        what: &str,
        mut op: impl FnMut() -> Result<T, SourceError>,
    ) -> Result<T, SourceError> {
        loop {
            match op() {
                Ok(value) => {
                    self.failures = 0;
                    return Ok(value);
                }
                Err(e) if e.is_transient() => {
                    self.failures += 1;
                    if self.failures >= self.policy.limit {
                        warn!(what, failures = self.failures, error = %e, "giving up");
                        return Err(e);
                    }
                    warn!(
                        what,
                        attempt = self.failures,
                        delay_ms = self.policy.delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    self.sleeper.sleep(self.policy.delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, delay: Duration) {
            self.sleeps.lock().unwrap().push(delay);
        }
    }

    fn retrier(limit: u32) -> (Retrier, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        let policy = RetryPolicy {
            limit,
            delay: Duration::from_millis(250),
        };
        (Retrier::new(policy, sleeper.clone()), sleeper)
    }

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.limit, 5);
        assert_eq!(policy.delay, Duration::from_secs(1));
    }

    #[test]
    fn retries_transient_then_succeeds() {
        let (mut r, sleeper) = retrier(5);
        let mut calls = 0;
        let value = r
            .call("test", || {
                calls += 1;
                if calls < 3 {
                    Err(SourceError::Timeout)
                } else {
                    Ok(42)
                }
            })
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(calls, 3);
        assert_eq!(r.consecutive_failures(), 0);
        assert_eq!(
            *sleeper.sleeps.lock().unwrap(),
            vec![Duration::from_millis(250); 2]
        );
    }

    #[test]
    fn limit_th_failure_propagates_original_error() {
        let (mut r, sleeper) = retrier(3);
        let mut calls = 0;
        let err = r
            .call::<()>("test", || {
                calls += 1;
                Err(SourceError::RateLimited(format!("attempt {calls}")))
            })
            .unwrap_err();
        assert_eq!(err, SourceError::RateLimited("attempt 3".into()));
        assert_eq!(calls, 3);
        assert_eq!(sleeper.sleeps.lock().unwrap().len(), 2);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let (mut r, sleeper) = retrier(5);
        let mut calls = 0;
        let err = r
            .call::<()>("test", || {
                calls += 1;
                Err(SourceError::Unauthorized("bad key".into()))
            })
            .unwrap_err();
        assert_eq!(err, SourceError::Unauthorized("bad key".into()));
        assert_eq!(calls, 1);
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[test]
    fn failures_accumulate_across_calls_until_success() {
        let (mut r, _) = retrier(3);
        let mut fail_next = 2;
        let mut flaky = || {
            if fail_next > 0 {
                fail_next -= 1;
                Err(SourceError::Connection("reset".into()))
            } else {
                Ok(())
            }
        };
        r.call("first", &mut flaky).unwrap();
        assert_eq!(r.consecutive_failures(), 0);

        // Two failures, then the third trips the limit.
        let mut count = 0;
        let err = r
            .call::<()>("second", || {
                count += 1;
                Err(SourceError::Timeout)
            })
            .unwrap_err();
        assert_eq!(err, SourceError::Timeout);
        assert_eq!(count, 3);
        assert_eq!(r.consecutive_failures(), 3);
    }
}
