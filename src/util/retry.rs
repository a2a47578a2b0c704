//! Bounded, fixed-delay retries for acquiring external resources.

use log::{error, info, warn};

use std::fmt::Display;
use std::thread;
use std::time::Duration;

pub const DEFAULT_ATTEMPTS: usize = 20;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(20);

/// How often, and how patiently, to retry an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// The total number of attempts, including the first.
    pub attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

/// The operation did not succeed within the permitted attempts.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub target: String,
    pub attempts: usize,
    pub last: E,
}

impl RetryPolicy {
    pub fn new(attempts: usize, delay: Duration) -> Self {
        RetryPolicy { attempts, delay }
    }

    /// Runs `operation` until it succeeds or the attempts are spent,
    /// sleeping for the fixed delay between attempts.
    ///
    /// The `target` names what is being acquired, for the logs.
    pub fn run<T, E, F>(&self, target: &str, mut operation: F) -> Result<T, Exhausted<E>>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation() {
                Ok(value) => {
                    info!("Connected to {target} on attempt {attempt}");
                    return Ok(value);
                }
                Err(err) if attempt >= attempts => {
                    error!("Could not connect to {target} after {attempts} attempts: {err}");
                    return Err(Exhausted {
                        target: target.to_string(),
                        attempts,
                        last: err,
                    });
                }
                Err(err) => {
                    warn!(
                        "Attempt {attempt}/{attempts} to connect to {target} failed: {err}. Retrying in {:?}",
                        self.delay
                    );

                    thread::sleep(self.delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let mut calls = 0;

        let result: Result<usize, Exhausted<String>> = policy.run("flaky", || {
            calls += 1;
            if calls < 3 {
                Err(format!("refused ({calls})"))
            } else {
                Ok(calls)
            }
        });

        assert_eq!(result.ok(), Some(3));
        assert_eq!(calls, 3);
    }

    #[test_log::test]
    fn gives_up_after_the_last_attempt() {
        let policy = RetryPolicy::new(4, Duration::ZERO);
        let mut calls = 0;

        let result: Result<(), Exhausted<&str>> = policy.run("down", || {
            calls += 1;
            Err("refused")
        });

        let exhausted = result.expect_err("must exhaust");
        assert_eq!(exhausted.attempts, 4);
        assert_eq!(exhausted.target, "down");
        assert_eq!(exhausted.last, "refused");
        assert_eq!(calls, 4);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        let mut calls = 0;

        let _: Result<(), Exhausted<&str>> = policy.run("once", || {
            calls += 1;
            Err("refused")
        });

        assert_eq!(calls, 1);
    }
}
