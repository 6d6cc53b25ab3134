//! Bounded retry for fallible operations.

use std::fmt;
use std::thread;
use std::time::Duration;

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// Extra attempts after the first; 0 means try once.
    pub max_retries: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

#[derive(Debug, PartialEq)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error; holds the last one.
    Exhausted { attempts: u32, last: E },
    /// A non-retryable error stopped the loop on attempt `attempts`.
    Fatal { attempts: u32, error: E },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted { attempts, last } => {
                write!(f, "gave up after {} attempt(s): {}", attempts, last)
            }
            RetryError::Fatal { error, .. } => write!(f, "{}", error),
        }
    }
}

/// Run `op` until it succeeds, returns a non-retryable error, or
/// `policy.max_attempts()` attempts have been made. `op` receives the 1-based
/// attempt number.
pub fn run<T, E, F, R>(policy: &RetryPolicy, is_retryable: R, mut op: F) -> Result<T, RetryError<E>>
where
    E: fmt::Display,
    F: FnMut(u32) -> Result<T, E>,
    R: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if !is_retryable(&e) => {
                return Err(RetryError::Fatal { attempts: attempt, error: e });
            }
            Err(e) if attempt >= max_attempts => {
                return Err(RetryError::Exhausted { attempts: attempt, last: e });
            }
            Err(e) => {
                debug!("Attempt {}/{} failed: {}", attempt, max_attempts, e);
                if !policy.delay.is_zero() {
                    thread::sleep(policy.delay);
                }
                attempt += 1;
            }
        }
    }
}
