//! Bounded exponential-backoff retry around a single filesystem effect

use crate::types::MirrorError;
use std::io::{self, ErrorKind};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// What a retried operation produced, and how many attempts it took
#[derive(Debug)]
pub struct Retried<T> {
    pub result: Result<T, MirrorError>,
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before attempt `i + 1`, after attempt `i` failed: `base × 2^(i−1)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    ///
    /// Never panics past this boundary. Sleeps on the calling thread between
    /// attempts, so callers must not hold locks across it.
    pub fn run<T>(&self, mut op: impl FnMut() -> io::Result<T>) -> Retried<T> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op() {
                Ok(value) => {
                    return Retried {
                        result: Ok(value),
                        attempts: attempt,
                    }
                }
                Err(e) if !is_transient(&e) => {
                    debug!(attempt, error = %e, "permanent error, not retrying");
                    return Retried {
                        result: Err(MirrorError::Io(e)),
                        attempts: attempt,
                    };
                }
                Err(e) if attempt >= max_attempts => {
                    warn!(attempts = attempt, error = %e, "retries exhausted");
                    return Retried {
                        result: Err(MirrorError::RetryExhausted {
                            attempts: attempt,
                            last_error: e.to_string(),
                        }),
                        attempts: attempt,
                    };
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient error, retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

/// Errors that retrying cannot fix fail on the first attempt
///
/// `PermissionDenied` stays transient: sharing violations and scanner locks
/// on Windows surface as that kind and clear up on their own.
pub fn is_transient(error: &io::Error) -> bool {
    !matches!(
        error.kind(),
        ErrorKind::NotFound
            | ErrorKind::InvalidInput
            | ErrorKind::InvalidData
            | ErrorKind::Unsupported
            | ErrorKind::AlreadyExists
            | ErrorKind::IsADirectory
            | ErrorKind::NotADirectory
    )
}
