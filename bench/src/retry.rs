//! Bounded retries with cooperative cancellation.
//!
//! Remote steps fail transiently (a listener not up yet, a hung fio client).
//! They are retried under a [`RetryPolicy`]; a [`CancellationToken`] set from
//! the Ctrl-C handler stops retry loops, sweeps and pending sleeps.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use log::warn;

use crate::types::{BenchmarkError, BenchmarkResult};

/// Longest uninterrupted sleep slice while waiting on a cancellable delay.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails with [`BenchmarkError::Cancelled`] once cancelled.
    pub fn check(&self) -> BenchmarkResult<()> {
        if self.is_cancelled() {
            Err(BenchmarkError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `duration`, returning early with an error when cancelled.
    pub fn sleep(&self, duration: Duration) -> BenchmarkResult<()> {
        let deadline = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }

    /// Cancels this token on Ctrl-C.
    pub fn install_ctrlc_handler(&self) -> BenchmarkResult<()> {
        let token = self.clone();
        ctrlc::set_handler(move || {
            warn!("Interrupted, stopping after the current step");
            token.cancel();
        })
        .map_err(|e| {
            BenchmarkError::Initialization(format!("Failed to set Ctrl-C handler: {e}"))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before giving up; `None` retries until cancelled.
    pub max_attempts: Option<u32>,
    /// Pause between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            backoff: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Runs `step` until it succeeds, fails permanently, or the policy runs out.
///
/// `step` receives the 1-based attempt number, so it can recover state left
/// behind by a failed attempt before trying again. Only transient errors
/// are retried.
pub fn retry<T, F>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation: &str,
    mut step: F,
) -> BenchmarkResult<T>
where
    F: FnMut(u32) -> BenchmarkResult<T>,
{
    let mut attempt = 1;
    loop {
        cancel.check()?;
        match step(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                if policy.max_attempts.is_some_and(|max| attempt >= max) {
                    return Err(BenchmarkError::RetriesExhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                warn!("{operation}: attempt {attempt} failed: {e}; retrying");
                cancel.sleep(policy.backoff)?;
                attempt += 1;
            }
        }
    }
}
