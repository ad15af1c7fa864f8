//! Cancellable fixed delays for retry loops.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Slice length used to poll the cancel flag while sleeping.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared flag requesting a graceful stop at the next retry boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with [`Cancelled`] if a stop was requested.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            return Err(Cancelled);
        }
        Ok(())
    }
}

/// Returned when a [`CancelToken`] interrupts the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Waits between retry attempts.
pub trait Sleeper {
    /// Pause for `delay`, returning early with [`Cancelled`] once `cancel` fires.
    fn sleep(&self, delay: Duration, cancel: &CancelToken) -> Result<(), Cancelled>;
}

/// Sleeps on the current thread, polling the cancel flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration, cancel: &CancelToken) -> Result<(), Cancelled> {
        let deadline = Instant::now() + delay;
        loop {
            cancel.check()?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            thread::sleep(remaining.min(POLL_INTERVAL));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleeps_for_the_full_delay() {
        let start = Instant::now();
        ThreadSleeper
            .sleep(Duration::from_millis(120), &CancelToken::new())
            .expect("sleep");
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn cancelled_token_interrupts_sleep() {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(60));
            trigger.cancel();
        });

        let start = Instant::now();
        let result = ThreadSleeper.sleep(Duration::from_secs(30), &cancel);
        handle.join().expect("join");
        assert_eq!(result, Err(Cancelled));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn already_cancelled_returns_immediately() {
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            ThreadSleeper.sleep(Duration::ZERO, &cancel),
            Err(Cancelled)
        );
    }
}
