//! Cooperative stop flag shared by the session controller, the auto-stop
//! timer and the cycle scheduler.
//!
//! The flag is a single boolean behind a `watch` channel: every transition is
//! idempotent, and waiters observe the current value before suspending, so a
//! stop requested before `wait()` is never missed.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Result of waiting on the stop signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The signal was (or became) set
    Signaled,
    /// The timeout elapsed first; the normal tick path
    TimedOut,
}

/// Process-wide cooperative cancellation flag.
///
/// Cloning yields another handle to the same flag.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Set the signal. Returns `true` if this call performed the transition.
    pub fn request(&self) -> bool {
        self.tx.send_if_modified(|set| {
            if *set {
                false
            } else {
                *set = true;
                true
            }
        })
    }

    /// Clear the signal. Returns `true` if this call performed the transition.
    pub fn reset(&self) -> bool {
        self.tx.send_if_modified(|set| {
            if *set {
                *set = false;
                true
            } else {
                false
            }
        })
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Suspend until the signal is set or `timeout` elapses.
    #[allow(clippy::let_and_return)]
    pub async fn wait(&self, timeout: Duration) -> WaitOutcome {
        let mut rx = self.tx.subscribe();
        // Bound to a local so the borrow of `rx` ends before `rx` is dropped.
        let outcome = match tokio::time::timeout(timeout, rx.wait_for(|set| *set)).await {
            // The sender outlives this call, so the inner result is always Ok.
            Ok(_) => WaitOutcome::Signaled,
            Err(_) => WaitOutcome::TimedOut,
        };
        outcome
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}
