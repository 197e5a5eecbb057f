//! Session budget guard.
//!
//! A single-shot timer that runs a stop action once the budget elapses.
//! Cancelling it before expiry guarantees the action never runs.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Handle to one armed auto-stop timer
#[derive(Debug)]
pub struct AutoStopTimer {
    handle: JoinHandle<()>,
    deadline: Instant,
}

impl AutoStopTimer {
    /// Arm a timer that awaits `on_expiry()` after `budget`.
    ///
    /// `on_expiry` is `FnOnce`, so the action cannot run twice.
    pub fn spawn<F, Fut>(budget: Duration, on_expiry: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + budget;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            info!(budget_secs = budget.as_secs_f64(), "Session budget expired");
            on_expiry().await;
        });

        Self { handle, deadline }
    }

    /// Disarm the timer. Returns `true` if it had not fired yet.
    pub fn cancel(self) -> bool {
        if self.handle.is_finished() {
            return false;
        }
        self.handle.abort();
        debug!("Auto-stop timer cancelled");
        true
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Time left before expiry (zero once due)
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_timer(budget: Duration) -> (AutoStopTimer, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let timer = AutoStopTimer::spawn(budget, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (timer, fired)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_budget() {
        let (timer, fired) = counting_timer(Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(timer.remaining(), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(timer.is_finished());
        assert!(!timer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_expiry_prevents_action() {
        let (timer, fired) = counting_timer(Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(timer.cancel());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
