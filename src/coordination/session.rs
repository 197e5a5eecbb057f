//! Session Controller
//!
//! UI-facing lifecycle manager for one trading session:
//! - `start()` spawns the cycle scheduler and arms the auto-stop timer
//! - `stop()` raises the stop signal, waits a bounded grace period for the
//!   scheduler to exit on its own, then aborts it
//! - `reset()` delegates to the reset collaborator without touching run state
//!
//! All handle mutation happens under one async mutex, so concurrent
//! start/stop calls from the UI and the auto-stop timer serialize cleanly.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::auto_stop::AutoStopTimer;
use super::events::{SessionEvent, StopTrigger};
use super::scheduler::{CycleScheduler, CycleSchedulerConfig, CycleStats, CycleStatsSnapshot};
use super::stop_signal::StopSignal;
use crate::agents::{MarketGate, ResetCollaborator, TradingAgent};
use crate::error::{FloorError, Result};

/// Session-level timing
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Auto-stop fires this long after `start()`
    pub budget: Duration,
    /// How long `stop()` waits for the scheduler before aborting it
    pub graceful_stop_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            budget: Duration::from_secs(600),
            graceful_stop_timeout: Duration::from_secs(2),
        }
    }
}

/// Controller state as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Running => write!(f, "running"),
        }
    }
}

/// Result of `start()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { session_id: Uuid },
    /// A live scheduler already exists; nothing was spawned
    AlreadyRunning { session_id: Uuid },
}

impl StartOutcome {
    pub fn session_id(&self) -> Uuid {
        match self {
            StartOutcome::Started { session_id } | StartOutcome::AlreadyRunning { session_id } => {
                *session_id
            }
        }
    }
}

/// How the scheduler task ended after a stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    /// Nothing was running
    NotRunning,
    /// Scheduler exited on its own within the grace period
    Graceful,
    /// Grace period elapsed, or the task was cancelled, and the scheduler was aborted
    Forced,
    /// Scheduler task panicked
    Panicked,
}

impl std::fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopOutcome::NotRunning => write!(f, "not_running"),
            StopOutcome::Graceful => write!(f, "graceful"),
            StopOutcome::Forced => write!(f, "forced"),
            StopOutcome::Panicked => write!(f, "panicked"),
        }
    }
}

/// Result of waiting for the scheduler task within a grace period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SchedulerExit {
    Completed,
    TimedOut,
    /// Aborted outside the grace path; reported to callers as forced
    Cancelled,
    Panicked,
}

/// Status snapshot for display
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub session_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub stop_requested: bool,
    /// Seconds until auto-stop, while running
    pub auto_stop_in_secs: Option<u64>,
    /// Counters of the current session, or of the last one when idle
    pub stats: CycleStatsSnapshot,
}

struct ActiveSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    scheduler: JoinHandle<()>,
    auto_stop: Option<AutoStopTimer>,
    stats: Arc<CycleStats>,
}

impl ActiveSession {
    fn is_live(&self) -> bool {
        !self.scheduler.is_finished()
    }
}

#[derive(Default)]
struct Slots {
    active: Option<ActiveSession>,
    last_stats: CycleStatsSnapshot,
}

struct Inner {
    scheduler_config: CycleSchedulerConfig,
    session_config: SessionConfig,
    agents: Vec<Arc<dyn TradingAgent>>,
    gate: Arc<dyn MarketGate>,
    resetter: Arc<dyn ResetCollaborator>,
    stop: StopSignal,
    slots: Mutex<Slots>,
    events: broadcast::Sender<SessionEvent>,
}

/// Owns at most one scheduler task and one auto-stop timer.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    pub fn new(
        scheduler_config: CycleSchedulerConfig,
        session_config: SessionConfig,
        agents: Vec<Arc<dyn TradingAgent>>,
        gate: Arc<dyn MarketGate>,
        resetter: Arc<dyn ResetCollaborator>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                scheduler_config,
                session_config,
                agents,
                gate,
                resetter,
                stop: StopSignal::new(),
                slots: Mutex::new(Slots::default()),
                events,
            }),
        }
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// The stop signal this controller drives
    pub fn stop_signal(&self) -> StopSignal {
        self.inner.stop.clone()
    }

    /// Start a session unless one is already live.
    pub async fn start(&self) -> StartOutcome {
        let mut slots = self.inner.slots.lock().await;

        if let Some(active) = &slots.active {
            if active.is_live() {
                debug!(session_id = %active.id, "Start ignored, session already running");
                return StartOutcome::AlreadyRunning {
                    session_id: active.id,
                };
            }
        }

        // A scheduler that exited after request_stop() still holds its slot
        if let Some(stale) = slots.active.take() {
            slots.last_stats = stale.stats.snapshot();
            if let Some(timer) = stale.auto_stop {
                timer.cancel();
            }
        }

        self.inner.stop.reset();

        let session_id = Uuid::new_v4();
        let scheduler = CycleScheduler::new(
            self.inner.scheduler_config.clone(),
            self.inner.agents.clone(),
            Arc::clone(&self.inner.gate),
            self.inner.stop.clone(),
        )
        .with_events(self.inner.events.clone());
        let stats = scheduler.stats();
        let handle = tokio::spawn(
            scheduler
                .run()
                .instrument(info_span!("session", session_id = %session_id)),
        );

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let auto_stop = AutoStopTimer::spawn(self.inner.session_config.budget, move || async move {
            if let Some(inner) = weak.upgrade() {
                inner.expire(session_id).await;
            }
        });

        slots.active = Some(ActiveSession {
            id: session_id,
            started_at: Utc::now(),
            scheduler: handle,
            auto_stop: Some(auto_stop),
            stats,
        });

        info!(
            session_id = %session_id,
            agents = self.inner.agents.len(),
            budget_secs = self.inner.session_config.budget.as_secs(),
            "Session started"
        );
        self.inner.emit(SessionEvent::Started { session_id });

        StartOutcome::Started { session_id }
    }

    /// Raise the stop signal and return immediately.
    ///
    /// The scheduler finishes its current cycle and exits on its own;
    /// call `stop()` to wait for it and release the handles.
    pub fn request_stop(&self) -> bool {
        let raised = self.inner.stop.request();
        if raised {
            info!("Stop requested");
            self.inner.emit(SessionEvent::StopRequested {
                trigger: StopTrigger::User,
            });
        }
        raised
    }

    /// Stop with the configured grace period
    pub async fn stop(&self) -> StopOutcome {
        self.stop_with_timeout(self.inner.session_config.graceful_stop_timeout)
            .await
    }

    /// Stop the session, waiting at most `graceful_timeout` before aborting
    /// the scheduler. Safe to call when idle.
    pub async fn stop_with_timeout(&self, graceful_timeout: Duration) -> StopOutcome {
        let mut slots = self.inner.slots.lock().await;

        let Some(active) = slots.active.as_mut() else {
            debug!("Stop ignored, no session running");
            return StopOutcome::NotRunning;
        };
        if let Some(timer) = active.auto_stop.take() {
            timer.cancel();
        }

        self.inner
            .shutdown(&mut slots, StopTrigger::User, graceful_timeout)
            .await
    }

    /// Reset every trader's state. Independent of the running session.
    pub async fn reset(&self) -> Result<()> {
        match self.inner.resetter.reset_all().await {
            Ok(()) => {
                info!("Traders reset");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Trader reset failed");
                match e {
                    FloorError::Reset(_) => Err(e),
                    other => Err(FloorError::Reset(other.to_string())),
                }
            }
        }
    }

    pub async fn state(&self) -> SessionState {
        let slots = self.inner.slots.lock().await;
        match &slots.active {
            Some(active) if active.is_live() => SessionState::Running,
            _ => SessionState::Idle,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state().await == SessionState::Running
    }

    pub async fn status(&self) -> SessionStatus {
        let slots = self.inner.slots.lock().await;
        let stop_requested = self.inner.stop.is_set();

        match &slots.active {
            Some(active) => SessionStatus {
                state: if active.is_live() {
                    SessionState::Running
                } else {
                    SessionState::Idle
                },
                session_id: Some(active.id),
                started_at: Some(active.started_at),
                stop_requested,
                auto_stop_in_secs: active
                    .auto_stop
                    .as_ref()
                    .filter(|timer| !timer.is_finished())
                    .map(|timer| timer.remaining().as_secs()),
                stats: active.stats.snapshot(),
            },
            None => SessionStatus {
                state: SessionState::Idle,
                session_id: None,
                started_at: None,
                stop_requested,
                auto_stop_in_secs: None,
                stats: slots.last_stats,
            },
        }
    }
}

impl Inner {
    /// Auto-stop path, run from inside the timer task
    async fn expire(&self, session_id: Uuid) {
        let mut slots = self.slots.lock().await;

        let Some(active) = slots.active.as_mut() else {
            return;
        };
        if active.id != session_id {
            return;
        }
        // Clear our own handle; aborting it here would cancel this very task
        active.auto_stop.take();

        if self.stop.is_set() {
            debug!(session_id = %session_id, "Auto-stop skipped, stop already requested");
            return;
        }

        info!(session_id = %session_id, "Auto-stop firing");
        self.emit(SessionEvent::AutoStopFired { session_id });
        let grace = self.session_config.graceful_stop_timeout;
        self.shutdown(&mut slots, StopTrigger::AutoStop, grace).await;
    }

    /// Shared stop path. Releases the scheduler handle on every exit path.
    async fn shutdown(
        &self,
        slots: &mut Slots,
        trigger: StopTrigger,
        graceful_timeout: Duration,
    ) -> StopOutcome {
        let Some(mut active) = slots.active.take() else {
            return StopOutcome::NotRunning;
        };

        if self.stop.request() {
            self.emit(SessionEvent::StopRequested { trigger });
        }

        let outcome = match join_scheduler(&mut active.scheduler, graceful_timeout).await {
            SchedulerExit::Completed => StopOutcome::Graceful,
            SchedulerExit::TimedOut => {
                warn!(
                    session_id = %active.id,
                    grace_ms = graceful_timeout.as_millis() as u64,
                    "Scheduler did not exit in time, aborting"
                );
                active.scheduler.abort();
                let _ = (&mut active.scheduler).await;
                StopOutcome::Forced
            }
            SchedulerExit::Cancelled => StopOutcome::Forced,
            SchedulerExit::Panicked => StopOutcome::Panicked,
        };

        slots.last_stats = active.stats.snapshot();
        info!(session_id = %active.id, %trigger, %outcome, "Session stopped");
        self.emit(SessionEvent::Stopped {
            session_id: active.id,
            outcome,
        });
        outcome
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for Inner {
    /// Last controller handle gone: nothing can stop the session any more,
    /// so tear it down here instead of leaving the scheduler running.
    fn drop(&mut self) {
        self.stop.request();
        if let Some(active) = self.slots.get_mut().active.take() {
            if let Some(timer) = active.auto_stop {
                timer.cancel();
            }
            active.scheduler.abort();
            debug!(session_id = %active.id, "Controller dropped, session aborted");
        }
    }
}

/// Wait for the scheduler task without deciding what to do on timeout
pub(crate) async fn join_scheduler(
    handle: &mut JoinHandle<()>,
    graceful_timeout: Duration,
) -> SchedulerExit {
    match tokio::time::timeout(graceful_timeout, handle).await {
        Ok(Ok(())) => SchedulerExit::Completed,
        Ok(Err(e)) if e.is_cancelled() => SchedulerExit::Cancelled,
        Ok(Err(_)) => SchedulerExit::Panicked,
        Err(_) => SchedulerExit::TimedOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::AlwaysOpen;
    use crate::agents::traits::MockResetCollaborator;

    fn controller_with_resetter(resetter: MockResetCollaborator) -> SessionController {
        SessionController::new(
            CycleSchedulerConfig::default(),
            SessionConfig::default(),
            Vec::new(),
            Arc::new(AlwaysOpen),
            Arc::new(resetter),
        )
    }

    #[tokio::test]
    async fn test_join_scheduler_completed() {
        let mut handle = tokio::spawn(async {});
        assert_eq!(
            join_scheduler(&mut handle, Duration::from_secs(1)).await,
            SchedulerExit::Completed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_scheduler_timed_out() {
        let mut handle = tokio::spawn(tokio::time::sleep(Duration::from_secs(60)));
        assert_eq!(
            join_scheduler(&mut handle, Duration::from_secs(1)).await,
            SchedulerExit::TimedOut
        );
        handle.abort();
    }

    #[tokio::test]
    async fn test_join_scheduler_cancelled() {
        let mut handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        assert_eq!(
            join_scheduler(&mut handle, Duration::from_secs(1)).await,
            SchedulerExit::Cancelled
        );
    }

    #[tokio::test]
    async fn test_join_scheduler_panicked() {
        let mut handle = tokio::spawn(async { panic!("scheduler bug") });
        assert_eq!(
            join_scheduler(&mut handle, Duration::from_secs(1)).await,
            SchedulerExit::Panicked
        );
    }

    #[tokio::test]
    async fn test_reset_success_leaves_state_idle() {
        let mut resetter = MockResetCollaborator::new();
        resetter.expect_reset_all().times(1).returning(|| Ok(()));
        let controller = controller_with_resetter(resetter);

        tokio_test::assert_ok!(controller.reset().await);
        assert_eq!(controller.state().await, SessionState::Idle);
        assert!(!controller.stop_signal().is_set());
    }

    #[tokio::test]
    async fn test_reset_failure_is_reported_as_reset_error() {
        let mut resetter = MockResetCollaborator::new();
        resetter
            .expect_reset_all()
            .returning(|| Err(std::io::Error::other("ledger locked").into()));
        let controller = controller_with_resetter(resetter);

        let err = tokio_test::assert_err!(controller.reset().await);
        assert!(matches!(err, FloorError::Reset(ref msg) if msg.contains("ledger locked")));
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let controller = controller_with_resetter(MockResetCollaborator::new());

        assert_eq!(controller.stop().await, StopOutcome::NotRunning);
        assert_eq!(controller.stop().await, StopOutcome::NotRunning);
        assert_eq!(controller.state().await, SessionState::Idle);
        assert!(!controller.stop_signal().is_set());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_last_controller_ends_session() {
        let controller = controller_with_resetter(MockResetCollaborator::new());
        let stop = controller.stop_signal();
        let observer = controller.clone();

        controller.start().await;
        drop(controller);
        // A surviving clone keeps the session alive
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(observer.is_running().await);
        assert!(!stop.is_set());

        drop(observer);
        assert!(stop.is_set());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(StopOutcome::Forced.to_string(), "forced");
        assert_eq!(SessionState::Running.to_string(), "running");
    }
}
