#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

use trading_floor::agents::{ResetCollaborator, TradingAgent};
use trading_floor::coordination::{CycleSchedulerConfig, SessionConfig, SessionController, SessionEvent};
use trading_floor::{AlwaysOpen, FloorError, Result};

/// Agent that records when each run started and how many finished
pub struct RecordingAgent {
    name: String,
    delay: Duration,
    origin: Instant,
    starts: Mutex<Vec<Duration>>,
    completed: AtomicUsize,
}

impl RecordingAgent {
    pub fn new(name: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            delay,
            origin: Instant::now(),
            starts: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        })
    }

    /// Whole seconds since construction at which each run began
    pub fn start_secs(&self) -> Vec<u64> {
        self.starts
            .lock()
            .unwrap()
            .iter()
            .map(|offset| offset.as_secs())
            .collect()
    }

    pub fn started(&self) -> usize {
        self.starts.lock().unwrap().len()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TradingAgent for RecordingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<()> {
        self.starts.lock().unwrap().push(self.origin.elapsed());
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Reset collaborator with a fixed answer
pub struct FixedReset {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FixedReset {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ResetCollaborator for FixedReset {
    async fn reset_all(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(FloorError::Reset("account store unavailable".into()))
        } else {
            Ok(())
        }
    }
}

pub fn controller(
    tick: Duration,
    budget: Duration,
    agents: &[Arc<RecordingAgent>],
    resetter: Arc<dyn ResetCollaborator>,
) -> SessionController {
    SessionController::new(
        CycleSchedulerConfig {
            tick_interval: tick,
            ..CycleSchedulerConfig::default()
        },
        SessionConfig {
            budget,
            graceful_stop_timeout: Duration::from_secs(2),
        },
        agents
            .iter()
            .map(|agent| Arc::clone(agent) as Arc<dyn TradingAgent>)
            .collect(),
        Arc::new(AlwaysOpen),
        resetter,
    )
}

/// Everything currently buffered on the receiver
pub fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
