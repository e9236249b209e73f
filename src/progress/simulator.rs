//! Timer-driven progress task with a single terminal hand-off.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::wizard::AnswerMap;

use super::state::{Checkpoint, ProgressState, default_checkpoints};

const EVENT_CAPACITY: usize = 128;

/// Settings for one simulation run.
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Labelled thresholds, in any order. An empty list runs with
    /// [`default_checkpoints`] instead.
    pub checkpoints: Vec<Checkpoint>,
    pub tick_interval: Duration,
    pub handoff_delay: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ProgressConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            checkpoints: default_checkpoints(),
            tick_interval: config.tick_interval,
            handoff_delay: config.handoff_delay,
        }
    }
}

/// Events emitted by a running simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Tick { percent: u8, label: String },
    /// Sent once, `handoff_delay` after reaching 100%.
    HandOff(AnswerMap),
}

/// Result of [`ProgressSimulator::start`].
pub enum Start {
    /// No upstream answers: go back to the wizard. Nothing was scheduled.
    Redirect,
    Running(ProgressHandle),
}

/// Owns the running timer task. Dropping it stops the task.
pub struct ProgressHandle {
    events: mpsc::Receiver<ProgressEvent>,
    task: JoinHandle<()>,
}

impl ProgressHandle {
    /// Next event, or `None` once the task has ended or been cancelled.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.events.recv().await
    }

    /// Stop ticking immediately. No hand-off is delivered afterwards.
    pub fn cancel(&mut self) {
        if !self.task.is_finished() {
            debug!("Progress simulation cancelled");
        }
        self.task.abort();
        self.events.close();
        // Drop anything already queued so a pending hand-off cannot leak out.
        while self.events.try_recv().is_ok() {}
    }
}

impl Drop for ProgressHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct ProgressSimulator;

impl ProgressSimulator {
    /// Begin the synthetic progress run for `context`, or ask for a redirect
    /// when there is no context.
    pub fn start(context: Option<AnswerMap>, config: ProgressConfig) -> Start {
        let Some(context) = context else {
            info!("No wizard answers available, redirecting to the wizard");
            return Start::Redirect;
        };

        let (tx, events) = mpsc::channel(EVENT_CAPACITY);
        let task = tokio::spawn(run(context, config, tx));
        Start::Running(ProgressHandle { events, task })
    }
}

async fn run(context: AnswerMap, config: ProgressConfig, tx: mpsc::Sender<ProgressEvent>) {
    let mut state = ProgressState::new(config.checkpoints);
    let mut interval =
        tokio::time::interval_at(Instant::now() + config.tick_interval, config.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while !state.is_complete() {
        interval.tick().await;
        state.tick();
        let event = ProgressEvent::Tick {
            percent: state.percent(),
            label: state.label().to_string(),
        };
        if tx.send(event).await.is_err() {
            debug!(percent = state.percent(), "Progress receiver gone, stopping");
            return;
        }
    }

    tokio::time::sleep(config.handoff_delay).await;
    info!(answers = context.len(), "Profile compiled, handing off");
    let _ = tx.send(ProgressEvent::HandOff(context)).await;
}
