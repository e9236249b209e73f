//! Checkpointed percentage counter — the pure half of the progress screen.

use serde::{Deserialize, Serialize};

/// A percent threshold paired with the label shown once it is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub percent: u8,
    pub label: String,
}

impl Checkpoint {
    pub fn new(percent: u8, label: &str) -> Self {
        Self {
            percent,
            label: label.to_string(),
        }
    }
}

/// The four labelled phases of profile compilation.
pub fn default_checkpoints() -> Vec<Checkpoint> {
    vec![
        Checkpoint::new(30, "Compiling your profile…"),
        Checkpoint::new(60, "Finding best-matching universities…"),
        Checkpoint::new(90, "Refining recommendations…"),
        Checkpoint::new(100, "Almost ready…"),
    ]
}

/// Current percent and active checkpoint.
///
/// The active checkpoint is the highest one whose threshold is at or below
/// `percent`; before the first threshold the first checkpoint's label shows.
#[derive(Debug, Clone)]
pub struct ProgressState {
    checkpoints: Vec<Checkpoint>,
    percent: u8,
    stage: usize,
}

impl ProgressState {
    /// Checkpoints are sorted by threshold; an empty list gets the defaults.
    pub fn new(mut checkpoints: Vec<Checkpoint>) -> Self {
        if checkpoints.is_empty() {
            checkpoints = default_checkpoints();
        }
        checkpoints.sort_by_key(|c| c.percent);
        let mut state = Self {
            checkpoints,
            percent: 0,
            stage: 0,
        };
        state.catch_up_stage();
        state
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn label(&self) -> &str {
        &self.checkpoints[self.stage].label
    }

    pub fn is_complete(&self) -> bool {
        self.percent >= 100
    }

    /// Add one percent. Returns `false` once already at 100.
    pub fn tick(&mut self) -> bool {
        if self.is_complete() {
            return false;
        }
        self.percent += 1;
        self.catch_up_stage();
        true
    }

    fn catch_up_stage(&mut self) {
        while self.stage + 1 < self.checkpoints.len()
            && self.checkpoints[self.stage + 1].percent <= self.percent
        {
            self.stage += 1;
        }
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new(default_checkpoints())
    }
}
