//! Wizard state machine — step index, collected answers, and hand-off.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::WizardError;

use super::steps::StepDefinition;

/// Answers collected so far, keyed by step name.
///
/// Only grows while the wizard runs; hand-off moves a copy downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<String, String>);

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn set(&mut self, name: &str, value: String) {
        self.0.insert(name.to_string(), value);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AnswerMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Outcome of [`Wizard::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved forward; carries the new index.
    Moved(usize),
    /// Advanced past the last step. The controller is now finished.
    HandOff(AnswerMap),
    /// Hand-off already happened; nothing changed.
    Finished,
}

/// Index + answers. `index` is always a valid position into the step list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardState {
    pub index: usize,
    pub answers: AnswerMap,
}

/// Sequences the user through an ordered set of steps.
pub struct Wizard {
    steps: Vec<StepDefinition>,
    state: WizardState,
    finished: bool,
}

impl Wizard {
    /// Create a wizard positioned on the first step.
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self, WizardError> {
        if steps.is_empty() {
            return Err(WizardError::NoSteps);
        }
        for (i, step) in steps.iter().enumerate() {
            if steps[..i].iter().any(|s| s.name == step.name) {
                return Err(WizardError::DuplicateStep(step.name.clone()));
            }
        }
        Ok(Self {
            steps,
            state: WizardState::default(),
            finished: false,
        })
    }

    pub fn index(&self) -> usize {
        self.state.index
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn current_step(&self) -> &StepDefinition {
        &self.steps[self.state.index]
    }

    pub fn is_last_step(&self) -> bool {
        self.state.index == self.last_index()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.state.answers
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// Value to re-display for a step; unanswered steps read as empty.
    pub fn value_for(&self, name: &str) -> &str {
        self.state.answers.get(name).unwrap_or("")
    }

    /// Record an answer. Any value is accepted, including empty.
    pub fn update(&mut self, name: &str, value: impl Into<String>) {
        if self.finished {
            warn!(step = name, "Ignoring update after hand-off");
            return;
        }
        self.state.answers.set(name, value.into());
    }

    /// Move to the next step, or hand off the answers from the last one.
    pub fn advance(&mut self) -> Advance {
        if self.finished {
            warn!("advance() called after hand-off");
            return Advance::Finished;
        }
        if self.is_last_step() {
            self.finished = true;
            info!(answers = self.state.answers.len(), "Wizard complete, handing off");
            return Advance::HandOff(self.state.answers.clone());
        }
        self.state.index += 1;
        debug!(index = self.state.index, "Wizard advanced");
        Advance::Moved(self.state.index)
    }

    /// Step back one screen. No-op on the first step. Returns the index.
    pub fn retreat(&mut self) -> usize {
        if !self.finished && self.state.index > 0 {
            self.state.index -= 1;
            debug!(index = self.state.index, "Wizard retreated");
        }
        self.state.index
    }

    /// Jump straight to the last step without touching the answers.
    pub fn skip(&mut self) -> usize {
        if !self.finished {
            self.state.index = self.last_index();
            debug!(index = self.state.index, "Wizard skipped to last step");
        }
        self.state.index
    }

    /// Header bar value: round(index / count * 100).
    pub fn completion_percent(&self) -> u8 {
        let total = self.steps.len();
        ((self.state.index * 200 + total) / (2 * total)) as u8
    }

    /// "Step 2 of 6".
    pub fn position_label(&self) -> String {
        format!("Step {} of {}", self.state.index + 1, self.steps.len())
    }

    /// Label of the forward button.
    pub fn advance_label(&self) -> &'static str {
        if self.is_last_step() { "Finish" } else { "Next" }
    }

    fn last_index(&self) -> usize {
        self.steps.len() - 1
    }
}
