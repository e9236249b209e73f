//! Onboarding wizard — ordered profile questions with back/skip navigation.
//!
//! The wizard owns its answers until the user advances past the last step,
//! at which point a copy of the [`AnswerMap`] is handed to the next stage.

pub mod state;
pub mod steps;

pub use state::{Advance, AnswerMap, Wizard, WizardState};
pub use steps::{InputKind, StepDefinition, default_steps};
