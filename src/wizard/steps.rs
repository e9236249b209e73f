//! Step definitions — static form configuration for the onboarding wizard.

use serde::{Deserialize, Serialize};

/// How a step collects its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputKind {
    /// Free text with a hint shown while empty.
    Text { placeholder: String },
    /// One of an ordered list of options.
    Choice { options: Vec<String> },
}

impl InputKind {
    /// Look up a multiple-choice option by its 1-based position, as typed
    /// by a user picking from a numbered list.
    pub fn option_at(&self, position: usize) -> Option<&str> {
        match self {
            Self::Choice { options } => position
                .checked_sub(1)
                .and_then(|i| options.get(i))
                .map(String::as_str),
            Self::Text { .. } => None,
        }
    }
}

/// One screen of the wizard. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Display label.
    pub title: String,
    /// Answer key; unique across the step list.
    pub name: String,
    pub kind: InputKind,
}

impl StepDefinition {
    pub fn text(title: &str, name: &str, placeholder: &str) -> Self {
        Self {
            title: title.to_string(),
            name: name.to_string(),
            kind: InputKind::Text {
                placeholder: placeholder.to_string(),
            },
        }
    }

    pub fn choice(title: &str, name: &str, options: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            name: name.to_string(),
            kind: InputKind::Choice {
                options: options.iter().map(|o| o.to_string()).collect(),
            },
        }
    }

    /// Sub-heading shown under the title.
    pub fn prompt(&self) -> String {
        format!("Tell us about {}.", self.title.to_lowercase())
    }
}

/// The study-abroad profile questions.
pub fn default_steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::choice(
            "Your Qualifications",
            "qualifications",
            &["A-Levels", "High School", "Bachelor's", "Master's", "Other"],
        ),
        StepDefinition::text("Percentage / CGPA", "percentage", "e.g., 3.4 GPA or 78%"),
        StepDefinition::text(
            "University / College",
            "university",
            "Your current / last institution",
        ),
        StepDefinition::text("Completion Year", "completion_year", "e.g., 2024"),
        StepDefinition::text("Interested Country", "country", "e.g., Canada, UK, USA"),
        StepDefinition::text("Have you done IELTS?", "ielts", "Yes or No"),
    ]
}
