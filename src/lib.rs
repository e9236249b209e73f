//! Edu Reco — study-abroad onboarding wizard with a streaming chat guide.

pub mod chat;
pub mod config;
pub mod error;
pub mod flow;
pub mod progress;
pub mod terminal;
pub mod wizard;
