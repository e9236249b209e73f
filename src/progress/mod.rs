//! Profile-compilation progress — a fabricated, checkpoint-labelled
//! percentage that ends in a one-time hand-off to the chat stage.

pub mod simulator;
pub mod state;

pub use simulator::{ProgressConfig, ProgressEvent, ProgressHandle, ProgressSimulator, Start};
pub use state::{Checkpoint, ProgressState, default_checkpoints};
