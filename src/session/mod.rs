//! Analysis session: state, orchestration, events and progress.

pub mod events;
pub mod orchestrator;
pub mod progress;
pub mod store;

pub use events::{SessionEvent, SessionListener};
pub use orchestrator::{AnalysisOrchestrator, SwitchOutcome};
pub use progress::TerminalProgress;
