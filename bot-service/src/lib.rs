//! The response engine: decides which events get the sushi-grade reply,
//! posts it, and sweeps away replies the community voted down.

pub mod gate;
pub mod patterns;
pub mod processor;
pub mod responder;
pub mod response;
pub mod supervisor;
pub mod sweeper;

pub use gate::{Decision, EligibilityGate};
pub use patterns::PatternLibrary;
pub use processor::{ProcessorStats, ProgressSchedule, StreamProcessor};
pub use responder::Responder;
pub use response::ResponseTemplate;
pub use supervisor::{Supervisor, SupervisorOutcome, SupervisorSettings, SupervisorState};
pub use sweeper::{CleanupSweeper, SweepReport};

/// Why a mode loop returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEnd {
    /// The stop signal arrived.
    Stopped,
    /// The event source closed.
    Exhausted,
}
