//! Campaign run orchestration: the stage machine, the per-run context and
//! the orchestrator that drives targeting through dispatch.

pub mod context;
pub mod orchestrator;
pub mod state_machine;

pub use context::RunContext;
pub use orchestrator::{Collaborators, Orchestrator};
pub use state_machine::{PipelineStateMachine, Stage};
