// Job pipeline: workflow state, the stage machine that drives it, the orchestrator
// entry point and its HTTP handlers.

pub mod handlers;
pub mod machine;
pub mod orchestrator;
pub mod workflow_state;
