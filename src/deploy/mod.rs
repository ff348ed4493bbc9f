//! Deployment orchestration
//!
//! Validation, the deploy state machine, single-flight protection and
//! batch execution.

mod batch;
mod inflight;
mod orchestrator;
mod state;
mod validator;

pub use batch::{BatchDeployer, BatchSummary};
pub use inflight::{InFlightGuard, InFlightRegistry};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use state::StateMachine;
pub use validator::{raw_name, validate};
