//! Forward-only deploy state machine

use tracing::debug;

use crate::models::{DeploymentState, Stage};

/// Tracks the states one deploy call moves through
#[derive(Debug)]
pub struct StateMachine {
    deployment: String,
    current: DeploymentState,
    history: Vec<DeploymentState>,
}

impl StateMachine {
    pub fn new(deployment: impl Into<String>) -> Self {
        Self {
            deployment: deployment.into(),
            current: DeploymentState::Received,
            history: vec![DeploymentState::Received],
        }
    }

    pub fn current(&self) -> DeploymentState {
        self.current
    }

    /// Move to `next`. Only the immediately following state or a failure is
    /// accepted; anything else (including leaving a terminal state) returns
    /// false and leaves the machine where it was.
    pub fn advance(&mut self, next: DeploymentState) -> bool {
        if self.current.is_terminal() {
            return false;
        }
        let is_failure = matches!(next, DeploymentState::Failed(_));
        if !is_failure && next.rank() != self.current.rank() + 1 {
            return false;
        }

        debug!(
            deployment = %self.deployment,
            from = %self.current,
            to = %next,
            "Deployment state transition"
        );

        self.current = next;
        self.history.push(next);
        true
    }

    /// Fail the stage currently running
    pub fn fail(&mut self, stage: Stage) -> bool {
        self.advance(DeploymentState::Failed(stage))
    }

    pub fn into_history(self) -> Vec<DeploymentState> {
        self.history
    }
}
