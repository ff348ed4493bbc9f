//! Deployment outcome models
//!
//! Defines stages, lifecycle states, and the structured result of a deploy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::error::{GatewayError, ValidationError};

/// Stage of the deploy pipeline at which a failure can occur
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    Provisioning,
    MonitoringSetup,
    Finalization,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Validation => "Validation",
            Stage::Provisioning => "Provisioning",
            Stage::MonitoringSetup => "MonitoringSetup",
            Stage::Finalization => "Finalization",
        }
    }

    pub fn all() -> Vec<Stage> {
        vec![
            Stage::Validation,
            Stage::Provisioning,
            Stage::MonitoringSetup,
            Stage::Finalization,
        ]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Lifecycle state of a single deploy call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum DeploymentState {
    Received,
    Validating,
    Provisioning,
    ConfiguringMonitoring,
    Finalizing,
    Succeeded,
    Failed(Stage),
}

impl DeploymentState {
    /// Position in the forward-only pipeline; terminal states share the last slot
    pub fn rank(&self) -> u8 {
        match self {
            DeploymentState::Received => 0,
            DeploymentState::Validating => 1,
            DeploymentState::Provisioning => 2,
            DeploymentState::ConfiguringMonitoring => 3,
            DeploymentState::Finalizing => 4,
            DeploymentState::Succeeded | DeploymentState::Failed(_) => 5,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentState::Succeeded | DeploymentState::Failed(_)
        )
    }

    /// Stage whose work runs while in this state
    pub fn stage(&self) -> Option<Stage> {
        match self {
            DeploymentState::Validating => Some(Stage::Validation),
            DeploymentState::Provisioning => Some(Stage::Provisioning),
            DeploymentState::ConfiguringMonitoring => Some(Stage::MonitoringSetup),
            DeploymentState::Finalizing => Some(Stage::Finalization),
            _ => None,
        }
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentState::Received => write!(f, "Received"),
            DeploymentState::Validating => write!(f, "Validating"),
            DeploymentState::Provisioning => write!(f, "Provisioning"),
            DeploymentState::ConfiguringMonitoring => write!(f, "ConfiguringMonitoring"),
            DeploymentState::Finalizing => write!(f, "Finalizing"),
            DeploymentState::Succeeded => write!(f, "Succeeded"),
            DeploymentState::Failed(stage) => write!(f, "Failed({stage})"),
        }
    }
}

/// Why a deploy stopped
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "error", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("{0}")]
    Validation(ValidationError),

    #[error("{0}")]
    Gateway(GatewayError),

    #[error("deployment script failed")]
    ScriptFailed,
}

impl From<ValidationError> for FailureReason {
    fn from(err: ValidationError) -> Self {
        FailureReason::Validation(err)
    }
}

impl From<GatewayError> for FailureReason {
    fn from(err: GatewayError) -> Self {
        FailureReason::Gateway(err)
    }
}

/// A failed stage together with its reason
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub reason: FailureReason,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.reason)
    }
}

/// Timing of one completed or failed stage
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub succeeded: bool,
    pub duration_ms: u64,
}

/// A compensating action run after a later stage failed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationRecord {
    /// Stage being undone
    pub stage: Stage,

    /// Error from the compensating call, if it failed
    pub error: Option<String>,
}

/// Final status of a deploy call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    Failed(StageFailure),
}

/// Structured result of one deploy call
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeploymentOutcome {
    /// Deployment name, when the request carried one
    pub deployment: Option<String>,

    /// Success or the failing stage
    pub status: OutcomeStatus,

    /// Every state visited, in order
    pub states: Vec<DeploymentState>,

    /// Stages that ran
    pub stages: Vec<StageRecord>,

    /// Compensations performed after a failure
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compensations: Vec<CompensationRecord>,

    pub started_at: DateTime<Utc>,

    pub duration_ms: u64,
}

impl DeploymentOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, OutcomeStatus::Succeeded)
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        match &self.status {
            OutcomeStatus::Failed(failure) => Some(failure),
            OutcomeStatus::Succeeded => None,
        }
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        self.failure().map(|f| f.stage)
    }

    pub fn reason(&self) -> Option<&FailureReason> {
        self.failure().map(|f| &f.reason)
    }

    /// Last state reached
    pub fn final_state(&self) -> DeploymentState {
        self.states
            .last()
            .copied()
            .unwrap_or(DeploymentState::Received)
    }

    /// Name for display purposes
    pub fn display_name(&self) -> &str {
        self.deployment.as_deref().unwrap_or("<unnamed>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequiredField;

    #[test]
    fn test_state_rank_is_forward() {
        let order = [
            DeploymentState::Received,
            DeploymentState::Validating,
            DeploymentState::Provisioning,
            DeploymentState::ConfiguringMonitoring,
            DeploymentState::Finalizing,
            DeploymentState::Succeeded,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
        assert!(DeploymentState::Failed(Stage::Validation).is_terminal());
        assert!(!DeploymentState::Finalizing.is_terminal());
    }

    #[test]
    fn test_state_stage() {
        assert_eq!(
            DeploymentState::ConfiguringMonitoring.stage(),
            Some(Stage::MonitoringSetup)
        );
        assert_eq!(DeploymentState::Received.stage(), None);
        assert_eq!(
            DeploymentState::Failed(Stage::Finalization).to_string(),
            "Failed(Finalization)"
        );
    }

    #[test]
    fn test_failure_reason_display() {
        let reason: FailureReason = ValidationError::MissingField {
            field: RequiredField::PricingPlan,
        }
        .into();
        assert_eq!(reason.to_string(), "Missing required field: pricing_plan");
        assert_eq!(
            FailureReason::ScriptFailed.to_string(),
            "deployment script failed"
        );
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = DeploymentOutcome {
            deployment: None,
            status: OutcomeStatus::Failed(StageFailure {
                stage: Stage::Validation,
                reason: FailureReason::ScriptFailed,
            }),
            states: vec![
                DeploymentState::Received,
                DeploymentState::Validating,
                DeploymentState::Failed(Stage::Validation),
            ],
            stages: Vec::new(),
            compensations: Vec::new(),
            started_at: Utc::now(),
            duration_ms: 0,
        };

        assert!(!outcome.succeeded());
        assert_eq!(outcome.failed_stage(), Some(Stage::Validation));
        assert_eq!(
            outcome.final_state(),
            DeploymentState::Failed(Stage::Validation)
        );
        assert_eq!(outcome.display_name(), "<unnamed>");
    }
}
