//! Data models for deployment orchestration
//!
//! This module contains all data structures used throughout the application.

mod health;
mod operations;
mod outcome;
mod spec;

pub use health::{HealthReport, HealthState};
pub use operations::{KnowledgeEntry, SubscriptionCycleResult};
pub use outcome::{
    CompensationRecord, DeploymentOutcome, DeploymentState, FailureReason, OutcomeStatus, Stage,
    StageFailure, StageRecord,
};
pub use spec::{DeploymentSpec, PricingPlan, ProvisioningParams, RawSpec, RequiredField, ServiceType};
