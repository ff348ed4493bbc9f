//! Error types shared by the orchestrator and its gateways

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::models::RequiredField;

/// Sub-resource created while provisioning a deployment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ComputeInstance,
    StorageBucket,
    DeploymentScript,
    Teardown,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ComputeInstance => "compute instance",
            ResourceKind::StorageBucket => "storage bucket",
            ResourceKind::DeploymentScript => "deployment script",
            ResourceKind::Teardown => "teardown",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejection of a deployment request before any side effect
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: RequiredField },

    #[error("Field '{field}' must be a string, found {found}")]
    InvalidField { field: RequiredField, found: String },

    #[error("Deployment '{name}' is already in progress")]
    AlreadyInProgress { name: String },

    #[error("Deployment '{name}' appears more than once in the batch")]
    DuplicateName { name: String },
}

/// Failure reported by an external collaborator
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GatewayError {
    #[error("Provisioning of {resource} failed: {message}")]
    Provisioning {
        resource: ResourceKind,
        message: String,
    },

    #[error("Monitoring error: {message}")]
    Monitoring { message: String },

    #[error("Billing error: {message}")]
    Billing { message: String },

    #[error("Knowledge store error: {message}")]
    Knowledge { message: String },

    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: String, secs: u64 },

    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl GatewayError {
    pub fn provisioning(resource: ResourceKind, message: impl Into<String>) -> Self {
        GatewayError::Provisioning {
            resource,
            message: message.into(),
        }
    }

    pub fn monitoring(message: impl Into<String>) -> Self {
        GatewayError::Monitoring {
            message: message.into(),
        }
    }

    pub fn billing(message: impl Into<String>) -> Self {
        GatewayError::Billing {
            message: message.into(),
        }
    }

    pub fn knowledge(message: impl Into<String>) -> Self {
        GatewayError::Knowledge {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        GatewayError::Transport {
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Timeout { .. })
    }

    /// Sub-resource that failed, for provisioning errors
    pub fn resource(&self) -> Option<ResourceKind> {
        match self {
            GatewayError::Provisioning { resource, .. } => Some(*resource),
            _ => None,
        }
    }
}
