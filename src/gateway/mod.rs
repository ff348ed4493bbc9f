//! Contracts of the external collaborators the orchestrator drives
//!
//! Provisioning, monitoring, billing and knowledge backends are opaque
//! services. The orchestrator only sees them through these traits and is
//! constructed with one implementation of each.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GatewayError;
use crate::models::{DeploymentSpec, HealthReport};

#[cfg(test)]
pub mod fake;

/// Creates and destroys compute and storage resources for deployments.
#[async_trait]
pub trait ProvisioningGateway: Send + Sync {
    /// Create the compute instance and storage bucket for a deployment.
    ///
    /// Either both resources exist afterwards or the error names the
    /// sub-resource that failed.
    async fn deploy_infrastructure(&self, spec: &DeploymentSpec) -> Result<(), GatewayError>;

    /// Run the finalization script. `Ok(false)` means the script ran and
    /// reported failure.
    async fn run_deployment_script(&self, spec: &DeploymentSpec) -> Result<bool, GatewayError>;

    /// Tear down whatever `deploy_infrastructure` created.
    async fn destroy_infrastructure(&self, spec: &DeploymentSpec) -> Result<(), GatewayError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Registers health and alerting rules and reports deployment status.
#[async_trait]
pub trait MonitoringGateway: Send + Sync {
    async fn create_monitoring_plan(&self, spec: &DeploymentSpec) -> Result<(), GatewayError>;

    /// Remove the plan created by `create_monitoring_plan`.
    async fn remove_monitoring_plan(&self, _spec: &DeploymentSpec) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn get_health_status(&self) -> Result<HealthReport, GatewayError>;

    async fn trigger_alert(&self, name: &str, alert_type: &str) -> Result<(), GatewayError>;

    fn backend_name(&self) -> &'static str;
}

/// Processes invoices and subscription renewals.
///
/// Both operations must be idempotent; retry and backoff are the backend's
/// concern. The returned counts are for observability only.
#[async_trait]
pub trait BillingGateway: Send + Sync {
    async fn process_invoices(&self) -> Result<u32, GatewayError>;

    async fn handle_renewals(&self) -> Result<u32, GatewayError>;

    fn backend_name(&self) -> &'static str;
}

/// Persists per-deployment metadata.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn update_entry(&self, name: &str, data: &Value) -> Result<(), GatewayError>;

    fn backend_name(&self) -> &'static str;
}
