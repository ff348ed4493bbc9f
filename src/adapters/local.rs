//! Log-only backends used when no monitoring or billing service is configured

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::gateway::{BillingGateway, MonitoringGateway};
use crate::models::{DeploymentSpec, HealthReport, HealthState};

/// Remembers plans registered in this process and reports them as unknown.
#[derive(Default)]
pub struct LocalMonitoring {
    planned: Mutex<BTreeSet<String>>,
}

impl LocalMonitoring {
    pub fn new() -> Self {
        Self::default()
    }

    fn planned(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.planned
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl MonitoringGateway for LocalMonitoring {
    async fn create_monitoring_plan(&self, spec: &DeploymentSpec) -> Result<(), GatewayError> {
        info!(deployment = %spec.name, "Monitoring plan recorded locally");
        self.planned().insert(spec.name.clone());
        Ok(())
    }

    async fn remove_monitoring_plan(&self, spec: &DeploymentSpec) -> Result<(), GatewayError> {
        self.planned().remove(&spec.name);
        Ok(())
    }

    async fn get_health_status(&self) -> Result<HealthReport, GatewayError> {
        Ok(self
            .planned()
            .iter()
            .map(|name| (name.clone(), HealthState::Unknown))
            .collect())
    }

    async fn trigger_alert(&self, name: &str, alert_type: &str) -> Result<(), GatewayError> {
        warn!(deployment = %name, alert_type, "Alert (no monitoring backend configured)");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

/// Billing that has nothing to process.
#[derive(Default)]
pub struct LocalBilling;

#[async_trait]
impl BillingGateway for LocalBilling {
    async fn process_invoices(&self) -> Result<u32, GatewayError> {
        info!("No billing backend configured; skipping invoices");
        Ok(0)
    }

    async fn handle_renewals(&self) -> Result<u32, GatewayError> {
        info!("No billing backend configured; skipping renewals");
        Ok(0)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
