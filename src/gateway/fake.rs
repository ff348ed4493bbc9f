//! Recording gateway doubles for tests
//!
//! All doubles can share one [`CallLog`] so tests can assert the order in
//! which the orchestrator reached each backend.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use super::{BillingGateway, KnowledgeStore, MonitoringGateway, ProvisioningGateway};
use crate::error::{GatewayError, ResourceKind};
use crate::models::{DeploymentSpec, HealthReport};

/// Shared, ordered record of gateway calls
#[derive(Clone, Debug, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: &str) {
        self.0.lock().unwrap().push(call.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }
}

/// Provisioning double
pub struct FakeProvisioner {
    log: CallLog,
    fail_resource: Option<ResourceKind>,
    script_result: Result<bool, GatewayError>,
    destroy_error: Option<GatewayError>,
    delay: Option<Duration>,
    gate: Option<Arc<Notify>>,
}

impl FakeProvisioner {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_resource: None,
            script_result: Ok(true),
            destroy_error: None,
            delay: None,
            gate: None,
        }
    }

    /// Fail `deploy_infrastructure` on the given sub-resource
    pub fn failing_on(mut self, resource: ResourceKind) -> Self {
        self.fail_resource = Some(resource);
        self
    }

    pub fn script_result(mut self, result: Result<bool, GatewayError>) -> Self {
        self.script_result = result;
        self
    }

    pub fn destroy_error(mut self, err: GatewayError) -> Self {
        self.destroy_error = Some(err);
        self
    }

    /// Sleep this long inside `deploy_infrastructure`
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Block `deploy_infrastructure` until the notify fires
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl ProvisioningGateway for FakeProvisioner {
    async fn deploy_infrastructure(&self, _spec: &DeploymentSpec) -> Result<(), GatewayError> {
        self.log.record("deploy_infrastructure");
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.fail_resource {
            Some(resource) => Err(GatewayError::provisioning(resource, "injected failure")),
            None => Ok(()),
        }
    }

    async fn run_deployment_script(&self, _spec: &DeploymentSpec) -> Result<bool, GatewayError> {
        self.log.record("run_deployment_script");
        self.script_result.clone()
    }

    async fn destroy_infrastructure(&self, _spec: &DeploymentSpec) -> Result<(), GatewayError> {
        self.log.record("destroy_infrastructure");
        match &self.destroy_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}

/// Monitoring double
pub struct FakeMonitor {
    log: CallLog,
    plan_error: Option<GatewayError>,
    report: Result<HealthReport, GatewayError>,
}

impl FakeMonitor {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            plan_error: None,
            report: Ok(HealthReport::new()),
        }
    }

    pub fn plan_error(mut self, err: GatewayError) -> Self {
        self.plan_error = Some(err);
        self
    }

    pub fn report(mut self, report: Result<HealthReport, GatewayError>) -> Self {
        self.report = report;
        self
    }
}

#[async_trait]
impl MonitoringGateway for FakeMonitor {
    async fn create_monitoring_plan(&self, _spec: &DeploymentSpec) -> Result<(), GatewayError> {
        self.log.record("create_monitoring_plan");
        match &self.plan_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn remove_monitoring_plan(&self, _spec: &DeploymentSpec) -> Result<(), GatewayError> {
        self.log.record("remove_monitoring_plan");
        Ok(())
    }

    async fn get_health_status(&self) -> Result<HealthReport, GatewayError> {
        self.log.record("get_health_status");
        self.report.clone()
    }

    async fn trigger_alert(&self, _name: &str, _alert_type: &str) -> Result<(), GatewayError> {
        self.log.record("trigger_alert");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}

/// Billing double
pub struct FakeBilling {
    log: CallLog,
    invoices: u32,
    renewals: u32,
    invoice_error: Option<GatewayError>,
}

impl FakeBilling {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            invoices: 0,
            renewals: 0,
            invoice_error: None,
        }
    }

    pub fn counts(mut self, invoices: u32, renewals: u32) -> Self {
        self.invoices = invoices;
        self.renewals = renewals;
        self
    }

    pub fn invoice_error(mut self, err: GatewayError) -> Self {
        self.invoice_error = Some(err);
        self
    }
}

#[async_trait]
impl BillingGateway for FakeBilling {
    async fn process_invoices(&self) -> Result<u32, GatewayError> {
        self.log.record("process_invoices");
        match &self.invoice_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.invoices),
        }
    }

    async fn handle_renewals(&self) -> Result<u32, GatewayError> {
        self.log.record("handle_renewals");
        Ok(self.renewals)
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}

/// Knowledge store double that keeps every write
pub struct FakeKnowledge {
    log: CallLog,
    writes: Mutex<Vec<(String, Value)>>,
    error: Option<GatewayError>,
}

impl FakeKnowledge {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            writes: Mutex::new(Vec::new()),
            error: None,
        }
    }

    pub fn failing(mut self, err: GatewayError) -> Self {
        self.error = Some(err);
        self
    }

    pub fn writes(&self) -> Vec<(String, Value)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeStore for FakeKnowledge {
    async fn update_entry(&self, name: &str, data: &Value) -> Result<(), GatewayError> {
        self.log.record("update_entry");
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.writes
            .lock()
            .unwrap()
            .push((name.to_string(), data.clone()));
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}
