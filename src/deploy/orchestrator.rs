//! Deployment orchestrator
//!
//! Drives one deployment through validation, provisioning, monitoring setup
//! and finalization, and exposes the out-of-band operations (subscription
//! cycle, health, knowledge writes, alerts).
//!
//! `deploy` never returns an error: every stage failure is folded into the
//! returned [`DeploymentOutcome`]. The other operations propagate gateway
//! errors unchanged and leave the failure policy to the caller.

use chrono::Utc;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::inflight::InFlightRegistry;
use super::state::StateMachine;
use super::validator;
use crate::error::{GatewayError, ResourceKind, ValidationError};
use crate::gateway::{BillingGateway, KnowledgeStore, MonitoringGateway, ProvisioningGateway};
use crate::models::{
    CompensationRecord, DeploymentOutcome, DeploymentSpec, DeploymentState, FailureReason,
    HealthReport, OutcomeStatus, RawSpec, Stage, StageFailure, StageRecord,
    SubscriptionCycleResult,
};
use crate::utils::Timer;

/// Orchestrator tuning
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Upper bound for each deploy stage's gateway call
    pub stage_timeout: Duration,

    /// Upper bound for billing, health, knowledge and alert calls
    pub operation_timeout: Duration,

    /// Undo completed stages, newest first, when a later stage fails
    pub rollback_on_failure: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            stage_timeout: Duration::from_secs(300),
            operation_timeout: Duration::from_secs(60),
            rollback_on_failure: false,
        }
    }
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn rollback_on_failure(mut self, enabled: bool) -> Self {
        self.rollback_on_failure = enabled;
        self
    }
}

/// The deployment orchestrator
pub struct Orchestrator {
    provisioning: Arc<dyn ProvisioningGateway>,
    monitoring: Arc<dyn MonitoringGateway>,
    billing: Arc<dyn BillingGateway>,
    knowledge: Arc<dyn KnowledgeStore>,
    config: OrchestratorConfig,
    in_flight: InFlightRegistry,
}

impl Orchestrator {
    pub fn new(
        provisioning: Arc<dyn ProvisioningGateway>,
        monitoring: Arc<dyn MonitoringGateway>,
        billing: Arc<dyn BillingGateway>,
        knowledge: Arc<dyn KnowledgeStore>,
    ) -> Self {
        Self {
            provisioning,
            monitoring,
            billing,
            knowledge,
            config: OrchestratorConfig::default(),
            in_flight: InFlightRegistry::new(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Deploy one service instance from a raw request.
    pub async fn deploy(&self, raw: &RawSpec) -> DeploymentOutcome {
        let mut run = DeployRun::start(validator::raw_name(raw));

        run.enter(DeploymentState::Validating);
        let timer = run.timer(Stage::Validation);
        let spec = match validator::validate(raw) {
            Ok(spec) => spec,
            Err(err) => {
                run.stages.push(timer.finish_stage(Stage::Validation, false));
                let failure = run.fail(Stage::Validation, err.into());
                return run.finish(OutcomeStatus::Failed(failure));
            }
        };

        let Some(_guard) = self.in_flight.try_acquire(&spec.name) else {
            run.stages.push(timer.finish_stage(Stage::Validation, false));
            let err = ValidationError::AlreadyInProgress {
                name: spec.name.clone(),
            };
            let failure = run.fail(Stage::Validation, err.into());
            return run.finish(OutcomeStatus::Failed(failure));
        };
        run.stages.push(timer.finish_stage(Stage::Validation, true));

        match self.run_stages(&spec, &mut run).await {
            Ok(()) => {
                run.enter(DeploymentState::Succeeded);
                info!(deployment = %spec.name, "Deployment succeeded");
                run.finish(OutcomeStatus::Succeeded)
            }
            Err(failure) => {
                if self.config.rollback_on_failure {
                    self.compensate(&spec, &mut run).await;
                }
                run.finish(OutcomeStatus::Failed(failure))
            }
        }
    }

    /// Outcome for a request turned away before `deploy` was called.
    pub fn rejected(raw: &RawSpec, err: ValidationError) -> DeploymentOutcome {
        let mut run = DeployRun::start(validator::raw_name(raw));
        run.enter(DeploymentState::Validating);
        let timer = run.timer(Stage::Validation);
        run.stages.push(timer.finish_stage(Stage::Validation, false));
        let failure = run.fail(Stage::Validation, err.into());
        run.finish(OutcomeStatus::Failed(failure))
    }

    async fn run_stages(
        &self,
        spec: &DeploymentSpec,
        run: &mut DeployRun,
    ) -> Result<(), StageFailure> {
        let limit = self.config.stage_timeout;

        run.enter(DeploymentState::Provisioning);
        info!(
            deployment = %spec.name,
            backend = self.provisioning.backend_name(),
            "Deploying infrastructure"
        );
        let timer = run.timer(Stage::Provisioning);
        let result = bounded(
            "deploy_infrastructure",
            limit,
            self.provisioning.deploy_infrastructure(spec),
        )
        .await;
        run.stages.push(timer.finish_stage(Stage::Provisioning, result.is_ok()));
        if let Err(e) = result {
            if leaves_partial_infrastructure(&e) {
                run.completed.push(Stage::Provisioning);
            }
            return Err(run.fail(Stage::Provisioning, e.into()));
        }
        run.completed.push(Stage::Provisioning);

        run.enter(DeploymentState::ConfiguringMonitoring);
        info!(
            deployment = %spec.name,
            backend = self.monitoring.backend_name(),
            "Setting up monitoring"
        );
        let timer = run.timer(Stage::MonitoringSetup);
        let result = bounded(
            "create_monitoring_plan",
            limit,
            self.monitoring.create_monitoring_plan(spec),
        )
        .await;
        run.stages.push(timer.finish_stage(Stage::MonitoringSetup, result.is_ok()));
        result.map_err(|e| run.fail(Stage::MonitoringSetup, e.into()))?;
        run.completed.push(Stage::MonitoringSetup);

        run.enter(DeploymentState::Finalizing);
        info!(deployment = %spec.name, "Running deployment script");
        let timer = run.timer(Stage::Finalization);
        let result = bounded(
            "run_deployment_script",
            limit,
            self.provisioning.run_deployment_script(spec),
        )
        .await;
        run.stages
            .push(timer.finish_stage(Stage::Finalization, matches!(result, Ok(true))));
        match result {
            Ok(true) => Ok(()),
            Ok(false) => Err(run.fail(Stage::Finalization, FailureReason::ScriptFailed)),
            Err(e) => Err(run.fail(Stage::Finalization, e.into())),
        }
    }

    /// Undo completed stages in reverse order. Compensation errors are
    /// recorded and logged but never stop the chain.
    async fn compensate(&self, spec: &DeploymentSpec, run: &mut DeployRun) {
        let limit = self.config.stage_timeout;

        while let Some(stage) = run.completed.pop() {
            warn!(deployment = %spec.name, stage = %stage, "Rolling back stage");

            let result = match stage {
                Stage::MonitoringSetup => {
                    bounded(
                        "remove_monitoring_plan",
                        limit,
                        self.monitoring.remove_monitoring_plan(spec),
                    )
                    .await
                }
                Stage::Provisioning => {
                    bounded(
                        "destroy_infrastructure",
                        limit,
                        self.provisioning.destroy_infrastructure(spec),
                    )
                    .await
                }
                Stage::Validation | Stage::Finalization => Ok(()),
            };

            if let Err(e) = &result {
                error!(deployment = %spec.name, stage = %stage, error = %e, "Rollback step failed");
            }

            run.compensations.push(CompensationRecord {
                stage,
                error: result.err().map(|e| e.to_string()),
            });
        }
    }

    /// Run one billing cycle: invoices first, then renewals.
    ///
    /// Errors are returned as-is; a failed invoice run skips renewals for
    /// this cycle.
    pub async fn manage_subscriptions(&self) -> Result<SubscriptionCycleResult, GatewayError> {
        let limit = self.config.operation_timeout;
        let started_at = Utc::now();
        let timer = Timer::start("subscription cycle");

        info!(backend = self.billing.backend_name(), "Processing subscriptions");
        let invoices_processed =
            bounded("process_invoices", limit, self.billing.process_invoices()).await?;
        let renewals_handled =
            bounded("handle_renewals", limit, self.billing.handle_renewals()).await?;

        let duration_ms = timer.stop().as_millis() as u64;
        info!(
            invoices = invoices_processed,
            renewals = renewals_handled,
            "Subscription cycle complete"
        );

        Ok(SubscriptionCycleResult {
            invoices_processed,
            renewals_handled,
            started_at,
            duration_ms,
        })
    }

    /// Current health of all deployments, exactly as the monitoring backend reports it.
    pub async fn monitor_health(&self) -> Result<HealthReport, GatewayError> {
        bounded(
            "get_health_status",
            self.config.operation_timeout,
            self.monitoring.get_health_status(),
        )
        .await
    }

    /// Forward metadata for a deployment to the knowledge store.
    pub async fn update_knowledge(&self, name: &str, data: &Value) -> Result<(), GatewayError> {
        info!(deployment = name, "Updating knowledge base");
        bounded(
            "update_entry",
            self.config.operation_timeout,
            self.knowledge.update_entry(name, data),
        )
        .await
    }

    /// Raise an alert for a deployment through the monitoring backend.
    pub async fn trigger_alert(&self, name: &str, alert_type: &str) -> Result<(), GatewayError> {
        info!(deployment = name, alert = alert_type, "Triggering alert");
        bounded(
            "trigger_alert",
            self.config.operation_timeout,
            self.monitoring.trigger_alert(name, alert_type),
        )
        .await
    }
}

/// Bound a gateway call by `limit`; the call is dropped (cancelled) on expiry.
async fn bounded<T, F>(operation: &str, limit: Duration, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout {
            operation: operation.to_string(),
            secs: limit.as_secs(),
        }),
    }
}

/// Whether a failed `deploy_infrastructure` may have left resources behind:
/// the instance exists once the bucket step is reached, and a timed-out call
/// stopped at an unknown point.
fn leaves_partial_infrastructure(err: &GatewayError) -> bool {
    err.is_timeout() || err.resource() == Some(ResourceKind::StorageBucket)
}

/// Bookkeeping for a single deploy call
struct DeployRun {
    deployment: Option<String>,
    machine: StateMachine,
    stages: Vec<StageRecord>,
    completed: Vec<Stage>,
    compensations: Vec<CompensationRecord>,
    started_at: chrono::DateTime<Utc>,
    timer: Timer,
}

impl DeployRun {
    fn start(name: Option<&str>) -> Self {
        let label = name.unwrap_or("<unnamed>");
        Self {
            deployment: name.map(str::to_string),
            machine: StateMachine::new(label),
            stages: Vec::new(),
            completed: Vec::new(),
            compensations: Vec::new(),
            started_at: Utc::now(),
            timer: Timer::start(format!("deploy {label}")),
        }
    }

    fn label(&self) -> &str {
        self.deployment.as_deref().unwrap_or("<unnamed>")
    }

    fn enter(&mut self, state: DeploymentState) {
        let accepted = self.machine.advance(state);
        debug_assert!(accepted, "rejected transition to {state}");
    }

    fn timer(&self, stage: Stage) -> Timer {
        Timer::start(format!("{} {}", self.label(), stage))
    }

    fn fail(&mut self, stage: Stage, reason: FailureReason) -> StageFailure {
        error!(
            deployment = %self.label(),
            stage = %stage,
            reason = %reason,
            "Deployment failed"
        );
        let accepted = self.machine.fail(stage);
        debug_assert!(accepted, "rejected failure of {stage}");
        StageFailure { stage, reason }
    }

    fn finish(self, status: OutcomeStatus) -> DeploymentOutcome {
        let duration_ms = self.timer.stop().as_millis() as u64;
        DeploymentOutcome {
            deployment: self.deployment,
            status,
            states: self.machine.into_history(),
            stages: self.stages,
            compensations: self.compensations,
            started_at: self.started_at,
            duration_ms,
        }
    }
}
