//! Provisioning through shell hook commands
//!
//! Every hook runs as `sh -c <command>` with the deployment exported as
//! environment variables:
//!
//! - `SAAS_NAME`, `SAAS_SERVICE_TYPE`, `SAAS_PRICING_PLAN`
//! - `SAAS_PARAM_<KEY>` for each provisioning parameter (key upper-cased,
//!   non-alphanumerics replaced by `_`; non-string values as JSON)
//!
//! Children are killed if the orchestrator abandons the call.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::ProvisioningSettings;
use crate::error::{GatewayError, ResourceKind};
use crate::gateway::ProvisioningGateway;
use crate::models::DeploymentSpec;

pub struct CommandProvisioner {
    settings: ProvisioningSettings,
}

impl CommandProvisioner {
    pub fn new(settings: ProvisioningSettings) -> Self {
        Self { settings }
    }

    /// Run one hook. `None` when the hook is not configured.
    async fn run_hook(
        &self,
        command: Option<&str>,
        spec: &DeploymentSpec,
        resource: ResourceKind,
    ) -> Result<Option<Output>, GatewayError> {
        let Some(command) = command else {
            debug!(deployment = %spec.name, "No {} hook configured, skipping", resource);
            return Ok(None);
        };

        debug!(deployment = %spec.name, "Running {} hook: {}", resource, command);
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .envs(&self.settings.env)
            .envs(hook_env(spec))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| GatewayError::provisioning(resource, format!("failed to spawn: {e}")))?;

        Ok(Some(output))
    }

    /// Run a hook whose non-zero exit is an error for `resource`.
    async fn run_required(
        &self,
        command: Option<&str>,
        spec: &DeploymentSpec,
        resource: ResourceKind,
    ) -> Result<(), GatewayError> {
        match self.run_hook(command, spec, resource).await? {
            Some(output) if !output.status.success() => Err(GatewayError::provisioning(
                resource,
                failure_message(&output),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ProvisioningGateway for CommandProvisioner {
    async fn deploy_infrastructure(&self, spec: &DeploymentSpec) -> Result<(), GatewayError> {
        info!(deployment = %spec.name, "Launching compute instance");
        self.run_required(
            self.settings.launch_instance.as_deref(),
            spec,
            ResourceKind::ComputeInstance,
        )
        .await?;

        info!(deployment = %spec.name, "Creating storage bucket");
        self.run_required(
            self.settings.create_bucket.as_deref(),
            spec,
            ResourceKind::StorageBucket,
        )
        .await
    }

    async fn run_deployment_script(&self, spec: &DeploymentSpec) -> Result<bool, GatewayError> {
        let output = self
            .run_hook(
                self.settings.deploy_script.as_deref(),
                spec,
                ResourceKind::DeploymentScript,
            )
            .await?;

        match output {
            None => Ok(true),
            Some(output) if output.status.success() => Ok(true),
            Some(output) => {
                warn!(deployment = %spec.name, "Deployment script failed: {}", failure_message(&output));
                Ok(false)
            }
        }
    }

    async fn destroy_infrastructure(&self, spec: &DeploymentSpec) -> Result<(), GatewayError> {
        info!(deployment = %spec.name, "Tearing down infrastructure");
        self.run_required(self.settings.teardown.as_deref(), spec, ResourceKind::Teardown)
            .await
    }

    fn backend_name(&self) -> &'static str {
        "command"
    }
}

/// Environment exported to hooks for `spec`
pub fn hook_env(spec: &DeploymentSpec) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert("SAAS_NAME".to_string(), spec.name.clone());
    env.insert(
        "SAAS_SERVICE_TYPE".to_string(),
        spec.service_type.as_str().to_string(),
    );
    env.insert(
        "SAAS_PRICING_PLAN".to_string(),
        spec.pricing_plan.as_str().to_string(),
    );

    for (key, value) in &spec.params {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        env.insert(format!("SAAS_PARAM_{}", env_key(key)), value);
    }
    env
}

fn env_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    let status = match output.status.code() {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    };
    if stderr.is_empty() {
        status
    } else {
        format!("{status}: {stderr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PricingPlan, ServiceType};
    use serde_json::json;
    use tempfile::tempdir;

    fn spec() -> DeploymentSpec {
        DeploymentSpec::new("acme", ServiceType::Webapp, PricingPlan::Pro)
            .with_param("ami_id", "ami-0abc")
            .with_param("disk-gb", json!(20))
    }

    fn provisioner(settings: ProvisioningSettings) -> CommandProvisioner {
        CommandProvisioner::new(settings)
    }

    #[test]
    fn test_hook_env() {
        let env = hook_env(&spec());
        assert_eq!(env["SAAS_NAME"], "acme");
        assert_eq!(env["SAAS_SERVICE_TYPE"], "webapp");
        assert_eq!(env["SAAS_PRICING_PLAN"], "pro");
        assert_eq!(env["SAAS_PARAM_AMI_ID"], "ami-0abc");
        assert_eq!(env["SAAS_PARAM_DISK_GB"], "20");
    }

    #[tokio::test]
    async fn test_unconfigured_hooks_succeed() {
        let p = provisioner(ProvisioningSettings::default());
        assert!(p.deploy_infrastructure(&spec()).await.is_ok());
        assert!(p.run_deployment_script(&spec()).await.unwrap());
        assert!(p.destroy_infrastructure(&spec()).await.is_ok());
    }

    #[tokio::test]
    async fn test_hooks_see_deployment_env() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("launched");
        let settings = ProvisioningSettings {
            launch_instance: Some(format!(
                "test \"$SAAS_NAME\" = acme && echo \"$SAAS_PARAM_AMI_ID $REGION\" > {}",
                marker.display()
            )),
            env: BTreeMap::from([("REGION".to_string(), "eu-west-1".to_string())]),
            ..Default::default()
        };

        provisioner(settings)
            .deploy_infrastructure(&spec())
            .await
            .unwrap();

        let written = std::fs::read_to_string(marker).unwrap();
        assert_eq!(written.trim(), "ami-0abc eu-west-1");
    }

    #[tokio::test]
    async fn test_failure_names_sub_resource() {
        let settings = ProvisioningSettings {
            launch_instance: Some("true".to_string()),
            create_bucket: Some("echo bucket taken >&2; exit 3".to_string()),
            ..Default::default()
        };

        let err = provisioner(settings)
            .deploy_infrastructure(&spec())
            .await
            .unwrap_err();
        assert_eq!(err.resource(), Some(ResourceKind::StorageBucket));
        assert!(err.to_string().contains("exit code 3: bucket taken"));
    }

    #[tokio::test]
    async fn test_instance_failure_skips_bucket() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("bucket");
        let settings = ProvisioningSettings {
            launch_instance: Some("exit 1".to_string()),
            create_bucket: Some(format!("touch {}", marker.display())),
            ..Default::default()
        };

        let err = provisioner(settings)
            .deploy_infrastructure(&spec())
            .await
            .unwrap_err();
        assert_eq!(err.resource(), Some(ResourceKind::ComputeInstance));
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_rollback_removes_instance_when_bucket_fails() {
        use crate::deploy::{Orchestrator, OrchestratorConfig};
        use crate::gateway::fake::{CallLog, FakeBilling, FakeKnowledge, FakeMonitor};
        use crate::models::Stage;
        use std::sync::Arc;

        let dir = tempdir().unwrap();
        let instance = dir.path().join("instance");
        let settings = ProvisioningSettings {
            launch_instance: Some(format!("touch {}", instance.display())),
            create_bucket: Some("exit 1".to_string()),
            teardown: Some(format!("rm -f {}", instance.display())),
            ..Default::default()
        };
        let log = CallLog::new();
        let orchestrator = Orchestrator::new(
            Arc::new(provisioner(settings)),
            Arc::new(FakeMonitor::new(log.clone())),
            Arc::new(FakeBilling::new(log.clone())),
            Arc::new(FakeKnowledge::new(log.clone())),
        )
        .with_config(OrchestratorConfig::new().rollback_on_failure(true));

        let request = json!({ "name": "acme", "service_type": "webapp", "pricing_plan": "pro" });
        let outcome = orchestrator
            .deploy(request.as_object().unwrap())
            .await;

        assert_eq!(outcome.failed_stage(), Some(Stage::Provisioning));
        assert_eq!(outcome.compensations.len(), 1);
        assert!(outcome.compensations[0].error.is_none());
        assert!(!instance.exists());
    }

    #[tokio::test]
    async fn test_script_exit_status_is_result() {
        let ok = ProvisioningSettings {
            deploy_script: Some("exit 0".to_string()),
            ..Default::default()
        };
        let failing = ProvisioningSettings {
            deploy_script: Some("exit 1".to_string()),
            ..Default::default()
        };

        assert!(provisioner(ok).run_deployment_script(&spec()).await.unwrap());
        assert!(!provisioner(failing)
            .run_deployment_script(&spec())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_teardown_failure() {
        let settings = ProvisioningSettings {
            teardown: Some("exit 2".to_string()),
            ..Default::default()
        };
        let err = provisioner(settings)
            .destroy_infrastructure(&spec())
            .await
            .unwrap_err();
        assert_eq!(err.resource(), Some(ResourceKind::Teardown));
    }
}
