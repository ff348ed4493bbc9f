//! Configuration module
//!
//! Handles loading and managing configuration.

pub mod env;
pub mod spec_file;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::deploy::OrchestratorConfig;
use env::EnvConfig;

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./saas-orchestrator.yaml",
    "./saas-orchestrator.yml",
    "./.saas-orchestrator.yaml",
    "~/.config/saas-orchestrator/config.yaml",
    "~/.saas-orchestrator.yaml",
];

/// Application configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Deploy pipeline settings
    pub orchestrator: OrchestratorSettings,

    /// Provisioning hook commands
    pub provisioning: ProvisioningSettings,

    /// Monitoring backend
    pub monitoring: ServiceEndpoint,

    /// Billing backend
    pub billing: ServiceEndpoint,

    /// Knowledge store
    pub knowledge: KnowledgeSettings,

    /// Periodic agent loop
    pub schedule: ScheduleSettings,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Resolve the effective configuration: explicit path, else env path,
    /// else a discovered file, else defaults; env overrides applied last.
    pub fn resolve(explicit: Option<&Path>, env: &EnvConfig) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env.config_file.as_ref().map(PathBuf::from))
            .or_else(Self::find);

        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(secs) = env.stage_timeout {
            self.orchestrator.stage_timeout_secs = secs;
        }
        if let Some(secs) = env.operation_timeout {
            self.orchestrator.operation_timeout_secs = secs;
        }
        if let Some(rollback) = env.rollback {
            self.orchestrator.rollback_on_failure = rollback;
        }
        if let Some(n) = env.max_concurrent {
            self.orchestrator.max_concurrent = n;
        }
        if let Some(url) = &env.monitoring_url {
            self.monitoring.base_url = Some(url.clone());
        }
        if let Some(url) = &env.billing_url {
            self.billing.base_url = Some(url.clone());
        }
        if let Some(token) = &env.api_token {
            self.monitoring.api_token = Some(token.clone());
            self.billing.api_token = Some(token.clone());
        }
        if let Some(dir) = &env.knowledge_dir {
            self.knowledge.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.orchestrator.stage_timeout_secs == 0 {
            anyhow::bail!("orchestrator.stage_timeout_secs must be greater than 0");
        }
        if self.orchestrator.operation_timeout_secs == 0 {
            anyhow::bail!("orchestrator.operation_timeout_secs must be greater than 0");
        }
        if self.orchestrator.max_concurrent == 0 {
            anyhow::bail!("orchestrator.max_concurrent must be at least 1");
        }
        if self.schedule.health_interval_secs == 0 || self.schedule.billing_interval_secs == 0 {
            anyhow::bail!("schedule intervals must be greater than 0");
        }
        for (name, endpoint) in [("monitoring", &self.monitoring), ("billing", &self.billing)] {
            if let Some(url) = &endpoint.base_url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    anyhow::bail!("{name}.base_url must be an http(s) URL: {url}");
                }
            }
        }
        Ok(())
    }

    /// Orchestrator settings in runtime form
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::new()
            .stage_timeout(Duration::from_secs(self.orchestrator.stage_timeout_secs))
            .operation_timeout(Duration::from_secs(self.orchestrator.operation_timeout_secs))
            .rollback_on_failure(self.orchestrator.rollback_on_failure)
    }
}

/// Deploy pipeline settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Timeout for each deploy stage, in seconds
    pub stage_timeout_secs: u64,

    /// Timeout for billing/health/knowledge calls, in seconds
    pub operation_timeout_secs: u64,

    /// Undo completed stages when a later one fails
    pub rollback_on_failure: bool,

    /// Maximum deploys running at once in a batch
    pub max_concurrent: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            stage_timeout_secs: 300,
            operation_timeout_secs: 60,
            rollback_on_failure: false,
            max_concurrent: 4,
        }
    }
}

/// Shell commands run by the command provisioner.
///
/// Each command is run through `sh -c` with the deployment's fields exported
/// as `SAAS_*` environment variables. Unset commands are skipped.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningSettings {
    pub launch_instance: Option<String>,
    pub create_bucket: Option<String>,
    pub deploy_script: Option<String>,
    pub teardown: Option<String>,

    /// Extra environment passed to every command
    pub env: BTreeMap<String, String>,
}

/// HTTP backend location
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceEndpoint {
    /// Base URL; when unset the backend is disabled
    pub base_url: Option<String>,

    /// Bearer token
    pub api_token: Option<String>,
}

/// Knowledge store settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeSettings {
    /// Directory for knowledge documents (defaults to the user data dir)
    pub data_dir: Option<PathBuf>,

    /// Revisions kept per deployment; 0 keeps all
    pub max_history: usize,
}

/// Periodic agent loop intervals
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub health_interval_secs: u64,
    pub billing_interval_secs: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            health_interval_secs: 60,
            billing_interval_secs: 3600,
        }
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
pub(crate) fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
