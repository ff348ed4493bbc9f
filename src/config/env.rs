//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "SAAS_ORCH";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Config file from SAAS_ORCH_CONFIG
    pub config_file: Option<String>,
    /// Log level from SAAS_ORCH_LOG_LEVEL
    pub log_level: Option<String>,
    /// Stage timeout (secs) from SAAS_ORCH_STAGE_TIMEOUT
    pub stage_timeout: Option<u64>,
    /// Operation timeout (secs) from SAAS_ORCH_OPERATION_TIMEOUT
    pub operation_timeout: Option<u64>,
    /// Rollback on failure from SAAS_ORCH_ROLLBACK
    pub rollback: Option<bool>,
    /// Batch concurrency from SAAS_ORCH_MAX_CONCURRENT
    pub max_concurrent: Option<usize>,
    /// Monitoring base URL from SAAS_ORCH_MONITORING_URL
    pub monitoring_url: Option<String>,
    /// Billing base URL from SAAS_ORCH_BILLING_URL
    pub billing_url: Option<String>,
    /// Bearer token for HTTP backends from SAAS_ORCH_API_TOKEN
    pub api_token: Option<String>,
    /// Knowledge directory from SAAS_ORCH_KNOWLEDGE_DIR
    pub knowledge_dir: Option<String>,
    /// Output format from SAAS_ORCH_FORMAT
    pub format: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            config_file: get_env("CONFIG"),
            log_level: get_env("LOG_LEVEL"),
            stage_timeout: get_env_parse("STAGE_TIMEOUT"),
            operation_timeout: get_env_parse("OPERATION_TIMEOUT"),
            rollback: get_env_bool("ROLLBACK"),
            max_concurrent: get_env_parse("MAX_CONCURRENT"),
            monitoring_url: get_env("MONITORING_URL"),
            billing_url: get_env("BILLING_URL"),
            api_token: get_env("API_TOKEN"),
            knowledge_dir: get_env("KNOWLEDGE_DIR"),
            format: get_env("FORMAT"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.config_file.is_some()
            || self.log_level.is_some()
            || self.stage_timeout.is_some()
            || self.operation_timeout.is_some()
            || self.rollback.is_some()
            || self.max_concurrent.is_some()
            || self.monitoring_url.is_some()
            || self.billing_url.is_some()
            || self.api_token.is_some()
            || self.knowledge_dir.is_some()
            || self.format.is_some()
    }

    /// Get output format with fallback
    pub fn format_or(&self, default: &str) -> String {
        self.format.clone().unwrap_or_else(|| default.to_string())
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_CONFIG:            {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_LOG_LEVEL:         {:?}", ENV_PREFIX, self.log_level);
        println!("  {}_STAGE_TIMEOUT:     {:?}", ENV_PREFIX, self.stage_timeout);
        println!("  {}_OPERATION_TIMEOUT: {:?}", ENV_PREFIX, self.operation_timeout);
        println!("  {}_ROLLBACK:          {:?}", ENV_PREFIX, self.rollback);
        println!("  {}_MAX_CONCURRENT:    {:?}", ENV_PREFIX, self.max_concurrent);
        println!("  {}_MONITORING_URL:    {:?}", ENV_PREFIX, self.monitoring_url);
        println!("  {}_BILLING_URL:       {:?}", ENV_PREFIX, self.billing_url);
        println!(
            "  {}_API_TOKEN:         {}",
            ENV_PREFIX,
            if self.api_token.is_some() { "<set>" } else { "None" }
        );
        println!("  {}_KNOWLEDGE_DIR:     {:?}", ENV_PREFIX, self.knowledge_dir);
        println!("  {}_FORMAT:            {:?}", ENV_PREFIX, self.format);
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Builder for setting environment variables (useful for testing)
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    /// Set any prefixed variable
    pub fn var(mut self, name: &str, value: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_{name}"), value.into()));
        self
    }

    pub fn stage_timeout(self, secs: u64) -> Self {
        self.var("STAGE_TIMEOUT", secs.to_string())
    }

    pub fn rollback(self, enabled: bool) -> Self {
        self.var("ROLLBACK", enabled.to_string())
    }

    pub fn monitoring_url(self, url: impl Into<String>) -> Self {
        self.var("MONITORING_URL", url)
    }

    /// Apply environment variables
    pub fn apply(self) {
        for (key, value) in self.vars {
            env::set_var(key, value);
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

impl Default for EnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that restores environment variables on drop
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print all SAAS_ORCH environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_CONFIG             Path to configuration file");
    println!("  {ENV_PREFIX}_LOG_LEVEL          Log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_STAGE_TIMEOUT      Timeout per deploy stage in seconds");
    println!("  {ENV_PREFIX}_OPERATION_TIMEOUT  Timeout for billing/health/knowledge calls");
    println!("  {ENV_PREFIX}_ROLLBACK           Undo completed stages on failure (true/false)");
    println!("  {ENV_PREFIX}_MAX_CONCURRENT     Concurrent deploys in a batch");
    println!("  {ENV_PREFIX}_MONITORING_URL     Monitoring backend base URL");
    println!("  {ENV_PREFIX}_BILLING_URL        Billing backend base URL");
    println!("  {ENV_PREFIX}_API_TOKEN          Bearer token for HTTP backends");
    println!("  {ENV_PREFIX}_KNOWLEDGE_DIR      Knowledge store directory");
    println!("  {ENV_PREFIX}_FORMAT             Output format (table, json, json-pretty, summary)");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_MONITORING_URL=http://localhost:9090");
    println!("  saas-orchestrator deploy services.yaml");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.stage_timeout.is_none());
        assert!(!config.has_any());
        assert_eq!(config.format_or("table"), "table");
    }

    #[test]
    fn test_env_builder() {
        let _guard = EnvBuilder::new()
            .stage_timeout(45)
            .monitoring_url("http://mon:9000")
            .apply_scoped();

        let config = EnvConfig::load();
        assert_eq!(config.stage_timeout, Some(45));
        assert_eq!(config.monitoring_url.as_deref(), Some("http://mon:9000"));
        assert!(config.has_any());
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = EnvBuilder::new().rollback(true).apply_scoped();

        let config = EnvConfig::load();
        assert_eq!(config.rollback, Some(true));
    }

    #[test]
    fn test_guard_restores() {
        {
            let _guard = EnvBuilder::new()
                .var("KNOWLEDGE_DIR", "/tmp/kb-guard-test")
                .apply_scoped();
            assert_eq!(
                EnvConfig::load().knowledge_dir.as_deref(),
                Some("/tmp/kb-guard-test")
            );
        }
        assert!(env::var("SAAS_ORCH_KNOWLEDGE_DIR").is_err());
    }
}
