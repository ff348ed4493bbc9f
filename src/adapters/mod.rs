//! Concrete gateway implementations used by the CLI

pub mod billing;
pub mod command;
pub mod http;
pub mod knowledge;
pub mod local;
pub mod monitoring;

pub use billing::HttpBilling;
pub use command::CommandProvisioner;
pub use http::{HttpClient, HttpError};
pub use knowledge::JsonKnowledgeStore;
pub use local::{LocalBilling, LocalMonitoring};
pub use monitoring::HttpMonitoring;

use anyhow::Result;
use std::sync::Arc;

use crate::config::{AppConfig, ServiceEndpoint};
use crate::deploy::Orchestrator;
use crate::gateway::{BillingGateway, MonitoringGateway};

/// Build an orchestrator wired to the backends named in `config`
pub fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator> {
    let timeout = config.orchestrator.operation_timeout_secs;

    let monitoring: Arc<dyn MonitoringGateway> = match http_client(&config.monitoring, timeout)? {
        Some(client) => Arc::new(HttpMonitoring::new(client)),
        None => Arc::new(LocalMonitoring::new()),
    };
    let billing: Arc<dyn BillingGateway> = match http_client(&config.billing, timeout)? {
        Some(client) => Arc::new(HttpBilling::new(client)),
        None => Arc::new(LocalBilling),
    };

    Ok(Orchestrator::new(
        Arc::new(CommandProvisioner::new(config.provisioning.clone())),
        monitoring,
        billing,
        Arc::new(knowledge_store(config)),
    )
    .with_config(config.orchestrator_config()))
}

/// Knowledge store at the configured (or default) directory
pub fn knowledge_store(config: &AppConfig) -> JsonKnowledgeStore {
    let dir = config
        .knowledge
        .data_dir
        .clone()
        .unwrap_or_else(JsonKnowledgeStore::default_dir);
    JsonKnowledgeStore::new(dir).with_max_history(config.knowledge.max_history)
}

fn http_client(endpoint: &ServiceEndpoint, timeout_secs: u64) -> Result<Option<HttpClient>> {
    endpoint
        .base_url
        .as_ref()
        .map(|url| {
            HttpClient::new(url.clone(), timeout_secs)
                .map(|client| client.bearer_token(endpoint.api_token.clone()))
        })
        .transpose()
}
