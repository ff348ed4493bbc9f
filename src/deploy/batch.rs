//! Concurrent deployment of many requests
//!
//! Requests for different names run in parallel up to a concurrency limit.
//! A name may appear once per batch: later requests with the same name are
//! rejected at validation without touching any gateway.

use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::orchestrator::Orchestrator;
use super::validator::raw_name;
use crate::error::ValidationError;
use crate::models::{DeploymentOutcome, RawSpec, Stage};

/// Runs a set of deploys with bounded concurrency
pub struct BatchDeployer {
    orchestrator: Arc<Orchestrator>,
    max_concurrent: usize,
}

impl BatchDeployer {
    pub fn new(orchestrator: Arc<Orchestrator>, max_concurrent: usize) -> Self {
        Self {
            orchestrator,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Deploy every request; outcomes come back in input order.
    pub async fn deploy_all(&self, requests: &[RawSpec]) -> Vec<DeploymentOutcome> {
        info!(
            "Deploying {} services (max {} concurrent)",
            requests.len(),
            self.max_concurrent
        );

        let mut seen = HashSet::new();
        let duplicates: Vec<Option<&str>> = requests
            .iter()
            .map(|raw| raw_name(raw).filter(|name| !seen.insert(*name)))
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        let deploys = requests.iter().zip(duplicates).map(|(raw, duplicate)| {
            let semaphore = semaphore.clone();
            let orchestrator = self.orchestrator.clone();
            async move {
                if let Some(name) = duplicate {
                    warn!(deployment = name, "Duplicate name in batch, skipping");
                    let err = ValidationError::DuplicateName {
                        name: name.to_string(),
                    };
                    return Orchestrator::rejected(raw, err);
                }
                let _permit = semaphore.acquire().await.ok();
                orchestrator.deploy(raw).await
            }
        });

        join_all(deploys).await
    }

    /// Aggregate a batch's outcomes
    pub fn summarize(outcomes: &[DeploymentOutcome]) -> BatchSummary {
        let mut failed_by_stage = BTreeMap::new();
        for failure in outcomes.iter().filter_map(|o| o.failure()) {
            *failed_by_stage.entry(failure.stage).or_insert(0) += 1;
        }

        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();

        BatchSummary {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            failed_by_stage,
        }
    }
}

/// Totals across a batch
#[derive(Clone, Debug, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_by_stage: BTreeMap<Stage, usize>,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}
