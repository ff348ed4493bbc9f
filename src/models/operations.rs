//! Results of the out-of-band operations (billing cycle, knowledge writes)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What one subscription cycle did
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionCycleResult {
    /// Invoices processed by the billing backend
    pub invoices_processed: u32,

    /// Renewals handled by the billing backend
    pub renewals_handled: u32,

    pub started_at: DateTime<Utc>,

    pub duration_ms: u64,
}

impl SubscriptionCycleResult {
    pub fn total(&self) -> u32 {
        self.invoices_processed + self.renewals_handled
    }
}

/// Metadata written to the knowledge store for one deployment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub name: String,

    /// Opaque payload; never interpreted by the orchestrator
    pub data: Value,
}

impl KnowledgeEntry {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}
