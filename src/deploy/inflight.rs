//! Per-name single-flight registry
//!
//! At most one deploy may run for a given deployment name at a time. Deploys
//! for different names never contend beyond the brief registry lock.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Set of deployment names with a deploy currently running
#[derive(Clone, Debug, Default)]
pub struct InFlightRegistry {
    names: Arc<Mutex<HashSet<String>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name`. Returns `None` if another deploy already holds it.
    pub fn try_acquire(&self, name: &str) -> Option<InFlightGuard> {
        if self.lock().insert(name.to_string()) {
            Some(InFlightGuard {
                registry: self.clone(),
                name: name.to_string(),
            })
        } else {
            None
        }
    }

    pub fn is_in_flight(&self, name: &str) -> bool {
        self.lock().contains(name)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // The set stays consistent even if a holder panicked mid-insert.
        self.names.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Releases the name when dropped
#[derive(Debug)]
pub struct InFlightGuard {
    registry: InFlightRegistry,
    name: String,
}

impl InFlightGuard {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.name);
    }
}
