//! Periodic agent loop
//!
//! Runs health checks and billing cycles on independent intervals until
//! shutdown is signalled or each job has run its cycle limit. A failed
//! cycle is logged and the loop keeps going.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::deploy::Orchestrator;
use crate::models::HealthState;

/// Counters for one scheduler run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub health_checks: u64,
    pub health_failures: u64,
    pub billing_cycles: u64,
    pub billing_failures: u64,
}

pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    health_interval: Duration,
    billing_interval: Duration,
    max_cycles: Option<u64>,
}

impl Scheduler {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        health_interval: Duration,
        billing_interval: Duration,
    ) -> Self {
        Self {
            orchestrator,
            health_interval,
            billing_interval,
            max_cycles: None,
        }
    }

    /// Stop once each job has run `cycles` times
    pub fn with_max_cycles(mut self, cycles: Option<u64>) -> Self {
        self.max_cycles = cycles;
        self
    }

    fn under_limit(&self, runs: u64) -> bool {
        self.max_cycles.map_or(true, |max| runs < max)
    }

    /// Run until `shutdown` turns true (or its sender is dropped) or the
    /// cycle limit is reached. Both jobs fire immediately on start.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> SchedulerStats {
        let mut stats = SchedulerStats::default();

        let mut health_tick = interval(self.health_interval);
        health_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut billing_tick = interval(self.billing_interval);
        billing_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            health_secs = self.health_interval.as_secs(),
            billing_secs = self.billing_interval.as_secs(),
            "Scheduler started"
        );

        loop {
            let health_due = self.under_limit(stats.health_checks);
            let billing_due = self.under_limit(stats.billing_cycles);
            if !health_due && !billing_due {
                info!("Cycle limit reached");
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown signal received");
                        break;
                    }
                }
                _ = health_tick.tick(), if health_due => {
                    stats.health_checks += 1;
                    if !self.check_health().await {
                        stats.health_failures += 1;
                    }
                }
                _ = billing_tick.tick(), if billing_due => {
                    stats.billing_cycles += 1;
                    if !self.run_billing().await {
                        stats.billing_failures += 1;
                    }
                }
            }
        }

        info!(
            health_checks = stats.health_checks,
            billing_cycles = stats.billing_cycles,
            "Scheduler stopped"
        );
        stats
    }

    async fn check_health(&self) -> bool {
        match self.orchestrator.monitor_health().await {
            Ok(report) => {
                for (name, state) in report.iter() {
                    if matches!(state, HealthState::Unhealthy | HealthState::Degraded) {
                        warn!(deployment = %name, status = state.as_str(), "Deployment not healthy");
                    }
                }
                info!(
                    deployments = report.len(),
                    healthy = report.count(HealthState::Healthy),
                    "Health check complete"
                );
                true
            }
            Err(e) => {
                error!("Health check failed: {}", e);
                false
            }
        }
    }

    async fn run_billing(&self) -> bool {
        match self.orchestrator.manage_subscriptions().await {
            Ok(_) => true,
            Err(e) => {
                error!("Subscription cycle failed: {}", e);
                false
            }
        }
    }
}
