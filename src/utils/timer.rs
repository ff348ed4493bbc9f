//! Timer utilities
//!
//! Measures how long deploy stages and periodic cycles take.

use std::time::{Duration, Instant};

use crate::models::{Stage, StageRecord};

/// Simple timer for measuring elapsed time
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    label: String,
}

impl Timer {
    /// Create and start a new timer
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            label: label.into(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Stop timer and return elapsed time
    pub fn stop(self) -> Duration {
        let elapsed = self.elapsed();
        tracing::debug!("{}: {}ms", self.label, elapsed.as_millis());
        elapsed
    }

    /// Stop timer and record the stage it measured
    pub fn finish_stage(self, stage: Stage, succeeded: bool) -> StageRecord {
        let elapsed = self.stop();
        StageRecord {
            stage,
            succeeded,
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}
