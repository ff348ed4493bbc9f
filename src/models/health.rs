//! Deployment health models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Health of a single deployment as seen by the monitoring backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

impl HealthState {
    /// Parse a backend status string; anything unrecognised is `Unknown`
    pub fn from_str(s: &str) -> HealthState {
        match s.trim().to_lowercase().as_str() {
            "healthy" | "ok" | "up" => HealthState::Healthy,
            "degraded" | "warning" => HealthState::Degraded,
            "unhealthy" | "down" | "critical" => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Healthy => "healthy",
            HealthState::Degraded => "degraded",
            HealthState::Unhealthy => "unhealthy",
            HealthState::Unknown => "unknown",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            HealthState::Healthy => "✓",
            HealthState::Degraded => "~",
            HealthState::Unhealthy => "✗",
            HealthState::Unknown => "?",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mapping from deployment name to health, produced fresh on every query
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HealthReport(BTreeMap<String, HealthState>);

impl HealthReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, state: HealthState) -> Self {
        self.0.insert(name.into(), state);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, state: HealthState) {
        self.0.insert(name.into(), state);
    }

    pub fn get(&self, name: &str) -> Option<HealthState> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HealthState)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of deployments in the given state
    pub fn count(&self, state: HealthState) -> usize {
        self.0.values().filter(|s| **s == state).count()
    }

    /// True when every reported deployment is healthy
    pub fn all_healthy(&self) -> bool {
        self.0.values().all(|s| *s == HealthState::Healthy)
    }
}

impl FromIterator<(String, HealthState)> for HealthReport {
    fn from_iter<I: IntoIterator<Item = (String, HealthState)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_state_from_str() {
        assert_eq!(HealthState::from_str("Healthy"), HealthState::Healthy);
        assert_eq!(HealthState::from_str(" degraded "), HealthState::Degraded);
        assert_eq!(HealthState::from_str("down"), HealthState::Unhealthy);
        assert_eq!(HealthState::from_str("stubbed_response"), HealthState::Unknown);
    }

    #[test]
    fn test_report_counts() {
        let report = HealthReport::new()
            .with("acme", HealthState::Healthy)
            .with("globex", HealthState::Degraded)
            .with("initech", HealthState::Healthy);

        assert_eq!(report.len(), 3);
        assert_eq!(report.count(HealthState::Healthy), 2);
        assert_eq!(report.get("globex"), Some(HealthState::Degraded));
        assert!(!report.all_healthy());
    }

    #[test]
    fn test_report_json_shape() {
        let report = HealthReport::new().with("acme", HealthState::Unhealthy);
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"acme":"unhealthy"}"#);

        let parsed: HealthReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
