//! Monitoring backend over HTTP

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::http::HttpClient;
use crate::error::GatewayError;
use crate::gateway::MonitoringGateway;
use crate::models::{DeploymentSpec, HealthReport, HealthState};

/// Monitoring service speaking a small JSON API:
///
/// - `POST /v1/plans` registers a plan
/// - `DELETE /v1/plans/{name}` removes it
/// - `GET /v1/health` returns `{ "<name>": "<status>", ... }`
/// - `POST /v1/alerts` raises an alert
pub struct HttpMonitoring {
    client: HttpClient,
}

impl HttpMonitoring {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MonitoringGateway for HttpMonitoring {
    async fn create_monitoring_plan(&self, spec: &DeploymentSpec) -> Result<(), GatewayError> {
        info!(deployment = %spec.name, "Registering monitoring plan");
        let body = json!({
            "name": spec.name,
            "service_type": spec.service_type,
            "pricing_plan": spec.pricing_plan,
        });
        self.client
            .post("/v1/plans", &body)
            .await
            .map_err(|e| e.into_gateway_error(GatewayError::monitoring))?;
        Ok(())
    }

    async fn remove_monitoring_plan(&self, spec: &DeploymentSpec) -> Result<(), GatewayError> {
        info!(deployment = %spec.name, "Removing monitoring plan");
        self.client
            .delete_segment("/v1/plans", &spec.name)
            .await
            .map_err(|e| e.into_gateway_error(GatewayError::monitoring))?;
        Ok(())
    }

    async fn get_health_status(&self) -> Result<HealthReport, GatewayError> {
        let body = self
            .client
            .get("/v1/health")
            .await
            .map_err(|e| e.into_gateway_error(GatewayError::monitoring))?;
        let report = parse_health_report(body)?;
        debug!("Health report with {} deployments", report.len());
        Ok(report)
    }

    async fn trigger_alert(&self, name: &str, alert_type: &str) -> Result<(), GatewayError> {
        info!(deployment = %name, alert_type, "Triggering alert");
        let body = json!({ "deployment": name, "alert_type": alert_type });
        self.client
            .post("/v1/alerts", &body)
            .await
            .map_err(|e| e.into_gateway_error(GatewayError::monitoring))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

/// Decode a health response. Unrecognised status strings become `unknown`;
/// non-string statuses are rejected.
pub fn parse_health_report(body: Value) -> Result<HealthReport, GatewayError> {
    let map = match body {
        Value::Object(map) => map,
        Value::Null => return Ok(HealthReport::new()),
        other => {
            return Err(GatewayError::monitoring(format!(
                "health response must be an object, found {other}"
            )))
        }
    };

    map.into_iter()
        .map(|(name, status)| match status {
            Value::String(s) => Ok((name, HealthState::from_str(&s))),
            other => Err(GatewayError::monitoring(format!(
                "status for '{name}' must be a string, found {other}"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::http::testing::serve_once;
    use crate::models::{PricingPlan, ServiceType};

    fn spec() -> DeploymentSpec {
        DeploymentSpec::new("acme", ServiceType::Webapp, PricingPlan::Pro)
    }

    #[test]
    fn test_parse_health_report() {
        let report = parse_health_report(json!({
            "acme": "healthy",
            "globex": "DEGRADED",
            "initech": "on fire"
        }))
        .unwrap();

        assert_eq!(report.get("acme"), Some(HealthState::Healthy));
        assert_eq!(report.get("globex"), Some(HealthState::Degraded));
        assert_eq!(report.get("initech"), Some(HealthState::Unknown));
        assert!(parse_health_report(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_parse_health_report_rejects_bad_shapes() {
        assert!(parse_health_report(json!(["acme"])).is_err());
        assert!(parse_health_report(json!({ "acme": 1 })).is_err());
    }

    #[tokio::test]
    async fn test_get_health_status() {
        let (base, server) =
            serve_once("200 OK", r#"{"acme":"healthy","globex":"unhealthy"}"#).await;
        let monitor = HttpMonitoring::new(HttpClient::new(base, 5).unwrap());

        let report = monitor.get_health_status().await.unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report.get("globex"), Some(HealthState::Unhealthy));
        assert!(server.await.unwrap().starts_with("GET /v1/health"));
    }

    #[tokio::test]
    async fn test_create_plan_posts_spec() {
        let (base, server) = serve_once("201 Created", "").await;
        let monitor = HttpMonitoring::new(HttpClient::new(base, 5).unwrap());

        monitor.create_monitoring_plan(&spec()).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/plans"));
        assert!(request.contains(r#""service_type":"webapp""#));
    }

    #[tokio::test]
    async fn test_remove_plan_escapes_name() {
        let (base, server) = serve_once("204 No Content", "").await;
        let monitor = HttpMonitoring::new(HttpClient::new(base, 5).unwrap());
        let spec = DeploymentSpec::new("team/acme?x=1#y", ServiceType::Webapp, PricingPlan::Pro);

        monitor.remove_monitoring_plan(&spec).await.unwrap();

        let request = server.await.unwrap();
        assert!(
            request.starts_with("DELETE /v1/plans/team%2Facme%3Fx=1%23y HTTP/1.1"),
            "unexpected request line: {request}"
        );
    }

    #[tokio::test]
    async fn test_plan_rejection_is_monitoring_error() {
        let (base, _server) = serve_once("422 Unprocessable Entity", "bad plan").await;
        let monitor = HttpMonitoring::new(HttpClient::new(base, 5).unwrap());

        let err = monitor.create_monitoring_plan(&spec()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Monitoring { .. }));
    }
}
