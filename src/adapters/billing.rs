//! Billing backend over HTTP

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::http::HttpClient;
use crate::error::GatewayError;
use crate::gateway::BillingGateway;

/// Billing service exposing `POST /v1/invoices/process` and
/// `POST /v1/renewals/process`, each answering `{ "count": n }`.
pub struct HttpBilling {
    client: HttpClient,
}

impl HttpBilling {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    async fn run(&self, path: &str) -> Result<u32, GatewayError> {
        let body = self
            .client
            .post(path, &json!({}))
            .await
            .map_err(|e| e.into_gateway_error(GatewayError::billing))?;
        parse_count(&body)
    }
}

#[async_trait]
impl BillingGateway for HttpBilling {
    async fn process_invoices(&self) -> Result<u32, GatewayError> {
        let count = self.run("/v1/invoices/process").await?;
        info!(count, "Invoices processed");
        Ok(count)
    }

    async fn handle_renewals(&self) -> Result<u32, GatewayError> {
        let count = self.run("/v1/renewals/process").await?;
        info!(count, "Renewals handled");
        Ok(count)
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

/// Read the `count` field; an empty response counts as zero.
fn parse_count(body: &Value) -> Result<u32, GatewayError> {
    match body {
        Value::Null => Ok(0),
        Value::Object(map) => match map.get("count") {
            None => Ok(0),
            Some(count) => count
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| GatewayError::billing(format!("invalid count: {count}"))),
        },
        other => Err(GatewayError::billing(format!(
            "unexpected billing response: {other}"
        ))),
    }
}
