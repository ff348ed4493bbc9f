//! Deployment specification models
//!
//! A deployment request arrives as an untyped bag of fields and is only
//! turned into a [`DeploymentSpec`] once the validator has accepted it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Untyped deployment request as read from a config document
pub type RawSpec = serde_json::Map<String, Value>;

/// Opaque provisioning parameters (machine image, instance class, key reference, ...)
pub type ProvisioningParams = BTreeMap<String, Value>;

/// Fields every deployment request must carry, in validation order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
    Name,
    ServiceType,
    PricingPlan,
}

impl RequiredField {
    /// Key of the field in the raw request
    pub fn key(&self) -> &'static str {
        match self {
            RequiredField::Name => "name",
            RequiredField::ServiceType => "service_type",
            RequiredField::PricingPlan => "pricing_plan",
        }
    }

    /// All required fields in the order they are checked
    pub fn all() -> [RequiredField; 3] {
        [
            RequiredField::Name,
            RequiredField::ServiceType,
            RequiredField::PricingPlan,
        ]
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Kind of hosted service
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceType {
    Webapp,
    Api,
    Worker,
    Static,
    Other(String),
}

impl ServiceType {
    pub fn from_str(s: &str) -> ServiceType {
        match s.to_lowercase().as_str() {
            "webapp" | "web" => ServiceType::Webapp,
            "api" => ServiceType::Api,
            "worker" | "job" => ServiceType::Worker,
            "static" | "site" => ServiceType::Static,
            _ => ServiceType::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ServiceType::Webapp => "webapp",
            ServiceType::Api => "api",
            ServiceType::Worker => "worker",
            ServiceType::Static => "static",
            ServiceType::Other(s) => s,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for ServiceType {
    fn from(s: String) -> Self {
        ServiceType::from_str(&s)
    }
}

impl From<ServiceType> for String {
    fn from(value: ServiceType) -> Self {
        value.as_str().to_string()
    }
}

/// Billing plan a deployment is subscribed to
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PricingPlan {
    Free,
    Starter,
    Pro,
    Enterprise,
    Other(String),
}

impl PricingPlan {
    pub fn from_str(s: &str) -> PricingPlan {
        match s.to_lowercase().as_str() {
            "free" => PricingPlan::Free,
            "starter" | "basic" => PricingPlan::Starter,
            "pro" | "professional" => PricingPlan::Pro,
            "enterprise" => PricingPlan::Enterprise,
            _ => PricingPlan::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PricingPlan::Free => "free",
            PricingPlan::Starter => "starter",
            PricingPlan::Pro => "pro",
            PricingPlan::Enterprise => "enterprise",
            PricingPlan::Other(s) => s,
        }
    }
}

impl fmt::Display for PricingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for PricingPlan {
    fn from(s: String) -> Self {
        PricingPlan::from_str(&s)
    }
}

impl From<PricingPlan> for String {
    fn from(value: PricingPlan) -> Self {
        value.as_str().to_string()
    }
}

/// A validated deployment request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    /// Unique deployment name
    pub name: String,

    /// Service category
    pub service_type: ServiceType,

    /// Subscription plan
    pub pricing_plan: PricingPlan,

    /// Everything else in the request, passed to provisioning untouched
    #[serde(default)]
    pub params: ProvisioningParams,
}

impl DeploymentSpec {
    pub fn new(
        name: impl Into<String>,
        service_type: ServiceType,
        pricing_plan: PricingPlan,
    ) -> Self {
        Self {
            name: name.into(),
            service_type,
            pricing_plan,
            params: ProvisioningParams::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// String value of a provisioning parameter, if present
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}
