//! Deployment request validation
//!
//! Runs before any gateway is touched. Only `name`, `service_type` and
//! `pricing_plan` are required; every other key is carried through as an
//! opaque provisioning parameter.

use serde_json::Value;
use tracing::debug;

use crate::error::ValidationError;
use crate::models::{
    DeploymentSpec, PricingPlan, ProvisioningParams, RawSpec, RequiredField, ServiceType,
};

/// Validate a raw request and produce a typed spec.
///
/// Fields are checked in the order of [`RequiredField::all`] and the first
/// problem found is returned. A field is missing when absent, `null`, or an
/// empty/blank string.
pub fn validate(raw: &RawSpec) -> Result<DeploymentSpec, ValidationError> {
    let name = required_str(raw, RequiredField::Name)?;
    let service_type = required_str(raw, RequiredField::ServiceType)?;
    let pricing_plan = required_str(raw, RequiredField::PricingPlan)?;

    let params: ProvisioningParams = raw
        .iter()
        .filter(|(key, _)| !RequiredField::all().iter().any(|f| f.key() == key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    debug!(
        deployment = name,
        params = params.len(),
        "Deployment request passed validation"
    );

    Ok(DeploymentSpec {
        name: name.to_string(),
        service_type: ServiceType::from_str(service_type),
        pricing_plan: PricingPlan::from_str(pricing_plan),
        params,
    })
}

/// Name carried by a raw request, if it has a usable one
pub fn raw_name(raw: &RawSpec) -> Option<&str> {
    raw.get(RequiredField::Name.key())
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn required_str(raw: &RawSpec, field: RequiredField) -> Result<&str, ValidationError> {
    match raw.get(field.key()) {
        None | Some(Value::Null) => Err(ValidationError::MissingField { field }),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(ValidationError::MissingField { field })
        }
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(ValidationError::InvalidField {
            field,
            found: value_kind(other).to_string(),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawSpec {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_request() {
        let spec = validate(&raw(json!({
            "name": "acme",
            "service_type": "webapp",
            "pricing_plan": "pro",
            "ami_id": "ami-0abc",
            "instance_type": "t3.micro"
        })))
        .unwrap();

        assert_eq!(spec.name, "acme");
        assert_eq!(spec.service_type, ServiceType::Webapp);
        assert_eq!(spec.pricing_plan, PricingPlan::Pro);
        assert_eq!(spec.params.len(), 2);
        assert_eq!(spec.param_str("ami_id"), Some("ami-0abc"));
        assert!(!spec.params.contains_key("name"));
    }

    #[test]
    fn test_missing_name() {
        let err = validate(&raw(json!({
            "service_type": "webapp",
            "pricing_plan": "pro"
        })))
        .unwrap_err();

        assert_eq!(
            err,
            ValidationError::MissingField {
                field: RequiredField::Name
            }
        );
    }

    #[test]
    fn test_first_missing_field_wins() {
        let err = validate(&raw(json!({ "name": "acme" }))).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: RequiredField::ServiceType
            }
        );

        let err = validate(&RawSpec::new()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: RequiredField::Name
            }
        );
    }

    #[test]
    fn test_empty_and_null_count_as_missing() {
        let err = validate(&raw(json!({
            "name": "acme",
            "service_type": "  ",
            "pricing_plan": "pro"
        })))
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: RequiredField::ServiceType
            }
        );

        let err = validate(&raw(json!({
            "name": "acme",
            "service_type": "api",
            "pricing_plan": null
        })))
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: RequiredField::PricingPlan
            }
        );
    }

    #[test]
    fn test_non_string_field_is_invalid() {
        let err = validate(&raw(json!({
            "name": 42,
            "service_type": "api",
            "pricing_plan": "pro"
        })))
        .unwrap_err();

        assert_eq!(
            err,
            ValidationError::InvalidField {
                field: RequiredField::Name,
                found: "number".to_string()
            }
        );
    }

    #[test]
    fn test_raw_name() {
        assert_eq!(raw_name(&raw(json!({ "name": "acme" }))), Some("acme"));
        assert_eq!(raw_name(&raw(json!({ "name": "" }))), None);
        assert_eq!(raw_name(&RawSpec::new()), None);
    }
}
