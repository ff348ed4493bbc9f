//! Deployment request documents
//!
//! A document holds a single request mapping, a list of mappings, or a
//! mapping with a `deployments` list. Requests stay untyped here; the
//! validator decides what is acceptable.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

use super::is_yaml_file;
use crate::models::RawSpec;

/// Load deployment requests from a YAML or JSON file
pub fn load_requests(path: impl AsRef<Path>) -> Result<Vec<RawSpec>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read deployment file: {}", path.display()))?;

    let document: Value = if is_yaml_file(path) {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML deployments: {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON deployments: {}", path.display()))?
    };

    parse_requests(document)
        .with_context(|| format!("Invalid deployment document: {}", path.display()))
}

/// Split a parsed document into individual requests
pub fn parse_requests(document: Value) -> Result<Vec<RawSpec>> {
    match document {
        Value::Object(mut map) => match map.remove("deployments") {
            Some(list) => requests_from_list(list),
            None => Ok(vec![map]),
        },
        Value::Array(_) => requests_from_list(document),
        other => anyhow::bail!("expected a mapping or a list, found {other}"),
    }
}

fn requests_from_list(list: Value) -> Result<Vec<RawSpec>> {
    let Value::Array(items) = list else {
        anyhow::bail!("'deployments' must be a list");
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| -> Result<RawSpec> {
            match item {
                Value::Object(map) => Ok(map),
                other => anyhow::bail!("deployment #{} is not a mapping: {other}", index + 1),
            }
        })
        .collect()
}
