//! YAML payload extraction and flattening into limit maps.

use std::collections::BTreeMap;

use audit_core::{Error, LimitMap, LimitValue, Result};
use serde_yaml::{Mapping, Value};

use crate::rules;

/// Which flattened keys to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFilter {
    /// Keep every scalar leaf.
    All,
    /// Keep leaves whose own key passes [`rules::is_limit_key`].
    LimitKeysOnly,
}

/// Picks the structured document of a config object: the first key ending in
/// `.yaml`/`.yml`, else the first entry that parses as a YAML mapping.
pub fn select_structured_entry(data: &BTreeMap<String, String>) -> Option<(&str, &str)> {
    if let Some((key, text)) = data.iter().find(|(k, _)| rules::is_structured_key(k)) {
        return Some((key.as_str(), text.as_str()));
    }

    data.iter()
        .find(|(_, text)| parses_as_mapping(text))
        .map(|(k, v)| (k.as_str(), v.as_str()))
}

/// Whether `text` is a non-empty YAML mapping.
pub fn parses_as_mapping(text: &str) -> bool {
    matches!(
        serde_yaml::from_str::<Value>(text),
        Ok(Value::Mapping(ref m)) if !m.is_empty()
    )
}

/// Parses a document that must be a YAML mapping. An empty document is an empty mapping.
pub fn parse_mapping(source_name: &str, text: &str) -> Result<Mapping> {
    if text.trim().is_empty() {
        return Ok(Mapping::new());
    }

    match serde_yaml::from_str::<Value>(text) {
        Ok(Value::Mapping(mapping)) => Ok(mapping),
        Ok(Value::Null) => Ok(Mapping::new()),
        Ok(other) => Err(Error::parse_failure(
            source_name,
            format!("expected a mapping, found {}", kind_name(&other)),
        )),
        Err(e) => Err(Error::parse_failure(source_name, e.to_string())),
    }
}

/// Key of a mapping entry as a string. Numeric keys (tenant `12345`) are stringified.
pub fn key_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Converts a scalar YAML value. Collections and nulls have no limit value.
pub fn scalar_value(value: &Value) -> Option<LimitValue> {
    match value {
        Value::Number(n) => n.as_f64().map(LimitValue::Number),
        Value::String(s) => Some(LimitValue::coerce(s)),
        Value::Bool(b) => Some(LimitValue::Bool(*b)),
        Value::Tagged(tagged) => scalar_value(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Looks up a section by name.
pub fn section<'a>(mapping: &'a Mapping, name: &str) -> Option<&'a Mapping> {
    mapping
        .get(Value::String(name.to_string()))
        .and_then(Value::as_mapping)
}

/// Flattens nested mappings into dotted keys under an optional prefix.
pub fn flatten(prefix: Option<&str>, mapping: &Mapping, filter: KeyFilter) -> LimitMap {
    let mut out = LimitMap::new();
    flatten_into(prefix, mapping, filter, &mut out);
    out
}

fn flatten_into(prefix: Option<&str>, mapping: &Mapping, filter: KeyFilter, out: &mut LimitMap) {
    for (key, value) in mapping {
        let Some(key) = key_string(key) else {
            continue;
        };
        let full_key = match prefix {
            Some(p) => format!("{}.{}", p, key),
            None => key.clone(),
        };

        match value {
            Value::Mapping(nested) => flatten_into(Some(&full_key), nested, filter, out),
            other => {
                if filter == KeyFilter::LimitKeysOnly && !rules::is_limit_key(&key) {
                    continue;
                }
                if let Some(v) = scalar_value(other) {
                    out.insert(full_key, v);
                }
            }
        }
    }
}

/// Top-level scalar entries passing the limit-key predicate, skipping `excluded` sections.
pub fn hoisted_scalars(mapping: &Mapping, excluded: &[&str]) -> LimitMap {
    mapping
        .iter()
        .filter_map(|(k, v)| {
            let key = key_string(k)?;
            if excluded.contains(&key.as_str()) || !rules::is_limit_key(&key) {
                return None;
            }
            scalar_value(v).map(|value| (key, value))
        })
        .collect()
}

/// Tenant-keyed overrides section: `{tenant: {limit: value}}`.
pub fn tenant_overrides(section: &Mapping) -> BTreeMap<String, LimitMap> {
    section
        .iter()
        .filter_map(|(tenant, limits)| {
            let tenant = key_string(tenant)?;
            let limits = match limits {
                Value::Mapping(m) => flatten(None, m, KeyFilter::All),
                // `tenant: {}` written as `tenant:` still declares the tenant.
                Value::Null => LimitMap::new(),
                _ => return None,
            };
            Some((tenant, limits))
        })
        .collect()
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
