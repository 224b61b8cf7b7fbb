//! Text and JSON access helpers shared by the inference rules.
//!
//! The engine finds many dependencies by serializing a resource's documents to
//! one string and searching that string for other resources' ids and names.
//! It is crude, and it catches references in fields no rule knows about.
//! [`combined_blob`] is the only place that decides what gets searched, so a
//! structured reference walk can replace it without touching the rules.

use crate::models::Resource;
use serde_json::{json, Map, Value};
use std::error::Error;

fn or_empty(value: Option<&Value>) -> Value {
    value.cloned().unwrap_or_else(|| Value::Object(Map::new()))
}

/// Serialize properties and enrichment documents into one searchable string.
pub fn combined_blob(resource: &Resource) -> String {
    let combined = json!({
        "properties": resource.properties,
        "environmentVariables": or_empty(resource.environment_variables.as_ref()),
        "specificConfiguration": or_empty(resource.specific_configuration.as_ref()),
        "networkInfo": or_empty(resource.network_info.as_ref()),
    });
    combined.to_string()
}

/// JSON text of an optional document, "" when absent.
pub fn document_text(value: Option<&Value>) -> String {
    value.map(Value::to_string).unwrap_or_default()
}

/// Every string leaf under `value` with its dotted key path.
///
/// Array elements are addressed by index, e.g. `appSettings.KEY` or
/// `hostNames.0`.
pub fn string_leaves(value: &Value) -> Vec<(String, &str)> {
    let mut leaves = Vec::new();
    collect_leaves(value, String::new(), &mut leaves);
    leaves
}

fn collect_leaves<'a>(value: &'a Value, path: String, out: &mut Vec<(String, &'a str)>) {
    let join = |key: &str| {
        if path.is_empty() {
            key.to_string()
        } else {
            format!("{path}.{key}")
        }
    };
    match value {
        Value::String(s) => out.push((path, s.as_str())),
        Value::Object(map) => {
            for (key, child) in map {
                collect_leaves(child, join(key), out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_leaves(child, join(&i.to_string()), out);
            }
        }
        _ => {}
    }
}

/// Walk object keys. `None` when any step is missing or not an object.
pub fn field<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(key))
}

/// Walk a path starting from a properties map.
pub fn field_in<'a>(map: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    field(map.get(*first)?, rest)
}

/// The array at `path`.
///
/// A missing or `null` field reads as empty. A field of any other type is a
/// schema surprise and returns an error naming the path.
pub fn array_at<'a>(value: Option<&'a Value>, path: &str) -> Result<&'a [Value], Box<dyn Error>> {
    match value {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(other) => Err(format!("expected array at '{path}', found {}", kind_of(other)).into()),
    }
}

/// The string at `path`. Missing or `null` reads as `None`.
pub fn str_at<'a>(value: Option<&'a Value>, path: &str) -> Result<Option<&'a str>, Box<dyn Error>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(format!("expected string at '{path}', found {}", kind_of(other)).into()),
    }
}

/// The object at `path`. Missing or `null` reads as `None`.
pub fn object_at<'a>(
    value: Option<&'a Value>,
    path: &str,
) -> Result<Option<&'a Map<String, Value>>, Box<dyn Error>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(format!("expected object at '{path}', found {}", kind_of(other)).into()),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_blob_contains_all_documents() {
        let mut resource = Resource::new("id1", "app1", "microsoft.web/sites", "rg");
        resource.properties = json!({ "serverFarmId": "/plan" });
        resource.network_info = Some(json!({ "defaultHostName": "app1.azurewebsites.net" }));
        let blob = combined_blob(&resource);
        assert!(blob.contains("/plan"));
        assert!(blob.contains("app1.azurewebsites.net"));
        assert!(blob.contains("\"environmentVariables\":{}"));
    }

    #[test]
    fn test_string_leaves() {
        let value = json!({
            "appSettings": { "A": "one", "N": 5 },
            "hostNames": ["h1", "h2"]
        });
        let leaves = string_leaves(&value);
        assert!(leaves.contains(&("appSettings.A".to_string(), "one")));
        assert!(leaves.contains(&("hostNames.1".to_string(), "h2")));
        assert_eq!(leaves.len(), 3);
    }

    #[test]
    fn test_field_paths() {
        let value = json!({ "a": { "b": { "c": 1 } } });
        assert_eq!(field(&value, &["a", "b", "c"]), Some(&json!(1)));
        assert_eq!(field(&value, &["a", "x"]), None);
        let map = value.as_object().unwrap();
        assert_eq!(field_in(map, &["a", "b"]), Some(&json!({ "c": 1 })));
        assert_eq!(field_in(map, &[]), None);
    }

    #[test]
    fn test_array_at_schema_surprise() {
        let list = json!([1, 2]);
        let text = json!("oops");
        assert_eq!(array_at(Some(&list), "x").unwrap().len(), 2);
        assert!(array_at(None, "x").unwrap().is_empty());
        assert!(array_at(Some(&Value::Null), "x").unwrap().is_empty());
        let err = array_at(Some(&text), "networkProfile.networkInterfaces").unwrap_err();
        assert!(err.to_string().contains("networkProfile.networkInterfaces"));
    }

    #[test]
    fn test_str_and_object_at() {
        let s = json!("v");
        let n = json!(3);
        assert_eq!(str_at(Some(&s), "p").unwrap(), Some("v"));
        assert!(str_at(Some(&n), "p").is_err());
        assert!(object_at(Some(&s), "p").is_err());
        assert!(object_at(None, "p").unwrap().is_none());
    }
}
