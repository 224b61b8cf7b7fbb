//! Azure resource and resource group data models.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Empty object returned when `properties` is absent or not an object.
static EMPTY_OBJECT: OnceLock<Map<String, Value>> = OnceLock::new();

/// Deserialize `null` (or a missing key) as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One Azure resource as returned by Resource Graph, optionally enriched.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Full ARM resource id, e.g. `/subscriptions/../resourceGroups/../providers/..`.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Namespaced type, e.g. `microsoft.web/sites`. Compare case-insensitively.
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resource_group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Value>,
    /// Raw type specific properties. Shape varies per type.
    #[serde(default)]
    pub properties: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_info: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_configuration: Option<Value>,
    /// Any other keys returned by the query, kept for snapshot round-trips.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource {
    /// Create a bare resource, mostly useful in tests.
    pub fn new(id: &str, name: &str, resource_type: &str, resource_group: &str) -> Resource {
        Resource {
            id: Some(id.to_string()),
            name: name.to_string(),
            resource_type: Some(resource_type.to_string()),
            resource_group: resource_group.to_string(),
            ..Default::default()
        }
    }

    /// The resource id, or "" when missing.
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }

    /// Lower-cased resource type, or "" when missing.
    pub fn type_lower(&self) -> String {
        self.resource_type
            .as_deref()
            .unwrap_or("")
            .to_ascii_lowercase()
    }

    /// Case-insensitive type comparison.
    pub fn is_type(&self, resource_type: &str) -> bool {
        self.resource_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(resource_type))
    }

    /// Case-insensitive membership test against a list of types.
    pub fn is_any_type(&self, resource_types: &[&str]) -> bool {
        resource_types.iter().any(|t| self.is_type(t))
    }

    /// `properties` as an object. Anything that is not an object reads as empty.
    pub fn properties(&self) -> &Map<String, Value> {
        match &self.properties {
            Value::Object(map) => map,
            _ => EMPTY_OBJECT.get_or_init(Map::new),
        }
    }

    /// True when `properties` is present but not a JSON object.
    pub fn has_malformed_properties(&self) -> bool {
        !matches!(self.properties, Value::Object(_) | Value::Null)
    }

    /// True when any enrichment sub-document is present.
    pub fn is_enriched(&self) -> bool {
        self.network_info.is_some()
            || self.environment_variables.is_some()
            || self.specific_configuration.is_some()
    }
}

/// A resource group container. Resources refer to it by name, not id.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ResourceGroup {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

impl ResourceGroup {
    pub fn new(id: &str, name: &str) -> ResourceGroup {
        ResourceGroup {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}
