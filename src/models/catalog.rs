//! Resource catalog: the read-only set of resources one inference run works on.

use super::{Diagnostics, Resource};
use serde_json::Value;
use std::collections::HashMap;

/// Resources keyed by id, in insertion order.
///
/// Only resources carrying both `id` and `type` are admitted. A duplicate id
/// replaces the earlier entry in place (last write wins) and is recorded as a
/// diagnostic.
#[derive(Debug, Default)]
pub struct Catalog {
    resources: Vec<Resource>,
    index: HashMap<String, usize>,
    /// Lower-cased id -> position, for case-insensitive reference resolution.
    index_lower: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from resource records.
    ///
    /// # Arguments
    /// * `resources` - Resources as returned by the inventory (and enrichment)
    /// * `diagnostics` - Collector for skipped and duplicate resources
    pub fn build(resources: &[Resource], diagnostics: &mut Diagnostics) -> Catalog {
        let mut catalog = Catalog::default();

        for resource in resources {
            let id = match resource.id.as_deref() {
                Some(id) if !id.is_empty() => id,
                _ => {
                    diagnostics.record(
                        None,
                        "catalog",
                        format!("resource '{}' has no id, excluded", resource.name),
                    );
                    continue;
                }
            };
            if resource.resource_type.as_deref().map_or(true, str::is_empty) {
                diagnostics.record(Some(id), "catalog", "resource has no type, excluded");
                continue;
            }
            if resource.has_malformed_properties() {
                diagnostics.record(
                    Some(id),
                    "catalog",
                    "properties is not an object, treated as empty",
                );
            }

            match catalog.index.get(id) {
                Some(&pos) => {
                    diagnostics.record(Some(id), "catalog", "duplicate id, later entry wins");
                    catalog.resources[pos] = resource.clone();
                }
                None => {
                    let pos = catalog.resources.len();
                    catalog.index.insert(id.to_string(), pos);
                    catalog.index_lower.insert(id.to_ascii_lowercase(), pos);
                    catalog.resources.push(resource.clone());
                }
            }
        }

        log::info!(
            "Catalog built: {} of {} resources admitted",
            catalog.len(),
            resources.len()
        );
        catalog
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(Resource::id)
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.index.get(id).map(|&pos| &self.resources[pos])
    }

    /// Resources of one type (case-insensitive).
    pub fn of_type<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a Resource> {
        self.resources
            .iter()
            .filter(move |r| r.is_type(resource_type))
    }

    /// Resources whose type is any of `resource_types`.
    pub fn of_types<'a>(
        &'a self,
        resource_types: &'a [&'a str],
    ) -> impl Iterator<Item = &'a Resource> {
        self.resources
            .iter()
            .filter(move |r| r.is_any_type(resource_types))
    }

    /// Map a resource reference onto the catalog's canonical id.
    ///
    /// ARM ids are case-insensitive, so `/Microsoft.Web/serverFarms/x` and
    /// `/microsoft.web/serverfarms/x` name the same resource. References not
    /// found in the catalog come back unchanged.
    pub fn resolve_id(&self, reference: &str) -> String {
        let reference = reference.trim();
        if self.index.contains_key(reference) {
            return reference.to_string();
        }
        match self.index_lower.get(&reference.to_ascii_lowercase()) {
            Some(&pos) => self.resources[pos].id().to_string(),
            None => reference.to_string(),
        }
    }
}

/// Parse raw inventory rows into resources.
///
/// Rows that cannot be parsed are logged with their JSON path and skipped.
pub fn parse_resources(rows: Vec<Value>, diagnostics: &mut Diagnostics) -> Vec<Resource> {
    let mut resources = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        let id = row.get("id").and_then(Value::as_str).map(str::to_string);
        match serde_path_to_error::deserialize::<_, Resource>(row) {
            Ok(resource) => resources.push(resource),
            Err(e) => diagnostics.record(
                id.as_deref(),
                "inventory",
                format!("row #{i} not parsed: path={} error={}", e.path(), e.inner()),
            ),
        }
    }
    resources
}
