//! Persisted snapshot of one discovery run.
//!
//! The JSON shape is shared with the renderers: loading a saved snapshot and
//! rendering it again must give the same diagrams.

use super::{DependencySet, Resource, ResourceGroup};
use super::dependency::Confidence;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::Path;

/// Counts and mode flags stored alongside the data.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SnapshotMetadata {
    pub enhanced_mode: bool,
    pub total_resources: usize,
    pub total_confirmed_dependencies: usize,
    pub total_potential_dependencies: usize,
    pub enhanced_resources: usize,
    #[serde(default)]
    pub diagnostics: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub subscription_id: String,
    pub resources: Vec<Resource>,
    pub resource_groups: Vec<ResourceGroup>,
    #[serde(flatten)]
    pub dependencies: DependencySet,
    #[serde(default)]
    pub metadata: SnapshotMetadata,
}

impl Snapshot {
    /// Assemble a snapshot and compute its metadata.
    pub fn new(
        subscription_id: &str,
        resources: Vec<Resource>,
        resource_groups: Vec<ResourceGroup>,
        dependencies: DependencySet,
        enhanced_mode: bool,
        diagnostics: usize,
        generated_at: Option<String>,
    ) -> Snapshot {
        let metadata = SnapshotMetadata {
            enhanced_mode,
            total_resources: resources.len(),
            total_confirmed_dependencies: dependencies.total(Confidence::Confirmed),
            total_potential_dependencies: dependencies.total(Confidence::Potential),
            enhanced_resources: if enhanced_mode {
                resources.iter().filter(|r| r.is_enriched()).count()
            } else {
                0
            },
            diagnostics,
            generated_at,
        };
        Snapshot {
            subscription_id: subscription_id.to_string(),
            resources,
            resource_groups,
            dependencies,
            metadata,
        }
    }
}

/// Write a snapshot as pretty JSON.
pub fn save_snapshot(snapshot: &Snapshot, path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(snapshot)
        .map_err(|e| format!("Error serializing snapshot: {e}"))?;
    std::fs::write(path, json)
        .map_err(|e| format!("Error writing snapshot {}: {e}", path.display()))?;
    log::info!("Snapshot written to {}", path.display());
    Ok(())
}

/// Read a snapshot, reporting the JSON path of any parse error.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, Box<dyn Error>> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading snapshot {}: {e}", path.display()))?;
    let mut deserializer = serde_json::Deserializer::from_str(&json);
    let snapshot: Snapshot = serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        format!(
            "Error parsing snapshot {}: path={} error={}",
            path.display(),
            e.path(),
            e
        )
    })?;
    log::info!(
        "Snapshot loaded from {}: {} resources",
        path.display(),
        snapshot.resources.len()
    );
    Ok(snapshot)
}
