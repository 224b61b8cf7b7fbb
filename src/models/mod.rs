//! Domain models for the Azure resource graph.
//!
//! This module contains the core data structures used throughout the application:
//! - [`Resource`] and [`ResourceGroup`] - inventory records
//! - [`Catalog`] - the read-only resource set one inference run works on
//! - [`DependencySet`] - confirmed and potential dependency edges
//! - [`Diagnostics`] - per-run collector of non-fatal problems
//! - [`Snapshot`] - persisted result of one run

mod catalog;
mod dependency;
mod diagnostics;
mod resource;
mod snapshot;

// Re-export public types
pub use catalog::{parse_resources, Catalog};
pub use dependency::{Confidence, DependencyEdge, DependencySet};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use resource::{Resource, ResourceGroup};
pub use snapshot::{load_snapshot, save_snapshot, Snapshot, SnapshotMetadata};
