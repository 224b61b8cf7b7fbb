//! Azure CLI and Graph API interaction.
//!
//! This module handles all Azure-related operations:
//! - [`cli`] - Command execution for Azure CLI
//! - [`graph`] - Azure Resource Graph queries for resources and groups
//! - [`enrich`] - Per-resource detail beyond the inventory query
//! - [`registry`] - Container registry login server lookups
//! - [`cache`] - Snapshot reuse between runs

pub mod cache;
pub mod cli;
pub mod enrich;
pub mod graph;
pub mod registry;

// Re-export public types and functions
pub use cache::read_snapshot_cache;
pub use cli::check_az_cli;
pub use enrich::{enrich_resources, AzCliEnricher, Enricher, Enrichment};
pub use graph::{get_subscription_id, list_resource_groups, list_resources};
pub use registry::AzCliLoginServers;
