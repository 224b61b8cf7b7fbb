//! Output rendering for the dependency graph.
//!
//! This module renders a snapshot for people:
//! - [`mermaid`] - Mermaid diagram wrapped in a Markdown document
//! - [`report`] - Markdown dependency report
//! - [`terminal`] - Terminal summary with colors

pub mod mermaid;
pub mod report;
pub mod terminal;

use crate::models::{DependencySet, Resource, ResourceGroup, Snapshot};

/// Everything a renderer reads. Renderers never mutate it.
#[derive(Debug, Clone, Copy)]
pub struct DiagramInput<'a> {
    pub subscription_id: &'a str,
    pub resources: &'a [Resource],
    pub resource_groups: &'a [ResourceGroup],
    pub dependencies: &'a DependencySet,
    pub include_potential: bool,
}

impl<'a> DiagramInput<'a> {
    pub fn from_snapshot(snapshot: &'a Snapshot, include_potential: bool) -> DiagramInput<'a> {
        DiagramInput {
            subscription_id: &snapshot.subscription_id,
            resources: &snapshot.resources,
            resource_groups: &snapshot.resource_groups,
            dependencies: &snapshot.dependencies,
            include_potential,
        }
    }
}

/// Subscription id shortened for titles: first 10 characters and `...`.
pub fn truncate_subscription_id(subscription_id: &str) -> String {
    let head: String = subscription_id.chars().take(10).collect();
    format!("{head}...")
}

pub use mermaid::{generate_mermaid_diagram, markdown_document};
pub use report::generate_dependency_report;
pub use terminal::{format_field, print_summary};
