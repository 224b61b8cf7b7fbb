//! Azure resource dependency graph.
//!
//! Discovers the resources of a subscription, infers which depend on which,
//! and renders the result as a Mermaid diagram and a Markdown report.
//!
//! # Modules
//! - [`azure`] - Azure CLI interaction, enrichment and snapshot cache
//! - [`models`] - Data structures for resources, dependencies and snapshots
//! - [`processing`] - The dependency inference engine
//! - [`output`] - Diagram, report and terminal rendering
//! - [`config`] - Run configuration

pub mod azure;
pub mod config;
pub mod models;
pub mod output;
pub mod processing;

use config::Config;
use models::{Catalog, DependencySet, Diagnostics, Resource, ResourceGroup, Snapshot};
use output::DiagramInput;
use processing::{LoginServerLookup, MatchSettings};
use std::error::Error;

/// Build the catalog and infer dependencies for a list of resources.
///
/// Resources without `id` or `type` are left out of the returned set and
/// recorded in `diagnostics`.
pub fn analyze(
    resources: &[Resource],
    lookup: &mut dyn LoginServerLookup,
    settings: &MatchSettings,
    diagnostics: &mut Diagnostics,
) -> DependencySet {
    let catalog = Catalog::build(resources, diagnostics);
    processing::infer_dependencies(&catalog, lookup, settings, diagnostics)
}

/// Analyze already fetched data and assemble a snapshot.
#[allow(clippy::too_many_arguments)]
pub fn build_snapshot(
    subscription_id: &str,
    resources: Vec<Resource>,
    resource_groups: Vec<ResourceGroup>,
    lookup: &mut dyn LoginServerLookup,
    settings: &MatchSettings,
    enhanced_mode: bool,
    generated_at: Option<String>,
    diagnostics: &mut Diagnostics,
) -> Snapshot {
    let dependencies = analyze(&resources, lookup, settings, diagnostics);
    Snapshot::new(
        subscription_id,
        resources,
        resource_groups,
        dependencies,
        enhanced_mode,
        diagnostics.len(),
        generated_at,
    )
}

/// Query Azure, optionally enrich, and analyze.
///
/// # Returns
/// * `Ok(Snapshot)` - Inventory plus inferred dependencies
/// * `Err` - If `az` is unusable, or the subscription or the inventory
///   cannot be read at all
pub fn discover(config: &Config, diagnostics: &mut Diagnostics) -> Result<Snapshot, Box<dyn Error>> {
    azure::check_az_cli()?;
    let subscription_id = match &config.subscription_id {
        Some(id) => id.clone(),
        None => azure::get_subscription_id()?,
    };
    log::info!("Analyzing subscription: {subscription_id}");

    let resource_groups = azure::list_resource_groups(&subscription_id)?;
    let mut resources = azure::list_resources(&subscription_id, diagnostics)?;

    let enhanced_mode = !config.basic_mode;
    if enhanced_mode {
        let mut enricher = azure::AzCliEnricher::default();
        azure::enrich_resources(&mut resources, &mut enricher, &subscription_id, diagnostics);
    } else {
        log::info!("Basic mode, skipping resource enrichment");
    }

    let generated_at = chrono::Utc::now()
        .with_timezone(&config.timezone)
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string();
    let mut lookup = azure::AzCliLoginServers::new(&subscription_id);
    Ok(build_snapshot(
        &subscription_id,
        resources,
        resource_groups,
        &mut lookup,
        &config.match_settings,
        enhanced_mode,
        Some(generated_at),
        diagnostics,
    ))
}

/// Write the Markdown outputs enabled in `config`.
pub fn write_outputs(snapshot: &Snapshot, config: &Config) -> Result<(), Box<dyn Error>> {
    let input = DiagramInput::from_snapshot(snapshot, config.include_potential);
    let generated_at = snapshot.metadata.generated_at.as_deref();

    if config.write_markdown {
        let path = config.markdown_path();
        std::fs::write(&path, output::markdown_document(&input, generated_at))
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        log::info!("Mermaid diagram written to {}", path.display());
    }
    if config.write_report {
        let path = config.report_path();
        let report = output::generate_dependency_report(
            &input,
            snapshot.metadata.enhanced_resources,
            generated_at,
        );
        std::fs::write(&path, report)
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        log::info!("Dependency report written to {}", path.display());
    }
    Ok(())
}

/// One full run: snapshot (cached or discovered), outputs, summaries.
pub fn run(config: &Config) -> Result<Snapshot, Box<dyn Error>> {
    let mut diagnostics = Diagnostics::new();
    let (snapshot, cached) =
        azure::read_snapshot_cache(&config.snapshot_path(), config.use_snapshot, || {
            discover(config, &mut diagnostics)
        })?;
    if cached {
        log::info!(
            "Rendering {} resources from snapshot",
            snapshot.metadata.total_resources
        );
    }

    write_outputs(&snapshot, config)?;
    output::print_summary(&DiagramInput::from_snapshot(
        &snapshot,
        config.include_potential,
    ));
    diagnostics.print_summary();
    Ok(snapshot)
}
