//! Dependency inference engine.
//!
//! Consumes a [`Catalog`] and produces a [`DependencySet`] in four phases:
//! - [`id_match`] - confirmed: another resource's id appears verbatim
//! - [`rules`] - confirmed: type-specific property references
//! - [`fuzzy`] and [`heuristics`] - potential: names in settings and hostnames
//! - [`implicit`] - potential: fixed type pairs
//!
//! Rule failures are recorded in [`Diagnostics`] and never abort inference.

pub mod blob;
pub mod fuzzy;
pub mod heuristics;
pub mod id_match;
pub mod implicit;
pub mod lookup;
pub mod rules;
pub mod types;

use crate::models::{Catalog, Confidence, DependencySet, Diagnostics};

pub use fuzzy::MatchSettings;
pub use lookup::{CatalogLoginServers, LoginServerLookup};
use rules::RuleContext;

/// Infer confirmed and potential dependencies for every catalog resource.
///
/// # Arguments
/// * `catalog` - The resources to analyse (read-only)
/// * `lookup` - Registry login server lookup used by the container app rule
/// * `settings` - Fuzzy name matching tunables
/// * `diagnostics` - Collector for rule failures
///
/// # Returns
/// A [`DependencySet`] with an entry for every catalog id, possibly empty.
pub fn infer_dependencies(
    catalog: &Catalog,
    lookup: &mut dyn LoginServerLookup,
    settings: &MatchSettings,
    diagnostics: &mut Diagnostics,
) -> DependencySet {
    let mut deps = DependencySet::new(catalog.ids());
    log::info!("Analyzing dependencies for {} resources", catalog.len());
    log::debug!(
        "type rules registered for: {}",
        rules::supported_types().join(", ")
    );

    // Phase 1
    for resource in catalog.iter() {
        for target in id_match::ids_referenced_by(resource, catalog) {
            deps.add_confirmed(resource.id(), target);
        }
    }
    log::debug!(
        "phase 1 id containment: {} confirmed",
        deps.total(Confidence::Confirmed)
    );

    // Phase 2
    let mut ctx = RuleContext {
        catalog,
        lookup,
        diagnostics,
    };
    for resource in catalog.iter() {
        for rule in rules::rules_for(&resource.type_lower()) {
            match (rule.apply)(resource, &mut ctx) {
                Ok(targets) => {
                    for target in targets {
                        deps.add_confirmed(resource.id(), &target);
                    }
                }
                Err(e) => ctx.diagnostics.record(
                    Some(resource.id()),
                    &format!("rule:{}", rule.name),
                    e.to_string(),
                ),
            }
        }
    }
    let diagnostics = ctx.diagnostics;
    log::debug!(
        "phase 2 type rules: {} confirmed",
        deps.total(Confidence::Confirmed)
    );

    // Phase 3
    for resource in catalog.iter() {
        for target in fuzzy::potential_from_settings(resource, catalog, settings) {
            deps.add_potential(resource.id(), &target);
        }
        for heuristic in heuristics::heuristics_for(&resource.type_lower()) {
            match (heuristic.apply)(resource, catalog, settings) {
                Ok(targets) => {
                    for target in targets {
                        deps.add_potential(resource.id(), &target);
                    }
                }
                Err(e) => diagnostics.record(
                    Some(resource.id()),
                    &format!("heuristic:{}", heuristic.name),
                    e.to_string(),
                ),
            }
        }
    }

    // Phase 4
    for resource in catalog.iter() {
        for target in implicit::implicit_targets(resource, catalog) {
            deps.add_potential(resource.id(), target);
        }
    }

    log::info!(
        "Discovered {} confirmed and {} potential dependencies",
        deps.total(Confidence::Confirmed),
        deps.total(Confidence::Potential)
    );
    deps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Resource;
    use serde_json::json;
    use types::*;

    fn infer(resources: &[Resource]) -> (DependencySet, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let catalog = Catalog::build(resources, &mut diagnostics);
        let deps = infer_dependencies(
            &catalog,
            &mut CatalogLoginServers,
            &MatchSettings::default(),
            &mut diagnostics,
        );
        (deps, diagnostics)
    }

    #[test]
    fn test_plan_and_web_app() {
        let plan = Resource::new("plan1id", "plan1", SERVER_FARM, "rg");
        let mut app = Resource::new("app1id", "app1", WEB_SITE, "rg");
        app.properties = json!({ "serverFarmId": "plan1id" });
        let (deps, _) = infer(&[plan, app]);
        assert_eq!(
            deps.confirmed("app1id").unwrap().iter().collect::<Vec<_>>(),
            vec!["plan1id"]
        );
        assert!(deps.confirmed("plan1id").unwrap().is_empty());
    }

    #[test]
    fn test_rule_error_is_recorded_not_fatal() {
        let mut vm = Resource::new("vm", "vm-one", VIRTUAL_MACHINE, "rg");
        vm.properties = json!({ "networkProfile": { "networkInterfaces": 7 } });
        let mut app = Resource::new("app", "app-one", WEB_SITE, "rg");
        app.properties = json!({ "serverFarmId": "plan" });
        let plan = Resource::new("plan", "plan-one", SERVER_FARM, "rg");
        let (deps, diagnostics) = infer(&[vm, app, plan]);
        assert_eq!(diagnostics.in_context("rule:vm_network_interfaces").count(), 1);
        assert!(deps.is_confirmed("app", "plan"));
        assert!(deps.confirmed("vm").unwrap().is_empty());
    }

    #[test]
    fn test_implicit_and_confirmed_overlap_allowed() {
        let mut env = Resource::new("env", "env1", MANAGED_ENVIRONMENT, "rg");
        env.properties = json!({ "appInsights": "ai" });
        let ai = Resource::new("ai", "insights", APP_INSIGHTS, "rg");
        let (deps, _) = infer(&[env, ai]);
        assert!(deps.is_confirmed("env", "ai"));
        assert!(deps.potential("env").unwrap().contains("ai"));
    }
}
