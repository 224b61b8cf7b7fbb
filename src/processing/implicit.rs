//! Phase 4: implicit type-pair potential dependencies.
//!
//! Some resource types almost always relate to another type without any
//! property pointing at it. Every resource of the source type gets a potential
//! edge to every resource of the target type, regardless of group or name.

use super::types::*;
use crate::models::{Catalog, Resource};

/// (source type, target type) pairs.
pub const IMPLICIT_PAIRS: &[(&str, &str)] = &[
    (DASHBOARD, APP_INSIGHTS),
    (MANAGED_ENVIRONMENT, APP_INSIGHTS),
];

/// Implicit targets of `resource`.
pub fn implicit_targets<'a>(resource: &Resource, catalog: &'a Catalog) -> Vec<&'a str> {
    IMPLICIT_PAIRS
        .iter()
        .filter(|(source_type, _)| resource.is_type(source_type))
        .flat_map(|(_, target_type)| catalog.of_type(target_type))
        .map(Resource::id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Diagnostics;

    #[test]
    fn test_dashboard_links_every_insights() {
        let dashboard = Resource::new("dash", "dash", "Microsoft.Portal/dashboards", "rg1");
        let mut diagnostics = Diagnostics::new();
        let catalog = Catalog::build(
            &[
                dashboard.clone(),
                Resource::new("ai1", "ai1", APP_INSIGHTS, "rg1"),
                Resource::new("ai2", "ai2", APP_INSIGHTS, "other-rg"),
                Resource::new("web", "web", WEB_SITE, "rg1"),
            ],
            &mut diagnostics,
        );
        assert_eq!(implicit_targets(&dashboard, &catalog), vec!["ai1", "ai2"]);
        let web = catalog.get("web").unwrap();
        assert!(implicit_targets(web, &catalog).is_empty());
    }
}
