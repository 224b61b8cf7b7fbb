//! Markdown dependency report (`<prefix>_report.md`).

use super::{truncate_subscription_id, DiagramInput};
use crate::models::{Confidence, Resource};
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};

/// How many resources the "most dependencies" list shows.
const TOP_RESOURCES: usize = 10;

/// Broad category of a resource type, used to group the overview.
pub fn type_category(resource_type: &str) -> &'static str {
    let t = resource_type.to_ascii_lowercase();
    if t.contains("compute") || t.contains("virtualmachines") {
        "Compute"
    } else if (t.contains("web") && !t.contains("webpubsub")) || t.contains("serverfarms") {
        "Web & App Services"
    } else if t.contains("app/") && t.contains("container")
        || t.contains("managedenvironments")
        || t.contains("containerinstance")
    {
        "Container Apps"
    } else if t.contains("containerregistry") {
        "Container Registry"
    } else if t.contains("storage") {
        "Storage"
    } else if ["sql", "database", "documentdb", "postgresql", "mysql"]
        .iter()
        .any(|k| t.contains(k))
    {
        "Databases"
    } else if t.contains("keyvault") {
        "Security"
    } else if t.contains("insights") {
        "Monitoring"
    } else if t.contains("network") {
        "Networking"
    } else if t.contains("apimanagement") {
        "API Management"
    } else if t.contains("signalr") || t.contains("webpubsub") {
        "Real-time Communication"
    } else if t.contains("servicebus") || t.contains("eventhub") {
        "Messaging"
    } else if t.contains("logic") {
        "Logic Apps"
    } else {
        "Other Services"
    }
}

/// `name (shorttype)`.
fn resource_label(resource: &Resource) -> String {
    let short_type = resource
        .resource_type
        .as_deref()
        .and_then(|t| t.rsplit('/').next())
        .unwrap_or("Unknown");
    format!("{} ({short_type})", resource.name)
}

/// Render the dependency report.
///
/// # Arguments
/// * `input` - Resources, groups and dependencies to describe
/// * `enhanced_resources` - Count of enriched resources, from snapshot metadata
/// * `generated_at` - Timestamp line, omitted when `None`
pub fn generate_dependency_report(
    input: &DiagramInput<'_>,
    enhanced_resources: usize,
    generated_at: Option<&str>,
) -> String {
    let deps = input.dependencies;
    let lookup: HashMap<&str, &Resource> = input
        .resources
        .iter()
        .filter_map(|r| r.id.as_deref().map(|id| (id, r)))
        .collect();
    // Targets missing from the inventory are dropped. A potential pair that
    // is also confirmed is only listed as confirmed.
    let confirmed_of = |id: &str| {
        deps.confirmed(id)
            .into_iter()
            .flatten()
            .filter_map(|t| lookup.get(t.as_str()).copied())
            .collect_vec()
    };
    let potential_of = |id: &str| {
        deps.potential(id)
            .filter(|_| input.include_potential)
            .into_iter()
            .flatten()
            .filter(|t| !deps.is_confirmed(id, t))
            .filter_map(|t| lookup.get(t.as_str()).copied())
            .collect_vec()
    };
    let count_of = |id: &str| (confirmed_of(id).len(), potential_of(id).len());

    let mut lines: Vec<String> = vec!["# Azure Resource Dependency Report".into(), String::new()];
    if let Some(generated_at) = generated_at {
        lines.push(format!("**Generated:** {generated_at}"));
    }
    lines.push(format!(
        "**Subscription:** {}",
        truncate_subscription_id(input.subscription_id)
    ));
    lines.push(String::new());

    lines.push("## Summary".into());
    lines.push(String::new());
    lines.push(format!("- **Total Resources:** {}", input.resources.len()));
    lines.push(format!("- **Resource Groups:** {}", input.resource_groups.len()));
    lines.push(format!(
        "- **Confirmed Dependencies:** {}",
        deps.total(Confidence::Confirmed)
    ));
    lines.push(format!(
        "- **Potential Dependencies:** {}",
        deps.total(Confidence::Potential)
    ));
    lines.push(format!("- **Enhanced Resources:** {enhanced_resources}"));
    lines.push(String::new());

    lines.push("## Resources by Category".into());
    lines.push(String::new());
    let mut by_category: BTreeMap<&str, Vec<&Resource>> = BTreeMap::new();
    for resource in input.resources {
        let category = type_category(resource.resource_type.as_deref().unwrap_or(""));
        by_category.entry(category).or_default().push(resource);
    }
    for (category, resources) in &by_category {
        lines.push(format!("### {category}"));
        lines.push(String::new());
        for resource in resources.iter().sorted_by(|a, b| a.name.cmp(&b.name)) {
            lines.push(format!("- **{}**", resource_label(resource)));
            lines.push(format!(
                "  - Location: {}",
                resource.location.as_deref().unwrap_or("Unknown")
            ));
            lines.push(format!("  - Resource Group: {}", resource.resource_group));
            let (confirmed, potential) = count_of(resource.id.as_deref().unwrap_or(""));
            if confirmed > 0 || potential > 0 {
                lines.push(format!(
                    "  - Dependencies: {confirmed} confirmed, {potential} potential"
                ));
            }
        }
        lines.push(String::new());
    }

    // Resources with at least one dependency, most first, ties by name.
    let ranked = input
        .resources
        .iter()
        .filter_map(|r| {
            let (confirmed, potential) = count_of(r.id.as_deref()?);
            (confirmed + potential > 0).then_some((r, confirmed, potential))
        })
        .sorted_by(|a, b| (b.1 + b.2).cmp(&(a.1 + a.2)).then_with(|| a.0.name.cmp(&b.0.name)))
        .collect_vec();

    lines.push("## Dependency Analysis".into());
    lines.push(String::new());
    if ranked.is_empty() {
        lines.push("No dependencies found.".into());
        lines.push(String::new());
    } else {
        lines.push("### Resources with Most Dependencies".into());
        lines.push(String::new());
        for (resource, confirmed, potential) in ranked.iter().take(TOP_RESOURCES) {
            lines.push(format!(
                "- **{}**: {confirmed} confirmed + {potential} potential = {} total",
                resource_label(resource),
                confirmed + potential
            ));
        }
        lines.push(String::new());

        lines.push("### Detailed Dependencies".into());
        lines.push(String::new());
        for (resource, _, _) in &ranked {
            let id = resource.id();
            lines.push(format!("#### {}", resource_label(resource)));
            lines.push(String::new());
            let confirmed = confirmed_of(id);
            if !confirmed.is_empty() {
                lines.push("**Confirmed Dependencies:**".into());
                lines.extend(confirmed.iter().map(|t| format!("- {}", resource_label(t))));
                lines.push(String::new());
            }
            let potential = potential_of(id);
            if !potential.is_empty() {
                lines.push("**Potential Dependencies:**".into());
                lines.extend(potential.iter().map(|t| format!("- {}", resource_label(t))));
                lines.push(String::new());
            }
        }
    }

    // Resources join their group by name.
    lines.push("## Resource Groups Analysis".into());
    lines.push(String::new());
    let mut by_group: BTreeMap<&str, Vec<&Resource>> = BTreeMap::new();
    for resource in input.resources {
        by_group
            .entry(resource.resource_group.as_str())
            .or_default()
            .push(resource);
    }
    let (mut total_internal, mut total_external) = (0, 0);
    for (group, resources) in &by_group {
        lines.push(format!("### {group}"));
        lines.push(String::new());
        lines.push(format!("**Resources:** {}", resources.len()));
        lines.push(String::new());

        let (internal, external): (Vec<&Resource>, Vec<&Resource>) = resources
            .iter()
            .filter_map(|r| r.id.as_deref())
            .flat_map(|id| confirmed_of(id).into_iter().chain(potential_of(id)))
            .partition(|target| target.resource_group.eq_ignore_ascii_case(group));
        total_internal += internal.len();
        total_external += external.len();
        if !internal.is_empty() || !external.is_empty() {
            lines.push("**Dependencies:**".into());
            lines.push(format!("- Internal (within RG): {}", internal.len()));
            lines.push(format!("- External (cross-RG): {}", external.len()));
            lines.push(String::new());
        }

        lines.push("**Resource Types:**".into());
        let type_counts = resources
            .iter()
            .map(|r| {
                r.resource_type
                    .as_deref()
                    .and_then(|t| t.rsplit('/').next())
                    .unwrap_or("Unknown")
            })
            .counts();
        for (short_type, count) in type_counts.into_iter().sorted() {
            lines.push(format!("- {short_type}: {count}"));
        }
        lines.push(String::new());
    }

    lines.push("## Recommendations".into());
    lines.push(String::new());
    if total_external > total_internal * 2 {
        lines.push(
            "- **Cross-Resource Group Dependencies**: Consider consolidating related resources into the same resource groups".into(),
        );
    }
    if deps.total(Confidence::Potential) > deps.total(Confidence::Confirmed) {
        lines.push(
            "- **Review Potential Dependencies**: Many potential dependencies detected, review them for accuracy".into(),
        );
    }
    let isolated = input
        .resources
        .iter()
        .filter(|r| r.id.as_deref().map_or(true, |id| count_of(id) == (0, 0)))
        .count();
    if isolated * 10 > input.resources.len() * 3 {
        lines.push(
            "- **Isolated Resources**: Many resources appear to have no dependencies, verify that this is intentional".into(),
        );
    }
    lines.push(
        "- **Regular Reviews**: Periodically review dependencies to ensure architecture alignment".into(),
    );
    lines.push(
        "- **Security**: Keep connection strings and secrets in Key Vault".into(),
    );
    lines.push(String::new());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DependencySet, ResourceGroup};
    use crate::processing::types::*;

    #[test]
    fn test_type_category() {
        assert_eq!(type_category(WEB_SITE), "Web & App Services");
        assert_eq!(type_category(WEB_PUBSUB), "Real-time Communication");
        assert_eq!(type_category(CONTAINER_APP), "Container Apps");
        assert_eq!(type_category(CONTAINER_REGISTRY), "Container Registry");
        assert_eq!(type_category(SQL_DATABASE), "Databases");
        assert_eq!(type_category(VIRTUAL_MACHINE), "Compute");
        assert_eq!(type_category(VIRTUAL_NETWORK), "Networking");
        assert_eq!(type_category("microsoft.foo/bar"), "Other Services");
    }

    fn input<'a>(
        resources: &'a [Resource],
        groups: &'a [ResourceGroup],
        deps: &'a DependencySet,
    ) -> DiagramInput<'a> {
        DiagramInput {
            subscription_id: "00000000-1111",
            resources,
            resource_groups: groups,
            dependencies: deps,
            include_potential: true,
        }
    }

    #[test]
    fn test_report_sections() {
        let plan = Resource::new("plan1id", "plan1", SERVER_FARM, "rg1");
        let app = Resource::new("app1id", "app1", WEB_SITE, "rg1");
        let sql = Resource::new("sql1id", "sql1", SQL_SERVER, "rg2");
        let mut deps = DependencySet::new(["plan1id", "app1id", "sql1id"]);
        deps.add_confirmed("app1id", "plan1id");
        deps.add_potential("app1id", "sql1id");
        let resources = vec![plan, app, sql];
        let groups = vec![ResourceGroup::new("rg1id", "rg1"), ResourceGroup::new("rg2id", "rg2")];
        let report = generate_dependency_report(&input(&resources, &groups, &deps), 0, None);

        assert!(report.contains("**Subscription:** 00000000-1..."));
        assert!(report.contains("- **Confirmed Dependencies:** 1"));
        assert!(report.contains("### Web & App Services"));
        assert!(report.contains("- **app1 (sites)**: 1 confirmed + 1 potential = 2 total"));
        assert!(report.contains("#### app1 (sites)"));
        assert!(report.contains("- plan1 (serverfarms)"));
        assert!(report.contains("- sql1 (servers)"));
        assert!(!report.contains("**Generated:**"));
    }

    #[test]
    fn test_dangling_and_overlapping_targets_not_listed() {
        let plan = Resource::new("plan1id", "plan1", SERVER_FARM, "rg1");
        let app = Resource::new("app1id", "app1", WEB_SITE, "rg1");
        let mut deps = DependencySet::new(["plan1id", "app1id"]);
        deps.add_confirmed("app1id", "plan1id");
        deps.add_confirmed("app1id", "/subscriptions/x/gone");
        deps.add_potential("app1id", "plan1id");
        let resources = vec![plan, app];
        let groups = vec![ResourceGroup::new("rg1id", "rg1")];
        let report = generate_dependency_report(&input(&resources, &groups, &deps), 0, None);

        assert!(!report.contains("/subscriptions/x/gone"));
        assert!(!report.contains("**Potential Dependencies:**"));
        assert_eq!(report.matches("- plan1 (serverfarms)").count(), 1);
        assert!(report.contains("- **app1 (sites)**: 1 confirmed + 0 potential = 1 total"));
    }

    #[test]
    fn test_resource_groups_analysis() {
        let plan = Resource::new("plan1id", "plan1", SERVER_FARM, "rg1");
        let app = Resource::new("app1id", "app1", WEB_SITE, "rg1");
        let sql = Resource::new("sql1id", "sql1", SQL_SERVER, "rg2");
        let mut deps = DependencySet::new(["plan1id", "app1id", "sql1id"]);
        deps.add_confirmed("app1id", "plan1id");
        deps.add_potential("app1id", "sql1id");
        let resources = vec![plan, app, sql];
        let groups = vec![ResourceGroup::new("rg1id", "rg1"), ResourceGroup::new("rg2id", "rg2")];
        let report = generate_dependency_report(&input(&resources, &groups, &deps), 0, None);

        let section = report
            .split("## Resource Groups Analysis")
            .nth(1)
            .unwrap();
        let rg1 = section.split("### rg2").next().unwrap();
        assert!(rg1.contains("**Resources:** 2"));
        assert!(rg1.contains("- Internal (within RG): 1"));
        assert!(rg1.contains("- External (cross-RG): 1"));
        assert!(rg1.contains("- serverfarms: 1"));
        assert!(rg1.contains("- sites: 1"));
        let rg2 = section.split("### rg2").nth(1).unwrap();
        assert!(rg2.contains("**Resources:** 1"));
        assert!(!rg2.split("## Recommendations").next().unwrap().contains("Internal"));
    }

    #[test]
    fn test_recommendations() {
        let a = Resource::new("a", "alpha", SQL_SERVER, "rg1");
        let b = Resource::new("b", "bravo", SQL_SERVER, "rg2");
        let c = Resource::new("c", "charlie", SQL_SERVER, "rg3");
        let d = Resource::new("d", "delta", SQL_SERVER, "rg4");
        let mut deps = DependencySet::new(["a", "b", "c", "d"]);
        deps.add_potential("a", "b");
        let resources = vec![a, b, c, d];
        let groups = Vec::new();
        let report = generate_dependency_report(&input(&resources, &groups, &deps), 0, None);

        let section = report.split("## Recommendations").nth(1).unwrap();
        assert!(section.contains("**Cross-Resource Group Dependencies**"));
        assert!(section.contains("**Review Potential Dependencies**"));
        assert!(section.contains("**Isolated Resources**"));
        assert!(section.contains("**Regular Reviews**"));

        let mut deps = DependencySet::new(["a", "b", "c", "d"]);
        for (source, target) in [("a", "b"), ("b", "c"), ("c", "d"), ("d", "a")] {
            deps.add_confirmed(source, target);
        }
        let report = generate_dependency_report(&input(&resources, &groups, &deps), 0, None);
        let section = report.split("## Recommendations").nth(1).unwrap();
        assert!(!section.contains("**Review Potential Dependencies**"));
        assert!(!section.contains("**Isolated Resources**"));
    }
}
