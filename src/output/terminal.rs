//! Terminal output utilities.
//!
//! Provides the end-of-run summary table and its formatting helpers.

use super::DiagramInput;
use crate::models::Confidence;
use colored::Colorize;
use itertools::Itertools;

/// Format a value as a quoted, right-aligned field.
///
/// # Arguments
/// * `value` - The value to format
/// * `width` - The minimum width of the field
///
/// # Returns
/// A quoted, right-aligned string
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let quoted = format!("\"{}\"", value.to_string());
    format!("{quoted:>width$}")
}

/// Per-type rows of `(type, resources, confirmed, potential)`, sorted by
/// resource count then type.
pub fn type_counts(input: &DiagramInput<'_>) -> Vec<(String, usize, usize, usize)> {
    let deps = input.dependencies;
    input
        .resources
        .iter()
        .into_group_map_by(|r| r.type_lower())
        .into_iter()
        .map(|(rtype, resources)| {
            let ids = resources.iter().filter_map(|r| r.id.as_deref());
            let (confirmed, potential) = ids.fold((0, 0), |(c, p), id| {
                (
                    c + deps.confirmed(id).map_or(0, |s| s.len()),
                    p + deps.potential(id).map_or(0, |s| s.len()),
                )
            });
            (rtype, resources.len(), confirmed, potential)
        })
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .collect()
}

/// Print the per-type summary table and totals.
pub fn print_summary(input: &DiagramInput<'_>) {
    let rows = type_counts(input);
    let width = rows.iter().map(|r| r.0.len() + 2).max().unwrap_or(10);

    println!(
        "{:<width$} {:>9} {:>9} {:>9}",
        "type".bold(),
        "resources",
        "confirmed",
        "potential"
    );
    for (rtype, resources, confirmed, potential) in &rows {
        println!(
            "{:<width$} {:>9} {:>9} {:>9}",
            format_field(rtype, width),
            resources,
            confirmed,
            potential
        );
    }
    println!(
        "{} resources in {} resource groups, {} confirmed and {} potential dependencies",
        input.resources.len().to_string().green(),
        input.resource_groups.len(),
        input.dependencies.total(Confidence::Confirmed).to_string().green(),
        input.dependencies.total(Confidence::Potential).to_string().yellow()
    );
}
