//! Azure Resource Graph query execution.
//!
//! Handles querying Azure Resource Graph for resources and resource groups.

use super::cli;
use crate::models::{parse_resources, Diagnostics, Resource, ResourceGroup};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;

/// Rows requested per query. Larger inventories are truncated with a warning.
const QUERY_FIRST: &str = "1000";

/// Response envelope of `az graph query`.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct GraphResponse<T> {
    /// Rows returned.
    pub data: Vec<T>,
    /// Token for the next page (if more results available).
    pub skip_token: Option<String>,
    /// Total number of records matching the query.
    pub total_records: Option<u32>,
    /// Count of records in this response.
    #[serde(default)]
    pub count: i32,
}

/// Resource Graph query listing all resources of a subscription.
pub fn resources_query(subscription_id: &str) -> String {
    format!(
        "Resources | where subscriptionId == '{subscription_id}' \
         | project id, name, type, resourceGroup, kind, location, tags, properties"
    )
}

/// Resource Graph query listing the resource groups of a subscription.
pub fn resource_groups_query(subscription_id: &str) -> String {
    format!(
        "ResourceContainers | where type == 'microsoft.resources/subscriptions/resourcegroups' \
         | where subscriptionId == '{subscription_id}' | project name, id"
    )
}

/// Run one Resource Graph query.
///
/// # Arguments
/// * `query` - KQL query text
/// * `subscription_id` - Subscription to scope the query to
///
/// # Returns
/// * `Ok(GraphResponse)` - The parsed response
/// * `Err` - If the CLI call fails or the response is not the expected shape
pub fn run_graph_query<T: DeserializeOwned>(
    query: &str,
    subscription_id: &str,
) -> Result<GraphResponse<T>, Box<dyn Error>> {
    let output = cli::run_az_json(
        &["graph", "query", "-q", query, "--first", QUERY_FIRST],
        Some(subscription_id),
    )?;

    let response: GraphResponse<T> = serde_path_to_error::deserialize(output).map_err(|e| {
        format!(
            "Error parsing graph response: path={} error={}",
            e.path(),
            e
        )
    })?;

    if response.skip_token.is_some() {
        log::warn!(
            "Graph query returned more than {QUERY_FIRST} rows (total={:?}), results truncated",
            response.total_records
        );
    }
    log::info!("got record_count={:3} from az graph query", response.count);
    Ok(response)
}

/// Current subscription id from `az account show`.
pub fn get_subscription_id() -> Result<String, Box<dyn Error>> {
    let value = cli::run_az_json(&["account", "show", "--query", "id"], None)?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("Unexpected az account show output: {value}").into())
}

/// List the resource groups of a subscription.
pub fn list_resource_groups(subscription_id: &str) -> Result<Vec<ResourceGroup>, Box<dyn Error>> {
    let response: GraphResponse<ResourceGroup> =
        run_graph_query(&resource_groups_query(subscription_id), subscription_id)?;
    log::info!("Found {} resource groups", response.data.len());
    Ok(response.data)
}

/// List all resources of a subscription, including `properties`.
///
/// Rows that do not parse are recorded in `diagnostics` and skipped.
pub fn list_resources(
    subscription_id: &str,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<Resource>, Box<dyn Error>> {
    let response: GraphResponse<Value> =
        run_graph_query(&resources_query(subscription_id), subscription_id)?;
    let resources = parse_resources(response.data, diagnostics);
    log::info!("Found {} resources", resources.len());
    Ok(resources)
}
