//! Mermaid `graph TD` rendering.
//!
//! Layout: subscription node, one node per resource group, resources grouped
//! by type under their group, then confirmed (`-->`) and potential (`-.->`)
//! dependency edges. Edges whose endpoints are not rendered are dropped.

use super::{truncate_subscription_id, DiagramInput};
use crate::models::{Confidence, Resource};
use crate::processing::types::*;
use itertools::Itertools;
use std::collections::{BTreeSet, HashMap};

const SUBSCRIPTION_NODE: &str = "A";

/// Types listed first, in this order. Other types follow alphabetically.
const TYPE_ORDER: &[&str] = &[
    CONTAINER_APP,
    MANAGED_ENVIRONMENT,
    WEB_SITE,
    SERVER_FARM,
    "microsoft.web/staticsites",
    CONTAINER_REGISTRY,
    KEY_VAULT,
    POSTGRES_FLEXIBLE,
    COSMOS_ACCOUNT,
    STORAGE_ACCOUNT,
    SERVICE_BUS,
    WEB_PUBSUB,
    APP_INSIGHTS,
    "microsoft.insights/actiongroups",
    METRIC_ALERT,
    "microsoft.operationalinsights/workspaces",
    API_MANAGEMENT,
    "microsoft.network/networkwatchers",
    DASHBOARD,
    "microsoft.logic/workflows",
    "microsoft.eventgrid/systemtopics",
];

const TYPE_NAMES: &[(&str, &str)] = &[
    (CONTAINER_APP, "Container App"),
    (MANAGED_ENVIRONMENT, "Container App Environment"),
    (WEB_SITE, "Web App"),
    (SERVER_FARM, "App Service Plan"),
    ("microsoft.web/staticsites", "Static Site"),
    (CONTAINER_REGISTRY, "Container Registry"),
    (CONTAINER_GROUP, "Container Instance"),
    (KEY_VAULT, "Key Vault"),
    (POSTGRES_FLEXIBLE, "PostgreSQL"),
    (POSTGRES_SERVER, "PostgreSQL"),
    (MYSQL_FLEXIBLE, "MySQL Server"),
    (MYSQL_SERVER, "MySQL Server"),
    (SQL_SERVER, "SQL Server"),
    (SQL_DATABASE, "SQL Database"),
    (COSMOS_ACCOUNT, "Cosmos DB"),
    (STORAGE_ACCOUNT, "Storage Account"),
    (SERVICE_BUS, "Service Bus"),
    (EVENT_HUB, "Event Hub"),
    (REDIS, "Redis Cache"),
    (WEB_PUBSUB, "Web PubSub"),
    (SIGNALR, "SignalR Service"),
    (APP_INSIGHTS, "App Insights"),
    ("microsoft.insights/actiongroups", "Action Group"),
    (METRIC_ALERT, "Metric Alert"),
    (AUTOSCALE_SETTING, "Autoscale Setting"),
    ("microsoft.operationalinsights/workspaces", "Log Analytics"),
    (API_MANAGEMENT, "API Management"),
    ("microsoft.network/networkwatchers", "Network Watcher"),
    (VIRTUAL_NETWORK, "Virtual Network"),
    (NETWORK_INTERFACE, "Network Interface"),
    ("microsoft.network/networksecuritygroups", "Network Security Group"),
    (PUBLIC_IP, "Public IP"),
    ("microsoft.network/applicationgateways", "Application Gateway"),
    (LOAD_BALANCER, "Load Balancer"),
    (DASHBOARD, "Dashboard"),
    ("microsoft.logic/workflows", "Logic App"),
    ("microsoft.eventgrid/systemtopics", "Event Grid"),
    (VIRTUAL_MACHINE, "Virtual Machine"),
    (VM_SCALE_SET, "VM Scale Set"),
    ("microsoft.containerservice/managedclusters", "AKS Cluster"),
];

/// Capitalised last segment of a type, e.g. `Storageaccounts`.
fn short_type_name(resource_type: &str) -> String {
    let last = resource_type.rsplit('/').next().unwrap_or(resource_type);
    let mut chars = last.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Human readable type label, refined by `kind` for sites, storage and Cosmos.
pub fn display_name(resource: &Resource) -> String {
    let rtype = resource.type_lower();
    let kind = resource.kind.as_deref().unwrap_or("").to_ascii_lowercase();

    if rtype == WEB_SITE && !kind.is_empty() {
        if kind.contains("functionapp") {
            return "Function App".to_string();
        } else if kind.contains("api") {
            return "API App".to_string();
        } else if kind.contains("container") {
            return "Container Web App".to_string();
        } else if kind.contains("linux") {
            return "Linux Web App".to_string();
        }
    } else if rtype == STORAGE_ACCOUNT {
        match kind.as_str() {
            "blobstorage" => return "Blob Storage".to_string(),
            "filestorage" => return "File Storage".to_string(),
            "blockblobstorage" => return "Block Blob Storage".to_string(),
            k if k.contains("storagev2") => return "Storage Account v2".to_string(),
            _ => {}
        }
    } else if rtype == COSMOS_ACCOUNT {
        match kind.as_str() {
            "mongodb" => return "Cosmos DB (MongoDB)".to_string(),
            "cassandra" => return "Cosmos DB (Cassandra)".to_string(),
            "gremlin" => return "Cosmos DB (Gremlin)".to_string(),
            "table" => return "Cosmos DB (Table)".to_string(),
            _ => {}
        }
    }

    TYPE_NAMES
        .iter()
        .find(|(t, _)| *t == rtype)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| short_type_name(&rtype))
}

/// Mermaid labels are double-quoted; embedded quotes become entities.
fn escape_label(text: &str) -> String {
    text.replace('"', "#quot;")
}

fn type_rank(resource_type: &str) -> usize {
    TYPE_ORDER
        .iter()
        .position(|t| *t == resource_type)
        .unwrap_or(TYPE_ORDER.len())
}

/// Generate the Mermaid diagram text.
///
/// Output depends only on the input, so a reloaded snapshot renders the
/// same diagram as the run that produced it.
pub fn generate_mermaid_diagram(input: &DiagramInput<'_>) -> String {
    let mut mermaid = String::from("graph TD;\n");
    mermaid += &format!(
        "    {SUBSCRIPTION_NODE}[Subscription<br/>{}]\n\n",
        escape_label(&truncate_subscription_id(input.subscription_id))
    );

    let mut node_ids: HashMap<&str, String> = HashMap::new();
    let mut group_nodes: HashMap<&str, String> = HashMap::new();

    mermaid += "    %% Resource Groups\n";
    for (i, rg) in input.resource_groups.iter().enumerate() {
        let node = format!("RG{}", i + 1);
        mermaid += &format!(
            "    {SUBSCRIPTION_NODE} --> {node}[\"{}\"]\n",
            escape_label(&rg.name)
        );
        group_nodes.entry(rg.name.as_str()).or_insert(node);
    }

    let by_type = input
        .resources
        .iter()
        .filter(|r| r.id.is_some())
        .into_group_map_by(|r| r.type_lower());
    let ordered_types = by_type
        .keys()
        .sorted_by(|a, b| type_rank(a).cmp(&type_rank(b)).then_with(|| a.cmp(b)))
        .collect_vec();

    let mut counter = 0;
    for resource_type in ordered_types {
        mermaid += &format!("\n    %% {} Resources\n", short_type_name(resource_type));
        for resource in &by_type[resource_type] {
            counter += 1;
            let node = format!("N{counter}");
            let parent = group_nodes
                .get(resource.resource_group.as_str())
                .map(String::as_str)
                .unwrap_or(SUBSCRIPTION_NODE);

            let mut label = format!(
                "<b>{}</b><br/>{}",
                display_name(resource),
                resource.name
            );
            if let Some(kind) = resource.kind.as_deref().filter(|k| !k.is_empty()) {
                if !resource.is_type(WEB_SITE) {
                    label += &format!("<br/><i>({kind})</i>");
                }
            }
            mermaid += &format!("    {parent} --> {node}[\"{}\"]\n", escape_label(&label));
            node_ids.insert(resource.id(), node);
        }
    }

    let edges = input.dependencies.edges(input.include_potential);
    let mut added: BTreeSet<(&str, &str)> = BTreeSet::new();

    mermaid += "\n    %% Confirmed Dependencies\n";
    for edge in edges.iter().filter(|e| e.confidence == Confidence::Confirmed) {
        if let (Some(source), Some(target)) = (
            node_ids.get(edge.source.as_str()),
            node_ids.get(edge.target.as_str()),
        ) {
            if added.insert((source.as_str(), target.as_str())) {
                mermaid += &format!("    {source} --> {target}\n");
            }
        }
    }

    if input.include_potential {
        mermaid += "\n    %% Potential Dependencies\n";
        for edge in edges.iter().filter(|e| e.confidence == Confidence::Potential) {
            if let (Some(source), Some(target)) = (
                node_ids.get(edge.source.as_str()),
                node_ids.get(edge.target.as_str()),
            ) {
                if added.insert((source.as_str(), target.as_str())) {
                    mermaid += &format!("    {source} -.-> {target}\n");
                }
            }
        }
    }

    mermaid
}

/// Wrap a diagram in the Markdown document written to `<prefix>.md`.
pub fn markdown_document(input: &DiagramInput<'_>, generated_at: Option<&str>) -> String {
    let mut doc = String::from("# Azure Resource Dependency Graph\n\n");
    doc += &format!(
        "Subscription: `{}`\n\n",
        truncate_subscription_id(input.subscription_id)
    );
    if let Some(generated_at) = generated_at {
        doc += &format!("Generated: {generated_at}\n\n");
    }
    doc += "- Solid arrows (`-->`): confirmed dependencies\n";
    if input.include_potential {
        doc += "- Dotted arrows (`-.->`): potential dependencies\n";
    }
    doc += "\n```mermaid\n";
    doc += &generate_mermaid_diagram(input);
    doc += "```\n";
    doc
}
