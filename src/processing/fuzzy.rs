//! Phase 3: potential dependencies from fuzzy name matching.
//!
//! Setting values (app settings, connection strings, container env) and
//! network info values are searched for other resources' names. When a value
//! carries a well-known Azure service hostname, only resources of that
//! service's types are considered, so a storage account named `database` is
//! not linked just because a SQL connection string mentions
//! `database.windows.net`.

use super::blob::string_leaves;
use super::types::*;
use crate::models::{Catalog, Resource};
use regex::Regex;
use std::sync::OnceLock;

/// Tunables for name matching.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSettings {
    /// Names shorter than this never match. The default of 4 means a name must
    /// be longer than 3 characters.
    pub min_name_length: usize,
    /// Also compare with hyphens removed from both name and value.
    pub ignore_hyphens: bool,
}

impl Default for MatchSettings {
    fn default() -> Self {
        MatchSettings {
            min_name_length: 4,
            ignore_hyphens: true,
        }
    }
}

/// True when `name` appears in `text` under the given settings.
pub fn name_appears_in(name: &str, text: &str, settings: &MatchSettings) -> bool {
    if name.chars().count() < settings.min_name_length {
        return false;
    }
    if text.contains(name) {
        return true;
    }
    if settings.ignore_hyphens {
        let bare_name = name.replace('-', "");
        return !bare_name.is_empty() && text.replace('-', "").contains(&bare_name);
    }
    false
}

/// A service hostname pattern and the resource types it can point at.
pub struct HostRoute {
    pub service: &'static str,
    pattern: &'static str,
    pub target_types: &'static [&'static str],
}

const HOST_ROUTES: &[HostRoute] = &[
    HostRoute {
        service: "storage",
        pattern: r"\.(blob|queue|table|file|dfs)\.core\.windows\.net",
        target_types: &[STORAGE_ACCOUNT],
    },
    HostRoute {
        service: "sql",
        pattern: r"\.database\.windows\.net|\.sql\.azuresynapse\.net",
        target_types: &[SQL_SERVER, SQL_DATABASE],
    },
    HostRoute {
        service: "postgres",
        pattern: r"\.postgres\.database\.azure\.com",
        target_types: &[POSTGRES_SERVER, POSTGRES_FLEXIBLE],
    },
    HostRoute {
        service: "mysql",
        pattern: r"\.mysql\.database\.azure\.com",
        target_types: &[MYSQL_SERVER, MYSQL_FLEXIBLE],
    },
    HostRoute {
        service: "cosmos",
        pattern: r"\.documents\.azure\.com|\.cosmos\.azure\.com",
        target_types: &[COSMOS_ACCOUNT],
    },
    HostRoute {
        service: "servicebus",
        pattern: r"\.servicebus\.windows\.net",
        target_types: &[SERVICE_BUS, EVENT_HUB],
    },
    HostRoute {
        service: "redis",
        pattern: r"\.redis\.cache\.windows\.net",
        target_types: &[REDIS],
    },
    HostRoute {
        service: "keyvault",
        pattern: r"@microsoft\.keyvault\(|\.vault\.azure\.net",
        target_types: &[KEY_VAULT],
    },
    HostRoute {
        service: "signalr",
        pattern: r"\.service\.signalr\.net|\.webpubsub\.azure\.com",
        target_types: &[SIGNALR, WEB_PUBSUB],
    },
    HostRoute {
        service: "registry",
        pattern: r"\.azurecr\.io",
        target_types: &[CONTAINER_REGISTRY],
    },
];

static ROUTE_REGEX: OnceLock<Vec<(Regex, &'static HostRoute)>> = OnceLock::new();

fn get_route_regex() -> &'static [(Regex, &'static HostRoute)] {
    ROUTE_REGEX.get_or_init(|| {
        HOST_ROUTES
            .iter()
            .map(|route| {
                let regex = Regex::new(&format!("(?i){}", route.pattern))
                    .expect("Invalid host route regex");
                (regex, route)
            })
            .collect()
    })
}

/// Routes whose hostname pattern occurs in `value`.
pub fn routes_for(value: &str) -> Vec<&'static HostRoute> {
    get_route_regex()
        .iter()
        .filter(|(regex, _)| regex.is_match(value))
        .map(|(_, route)| *route)
        .collect()
}

/// Candidates named in `value`, restricted to routed types when the value
/// carries a known service hostname.
///
/// The restriction covers the whole value: once a hostname routes it, other
/// resources named elsewhere in the same value are not candidates.
pub fn match_value<'a>(
    source: &Resource,
    value: &str,
    catalog: &'a Catalog,
    settings: &MatchSettings,
) -> Vec<&'a Resource> {
    let routes = routes_for(value);
    catalog
        .iter()
        .filter(|candidate| candidate.id() != source.id())
        .filter(|candidate| {
            routes.is_empty()
                || routes
                    .iter()
                    .any(|route| candidate.is_any_type(route.target_types))
        })
        .filter(|candidate| name_appears_in(&candidate.name, value, settings))
        .collect()
}

/// Potential dependency ids from environment variables and network info.
pub fn potential_from_settings(
    resource: &Resource,
    catalog: &Catalog,
    settings: &MatchSettings,
) -> Vec<String> {
    let mut ids = Vec::new();
    for document in [&resource.environment_variables, &resource.network_info]
        .into_iter()
        .flatten()
    {
        for (key, value) in string_leaves(document) {
            for candidate in match_value(resource, value, catalog, settings) {
                log::trace!(
                    "{} -> {} via '{key}'",
                    resource.name,
                    candidate.name
                );
                ids.push(candidate.id().to_string());
            }
        }
    }
    ids
}
