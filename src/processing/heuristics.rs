//! Phase 3: type-specific potential dependency heuristics.
//!
//! These are deliberately coarse. A container app secret called `db-password`
//! links the app to every database server in the catalog, without picking one.

use super::blob::{array_at, document_text, field_in, str_at, string_leaves};
use super::fuzzy::{name_appears_in, MatchSettings};
use super::types::*;
use crate::models::{Catalog, Resource};
use std::error::Error;

pub type PotentialRule =
    fn(&Resource, &Catalog, &MatchSettings) -> Result<Vec<String>, Box<dyn Error>>;

pub struct Heuristic {
    pub resource_type: &'static str,
    pub name: &'static str,
    pub apply: PotentialRule,
}

pub const HEURISTICS: &[Heuristic] = &[
    Heuristic {
        resource_type: CONTAINER_APP,
        name: "container_app_secret_names",
        apply: container_app_secret_names,
    },
    Heuristic {
        resource_type: CONTAINER_APP,
        name: "container_app_secret_refs",
        apply: container_app_secret_refs,
    },
    Heuristic {
        resource_type: WEB_SITE,
        name: "web_insights_settings",
        apply: web_insights_settings,
    },
    Heuristic {
        resource_type: APP_INSIGHTS,
        name: "insights_storage",
        apply: config_mentions_storage,
    },
    Heuristic {
        resource_type: VIRTUAL_MACHINE,
        name: "vm_storage",
        apply: config_mentions_storage,
    },
    Heuristic {
        resource_type: API_MANAGEMENT,
        name: "apim_backends",
        apply: apim_backends,
    },
];

pub fn heuristics_for(resource_type: &str) -> impl Iterator<Item = &'static Heuristic> + '_ {
    HEURISTICS
        .iter()
        .filter(move |h| h.resource_type == resource_type)
}

/// Secret name keyword -> types of resource it probably refers to.
const SECRET_NAME_HINTS: &[(&[&str], &[&str])] = &[
    (&["keyvault", "kv"], &[KEY_VAULT]),
    (&["storage"], &[STORAGE_ACCOUNT]),
    (&["database", "db"], &[SQL_SERVER, COSMOS_ACCOUNT, POSTGRES_FLEXIBLE]),
];

/// Env `secretRef` keyword -> target types.
const SECRET_REF_HINTS: &[(&[&str], &[&str])] = &[
    (&["appinsights"], &[APP_INSIGHTS]),
    (&["webpubsub", "signalr"], &[SIGNALR, WEB_PUBSUB]),
];

/// First hint whose keywords occur in `name`. Earlier hints win, so a secret
/// called `kv-db-password` points at key vaults only.
fn hinted_types(name: &str, hints: &[(&[&str], &'static [&'static str])]) -> &'static [&'static str] {
    let lower = name.to_ascii_lowercase();
    hints
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, types)| *types)
        .unwrap_or(&[])
}

fn ids_of_types(catalog: &Catalog, types: &[&str]) -> Vec<String> {
    catalog
        .of_types(types)
        .map(|r| r.id().to_string())
        .collect()
}

fn container_app_secret_names(
    resource: &Resource,
    catalog: &Catalog,
    _settings: &MatchSettings,
) -> Result<Vec<String>, Box<dyn Error>> {
    let secrets = array_at(
        field_in(resource.properties(), &["configuration", "secrets"]),
        "configuration.secrets",
    )?;
    let mut ids = Vec::new();
    for secret in secrets {
        if let Some(name) = str_at(secret.get("name"), "configuration.secrets[].name")? {
            ids.extend(ids_of_types(catalog, hinted_types(name, SECRET_NAME_HINTS)));
        }
    }
    Ok(ids)
}

fn container_app_secret_refs(
    resource: &Resource,
    catalog: &Catalog,
    _settings: &MatchSettings,
) -> Result<Vec<String>, Box<dyn Error>> {
    let containers = array_at(
        field_in(resource.properties(), &["template", "containers"]),
        "template.containers",
    )?;
    let mut ids = Vec::new();
    for container in containers {
        for env in array_at(container.get("env"), "template.containers[].env")? {
            if let Some(secret_ref) = str_at(env.get("secretRef"), "env[].secretRef")? {
                ids.extend(ids_of_types(catalog, hinted_types(secret_ref, SECRET_REF_HINTS)));
            }
        }
    }
    Ok(ids)
}

/// Insights components named in any `*APPLICATIONINSIGHTS*` app setting.
fn web_insights_settings(
    resource: &Resource,
    catalog: &Catalog,
    _settings: &MatchSettings,
) -> Result<Vec<String>, Box<dyn Error>> {
    let Some(app_settings) = resource
        .environment_variables
        .as_ref()
        .and_then(|env| env.get("appSettings"))
    else {
        return Ok(vec![]);
    };
    let mut ids = Vec::new();
    for (key, value) in string_leaves(app_settings) {
        if !key.to_ascii_uppercase().contains("APPLICATIONINSIGHTS") {
            continue;
        }
        ids.extend(
            catalog
                .of_type(APP_INSIGHTS)
                .filter(|ai| !ai.name.is_empty() && value.contains(&ai.name))
                .map(|ai| ai.id().to_string()),
        );
    }
    Ok(ids)
}

/// Storage accounts named in the resource's specific configuration.
fn config_mentions_storage(
    resource: &Resource,
    catalog: &Catalog,
    settings: &MatchSettings,
) -> Result<Vec<String>, Box<dyn Error>> {
    let config = document_text(resource.specific_configuration.as_ref());
    if config.is_empty() {
        return Ok(vec![]);
    }
    Ok(catalog
        .of_type(STORAGE_ACCOUNT)
        .filter(|st| name_appears_in(&st.name, &config, settings))
        .map(|st| st.id().to_string())
        .collect())
}

/// API Management -> every insights component, plus web apps, storage
/// accounts and key vaults named in its configuration.
fn apim_backends(
    resource: &Resource,
    catalog: &Catalog,
    settings: &MatchSettings,
) -> Result<Vec<String>, Box<dyn Error>> {
    let mut ids = ids_of_types(catalog, &[APP_INSIGHTS]);
    let config = document_text(resource.specific_configuration.as_ref());
    if !config.is_empty() {
        ids.extend(
            catalog
                .of_types(&[WEB_SITE, STORAGE_ACCOUNT, KEY_VAULT])
                .filter(|r| name_appears_in(&r.name, &config, settings))
                .map(|r| r.id().to_string()),
        );
    }
    Ok(ids)
}
