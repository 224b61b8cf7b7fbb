//! Container registry login server lookups against Resource Graph.

use super::graph::run_graph_query;
use crate::models::Resource;
use crate::processing::LoginServerLookup;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;

#[derive(Deserialize, Debug)]
struct LoginServerRow {
    #[serde(rename = "loginServer", default)]
    login_server: Option<String>,
}

/// Queries each registry's `properties.loginServer`, once per registry per run.
#[derive(Debug)]
pub struct AzCliLoginServers {
    subscription_id: String,
    cache: HashMap<String, Option<String>>,
}

impl AzCliLoginServers {
    pub fn new(subscription_id: &str) -> AzCliLoginServers {
        AzCliLoginServers {
            subscription_id: subscription_id.to_string(),
            cache: HashMap::new(),
        }
    }
}

impl LoginServerLookup for AzCliLoginServers {
    fn login_server(&mut self, registry: &Resource) -> Result<Option<String>, Box<dyn Error>> {
        if let Some(cached) = self.cache.get(registry.id()) {
            return Ok(cached.clone());
        }
        let query = format!(
            "Resources | where id =~ '{}' | project loginServer=properties.loginServer",
            registry.id()
        );
        let response = run_graph_query::<LoginServerRow>(&query, &self.subscription_id)?;
        let login_server = response
            .data
            .into_iter()
            .next()
            .and_then(|row| row.login_server);
        log::debug!(
            "registry '{}' login server: {:?}",
            registry.name,
            login_server
        );
        self.cache
            .insert(registry.id().to_string(), login_server.clone());
        Ok(login_server)
    }
}
