//! Point-to-point confirmation of container registry login servers.

use crate::models::Resource;
use std::error::Error;

/// Resolves the login server (e.g. `myacr.azurecr.io`) of a registry resource.
///
/// Live runs query Azure per registry; offline runs read the value already in
/// the catalog. A failed lookup is logged by the caller and yields no edge.
pub trait LoginServerLookup {
    fn login_server(&mut self, registry: &Resource) -> Result<Option<String>, Box<dyn Error>>;
}

/// Reads `properties.loginServer` from the resource itself. No external calls.
#[derive(Debug, Default)]
pub struct CatalogLoginServers;

impl LoginServerLookup for CatalogLoginServers {
    fn login_server(&mut self, registry: &Resource) -> Result<Option<String>, Box<dyn Error>> {
        Ok(registry
            .properties()
            .get("loginServer")
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }
}
