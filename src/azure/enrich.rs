//! Per-resource enrichment: network info, environment variables and
//! type-specific configuration fetched beyond the basic inventory query.

use super::cli::run_az_json;
use crate::config;
use crate::models::{Diagnostics, Resource};
use crate::processing::types::*;
use serde_json::{json, Map, Value};
use std::error::Error;

/// Extra documents for one resource. Empty maps mean nothing was found.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Enrichment {
    pub network_info: Map<String, Value>,
    pub environment_variables: Map<String, Value>,
    pub specific_configuration: Map<String, Value>,
}

/// Fetches enrichment for a resource. Implementations own their retry policy.
///
/// Failures of individual documents go to `diagnostics` and leave the rest of
/// the enrichment in place. An `Err` discards the whole resource.
pub trait Enricher {
    fn enrich(
        &mut self,
        resource: &Resource,
        subscription_id: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<Enrichment, Box<dyn Error>>;
}

/// Union `extra` into `target`. Existing keys are kept, so a second
/// enrichment pass never wipes what an earlier one found.
fn merge_document(target: &mut Option<Value>, extra: Map<String, Value>) {
    if extra.is_empty() {
        return;
    }
    match target {
        Some(Value::Object(existing)) => {
            for (key, value) in extra {
                existing.entry(key).or_insert(value);
            }
        }
        Some(_) => log::warn!("enrichment target is not an object, left unchanged"),
        None => *target = Some(Value::Object(extra)),
    }
}

/// Merge an enrichment onto a resource record.
pub fn apply_enrichment(resource: &mut Resource, enrichment: Enrichment) {
    merge_document(&mut resource.network_info, enrichment.network_info);
    merge_document(
        &mut resource.environment_variables,
        enrichment.environment_variables,
    );
    merge_document(
        &mut resource.specific_configuration,
        enrichment.specific_configuration,
    );
}

/// Enrich every resource in place, one at a time.
///
/// Whatever the enricher returns is merged, even when some of its documents
/// failed. An `Err` is recorded and the resource stays unenriched.
///
/// # Returns
/// The number of resources that gained at least one document.
pub fn enrich_resources(
    resources: &mut [Resource],
    enricher: &mut dyn Enricher,
    subscription_id: &str,
    diagnostics: &mut Diagnostics,
) -> usize {
    let total = resources.len();
    let mut enriched = 0;
    log::info!("Enhancing resource details for {total} resources...");

    for (i, resource) in resources.iter_mut().enumerate() {
        log::info!("Processing resource {}/{total}: {}", i + 1, resource.name);
        match enricher.enrich(resource, subscription_id, diagnostics) {
            Ok(enrichment) => {
                let had_data = enrichment != Enrichment::default();
                apply_enrichment(resource, enrichment);
                if had_data {
                    enriched += 1;
                }
            }
            Err(e) => diagnostics.record(
                resource.id.as_deref(),
                "enrich",
                format!("'{}': {e}", resource.name),
            ),
        }
    }
    log::info!("Enhanced {enriched}/{total} resources with detailed information");
    enriched
}

/// Runs one `az` command and returns its parsed JSON.
type AzRunner = Box<dyn FnMut(&[&str], Option<&str>) -> Result<Value, Box<dyn Error>>>;

/// Enrichment through `az` CLI show/list commands.
///
/// Each document is fetched at most once per resource and every fetch
/// succeeds or fails on its own.
pub struct AzCliEnricher {
    run: AzRunner,
}

impl Default for AzCliEnricher {
    fn default() -> Self {
        AzCliEnricher {
            run: Box::new(run_az_json),
        }
    }
}

impl AzCliEnricher {
    /// Enricher that sends its commands to `run` instead of the `az` binary.
    pub fn with_runner(
        run: impl FnMut(&[&str], Option<&str>) -> Result<Value, Box<dyn Error>> + 'static,
    ) -> AzCliEnricher {
        AzCliEnricher { run: Box::new(run) }
    }

    /// Run `az <args> --resource-group .. --name ..`. A failure is recorded
    /// against the resource and yields `None`.
    fn fetch(
        &mut self,
        args: &[&str],
        resource: &Resource,
        subscription_id: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<Value> {
        let mut full = args.to_vec();
        full.extend_from_slice(&[
            "--resource-group",
            resource.resource_group.as_str(),
            "--name",
            resource.name.as_str(),
        ]);
        let result = (self.run)(full.as_slice(), Some(subscription_id));
        std::thread::sleep(std::time::Duration::from_millis(config::SLEEP_MSEC));
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                diagnostics.record(
                    resource.id.as_deref(),
                    "enrich",
                    format!("'{}' az {}: {e}", resource.name, args.join(" ")),
                );
                None
            }
        }
    }
}

impl Enricher for AzCliEnricher {
    fn enrich(
        &mut self,
        resource: &Resource,
        subscription_id: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<Enrichment, Box<dyn Error>> {
        let mut enrichment = Enrichment::default();
        let rtype = resource.type_lower();
        match rtype.as_str() {
            VIRTUAL_MACHINE => {
                // `--show-details` adds IPs and fqdns to the plain `vm show` document.
                let args = ["vm", "show", "--show-details"];
                if let Some(vm) = self.fetch(&args, resource, subscription_id, diagnostics) {
                    enrichment.network_info = vm_network(&vm);
                    enrichment.specific_configuration = vm_configuration(&vm);
                }
            }
            PUBLIC_IP => {
                let args = ["network", "public-ip", "show"];
                if let Some(pip) = self.fetch(&args, resource, subscription_id, diagnostics) {
                    enrichment.network_info = public_ip_network(&pip);
                }
            }
            LOAD_BALANCER => {
                let args = ["network", "lb", "show"];
                if let Some(lb) = self.fetch(&args, resource, subscription_id, diagnostics) {
                    enrichment.network_info = load_balancer_network(&lb);
                }
            }
            WEB_SITE => {
                let args = ["webapp", "show"];
                if let Some(app) = self.fetch(&args, resource, subscription_id, diagnostics) {
                    enrichment.network_info = web_app_network(&app);
                }
                let is_function = resource
                    .kind
                    .as_deref()
                    .is_some_and(|k| k.to_ascii_lowercase().contains("functionapp"));
                let settings_cmd: &[&str] = if is_function {
                    &["functionapp", "config", "appsettings", "list"]
                } else {
                    &["webapp", "config", "appsettings", "list"]
                };
                if let Some(settings) = self.fetch(settings_cmd, resource, subscription_id, diagnostics) {
                    enrichment
                        .environment_variables
                        .insert("appSettings".into(), name_value_map(&settings, "value"));
                }
                let args = ["webapp", "config", "connection-string", "list"];
                if let Some(conn) = self.fetch(&args, resource, subscription_id, diagnostics) {
                    enrichment
                        .environment_variables
                        .insert("connectionStrings".into(), connection_string_map(&conn));
                }
            }
            STORAGE_ACCOUNT => {
                let args = ["storage", "account", "show"];
                if let Some(storage) = self.fetch(&args, resource, subscription_id, diagnostics) {
                    copy_keys(&storage, &mut enrichment.network_info, &[("primaryEndpoints", "endpoints")]);
                    copy_keys(
                        &storage,
                        &mut enrichment.specific_configuration,
                        &[("sku", "sku"), ("accessTier", "accessTier"), ("encryption", "encryption"), ("networkRuleSet", "networkRuleSet")],
                    );
                }
            }
            CONTAINER_GROUP => {
                let args = ["container", "show"];
                if let Some(group) = self.fetch(&args, resource, subscription_id, diagnostics) {
                    enrichment.environment_variables = container_group_env(&group);
                }
            }
            SQL_DATABASE => {
                if let Some(server) = sql_server_name(resource.id()) {
                    let args = ["sql", "db", "show", "--server", server];
                    if let Some(db) = self.fetch(&args, resource, subscription_id, diagnostics) {
                        copy_keys(
                            &db,
                            &mut enrichment.specific_configuration,
                            &[("edition", "edition"), ("serviceLevelObjective", "serviceLevelObjective"), ("maxSizeBytes", "maxSizeBytes"), ("collation", "collation")],
                        );
                    }
                }
            }
            KEY_VAULT => {
                let args = ["keyvault", "show"];
                if let Some(props) = self
                    .fetch(&args, resource, subscription_id, diagnostics)
                    .and_then(|vault| vault.get("properties").cloned())
                {
                    copy_keys(
                        &props,
                        &mut enrichment.specific_configuration,
                        &[("sku", "sku"), ("accessPolicies", "accessPolicies"), ("enabledForDeployment", "enabledForDeployment"), ("enabledForTemplateDeployment", "enabledForTemplateDeployment")],
                    );
                }
            }
            _ => {}
        }
        Ok(enrichment)
    }
}

fn vm_network(vm: &Value) -> Map<String, Value> {
    let mut info = Map::new();
    copy_keys(vm, &mut info, &[("privateIps", "privateIps"), ("publicIps", "publicIps"), ("fqdns", "fqdns")]);
    info
}

fn vm_configuration(vm: &Value) -> Map<String, Value> {
    let mut config = Map::new();
    for (key, pointer) in [
        ("vmSize", "/hardwareProfile/vmSize"),
        ("osType", "/storageProfile/osDisk/osType"),
        ("imageReference", "/storageProfile/imageReference"),
        ("adminUsername", "/osProfile/adminUsername"),
    ] {
        config.insert(key.into(), vm.pointer(pointer).cloned().unwrap_or(Value::Null));
    }
    config
}

fn public_ip_network(pip: &Value) -> Map<String, Value> {
    let mut info = Map::new();
    info.insert("ipAddress".into(), pip.get("ipAddress").cloned().unwrap_or(Value::Null));
    info.insert(
        "fqdn".into(),
        pip.pointer("/dnsSettings/fqdn").cloned().unwrap_or(Value::Null),
    );
    info.insert(
        "allocationMethod".into(),
        pip.get("publicIPAllocationMethod").cloned().unwrap_or(Value::Null),
    );
    info
}

/// Names of the public IPs behind the frontend configurations.
fn load_balancer_network(lb: &Value) -> Map<String, Value> {
    let frontend_ips: Vec<Value> = lb
        .get("frontendIPConfigurations")
        .and_then(Value::as_array)
        .map(|configs| {
            configs
                .iter()
                .filter_map(|c| c.pointer("/publicIPAddress/id").and_then(Value::as_str))
                .filter_map(|id| id.rsplit('/').next())
                .map(|name| Value::String(name.to_string()))
                .collect()
        })
        .unwrap_or_default();
    let mut info = Map::new();
    info.insert("frontendIPs".into(), Value::Array(frontend_ips));
    info
}

fn web_app_network(app: &Value) -> Map<String, Value> {
    let mut info = Map::new();
    copy_keys(app, &mut info, &[("defaultHostName", "defaultHostName"), ("hostNames", "hostNames")]);
    let outbound: Vec<Value> = app
        .get("outboundIpAddresses")
        .and_then(Value::as_str)
        .map(|ips| {
            ips.split(',')
                .filter(|ip| !ip.is_empty())
                .map(|ip| Value::String(ip.to_string()))
                .collect()
        })
        .unwrap_or_default();
    info.insert("outboundIpAddresses".into(), Value::Array(outbound));
    info
}

/// `container_<i>_env` for every container with a non-empty env list.
fn container_group_env(group: &Value) -> Map<String, Value> {
    let mut env = Map::new();
    let containers = group.get("containers").and_then(Value::as_array);
    for (i, container) in containers.into_iter().flatten().enumerate() {
        if let Some(vars) = container.get("environmentVariables") {
            if vars.as_array().is_some_and(|v| !v.is_empty()) {
                env.insert(format!("container_{i}_env"), container_env_map(vars));
            }
        }
    }
    env
}

/// Copy `(source key, target key)` pairs present in `source`.
fn copy_keys(source: &Value, target: &mut Map<String, Value>, keys: &[(&str, &str)]) {
    for (from, to) in keys {
        if let Some(value) = source.get(*from) {
            target.insert((*to).to_string(), value.clone());
        }
    }
}

/// `[{"name": .., "<value_key>": ..}]` -> `{name: value}`.
fn name_value_map(list: &Value, value_key: &str) -> Value {
    let mut map = Map::new();
    for item in list.as_array().into_iter().flatten() {
        if let Some(name) = item.get("name").and_then(Value::as_str) {
            map.insert(
                name.to_string(),
                item.get(value_key).cloned().unwrap_or(Value::Null),
            );
        }
    }
    Value::Object(map)
}

/// Connection strings list as `{name: value}`. The value sits under
/// `value` or, in newer CLI versions, `value.value`.
fn connection_string_map(list: &Value) -> Value {
    let mut map = Map::new();
    for item in list.as_array().into_iter().flatten() {
        if let Some(name) = item.get("name").and_then(Value::as_str) {
            let value = match item.get("value") {
                Some(Value::Object(inner)) => inner.get("value").cloned().unwrap_or(Value::Null),
                Some(other) => other.clone(),
                None => Value::Null,
            };
            map.insert(name.to_string(), value);
        }
    }
    Value::Object(map)
}

/// Container env list as `{name: value}`; secure values are masked.
fn container_env_map(vars: &Value) -> Value {
    let mut map = Map::new();
    for var in vars.as_array().into_iter().flatten() {
        if let Some(name) = var.get("name").and_then(Value::as_str) {
            let value = match var.get("value") {
                Some(Value::String(v)) => json!(v),
                _ => json!("SECURE_VALUE"),
            };
            map.insert(name.to_string(), value);
        }
    }
    Value::Object(map)
}

/// Server name segment of a SQL database id
/// (`/subscriptions/../providers/Microsoft.Sql/servers/<server>/databases/<db>`).
fn sql_server_name(id: &str) -> Option<&str> {
    id.split('/').nth(8).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FixedEnricher;

    impl Enricher for FixedEnricher {
        fn enrich(
            &mut self,
            resource: &Resource,
            _: &str,
            _: &mut Diagnostics,
        ) -> Result<Enrichment, Box<dyn Error>> {
            if resource.name == "broken" {
                return Err("az exploded".into());
            }
            if resource.name == "plain" {
                return Ok(Enrichment::default());
            }
            let mut env = Map::new();
            env.insert("appSettings".into(), json!({ "DB": "Server=sql1.database.windows.net" }));
            Ok(Enrichment {
                environment_variables: env,
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_enrich_resources_continues_on_error() {
        let mut resources = vec![
            Resource::new("a", "broken", WEB_SITE, "rg"),
            Resource::new("b", "app", WEB_SITE, "rg"),
            Resource::new("c", "plain", WEB_SITE, "rg"),
        ];
        let mut diagnostics = Diagnostics::new();
        let count = enrich_resources(&mut resources, &mut FixedEnricher, "sub", &mut diagnostics);
        assert_eq!(count, 1);
        assert_eq!(diagnostics.in_context("enrich").count(), 1);
        assert!(resources[0].environment_variables.is_none());
        assert!(resources[1].is_enriched());
        assert!(!resources[2].is_enriched());
    }

    /// `az` stand-in: web app documents succeed except the connection strings.
    fn az_without_connection_strings(args: &[&str], _: Option<&str>) -> Result<Value, Box<dyn Error>> {
        match args {
            ["webapp", "show", ..] => Ok(json!({ "defaultHostName": "app1.azurewebsites.net" })),
            ["webapp", "config", "appsettings", "list", ..] => Ok(json!([
                { "name": "SQL", "value": "Server=tcp:myserver.database.windows.net" }
            ])),
            _ => Err("ERROR running: AuthorizationFailed".into()),
        }
    }

    #[test]
    fn test_failed_document_keeps_the_others() {
        let mut resources = vec![Resource::new("app1id", "app1", WEB_SITE, "rg")];
        let mut enricher = AzCliEnricher::with_runner(az_without_connection_strings);
        let mut diagnostics = Diagnostics::new();
        let count = enrich_resources(&mut resources, &mut enricher, "sub", &mut diagnostics);

        assert_eq!(count, 1);
        let failures: Vec<_> = diagnostics.in_context("enrich").collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].message.contains("connection-string"));
        assert_eq!(failures[0].resource_id.as_deref(), Some("app1id"));

        let env = resources[0].environment_variables.as_ref().unwrap();
        assert_eq!(
            env["appSettings"]["SQL"],
            "Server=tcp:myserver.database.windows.net"
        );
        assert!(env.get("connectionStrings").is_none());
        assert_eq!(
            resources[0].network_info.as_ref().unwrap()["defaultHostName"],
            "app1.azurewebsites.net"
        );
    }

    #[test]
    fn test_storage_account_shown_once() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&calls);
        let mut enricher = AzCliEnricher::with_runner(move |args: &[&str], _: Option<&str>| {
            seen.borrow_mut().push(args.join(" "));
            Ok(json!({
                "primaryEndpoints": { "blob": "https://data.blob.core.windows.net/" },
                "sku": { "name": "Standard_LRS" }
            }))
        });
        let storage = Resource::new("st", "data", STORAGE_ACCOUNT, "rg");
        let mut diagnostics = Diagnostics::new();
        let enrichment = enricher.enrich(&storage, "sub", &mut diagnostics).unwrap();

        assert_eq!(calls.borrow().len(), 1);
        assert!(calls.borrow()[0].starts_with("storage account show"));
        assert!(enrichment.network_info.contains_key("endpoints"));
        assert_eq!(enrichment.specific_configuration["sku"]["name"], "Standard_LRS");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unsupported_type_runs_nothing() {
        let mut enricher = AzCliEnricher::with_runner(|_: &[&str], _: Option<&str>| {
            Err("should not run".into())
        });
        let vnet = Resource::new("v", "vnet", VIRTUAL_NETWORK, "rg");
        let mut diagnostics = Diagnostics::new();
        let enrichment = enricher.enrich(&vnet, "sub", &mut diagnostics).unwrap();
        assert_eq!(enrichment, Enrichment::default());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_merge_is_key_union() {
        let mut resource = Resource::new("a", "app", WEB_SITE, "rg");
        resource.environment_variables = Some(json!({ "appSettings": { "KEEP": "1" } }));
        let mut env = Map::new();
        env.insert("appSettings".into(), json!({ "NEW": "2" }));
        env.insert("connectionStrings".into(), json!({ "Db": "x" }));
        apply_enrichment(
            &mut resource,
            Enrichment {
                environment_variables: env,
                ..Default::default()
            },
        );
        let env = resource.environment_variables.unwrap();
        assert_eq!(env["appSettings"]["KEEP"], "1");
        assert_eq!(env["connectionStrings"]["Db"], "x");
    }

    #[test]
    fn test_name_value_helpers() {
        let settings = json!([{ "name": "A", "value": "1", "slotSetting": false }]);
        assert_eq!(name_value_map(&settings, "value"), json!({ "A": "1" }));
        let conn = json!([{ "name": "Db", "type": "SQLAzure", "value": { "value": "Server=x" } }]);
        assert_eq!(connection_string_map(&conn), json!({ "Db": "Server=x" }));
        let vars = json!([{ "name": "PLAIN", "value": "v" }, { "name": "SECRET", "secureValue": null }]);
        assert_eq!(
            container_env_map(&vars),
            json!({ "PLAIN": "v", "SECRET": "SECURE_VALUE" })
        );
    }

    #[test]
    fn test_sql_server_name() {
        let id = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Sql/servers/srv1/databases/db1";
        assert_eq!(sql_server_name(id), Some("srv1"));
        assert_eq!(sql_server_name("/short/id"), None);
    }
}
