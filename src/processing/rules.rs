//! Phase 2: type-specific confirmed dependency rules.
//!
//! Rules are registered in [`RULES`] against a lower-cased resource type. Each
//! rule reads one resource (plus the catalog for cross-lookups) and returns the
//! ids it structurally depends on. A rule error is recorded by the engine and
//! only drops that rule's edges for that resource.

use super::blob::{array_at, field_in, object_at, str_at};
use super::lookup::LoginServerLookup;
use super::types::*;
use crate::models::{Catalog, Diagnostics, Resource};
use itertools::Itertools;
use serde_json::Value;
use std::error::Error;

/// App setting holding the Application Insights connection string.
pub const INSIGHTS_CONNECTION_SETTING: &str = "APPLICATIONINSIGHTS_CONNECTION_STRING";

/// What a rule may read (and the lookup it may call).
pub struct RuleContext<'a> {
    pub catalog: &'a Catalog,
    pub lookup: &'a mut dyn LoginServerLookup,
    pub diagnostics: &'a mut Diagnostics,
}

pub type ConfirmedRule =
    fn(&Resource, &mut RuleContext<'_>) -> Result<Vec<String>, Box<dyn Error>>;

pub struct Rule {
    /// Lower-cased resource type the rule applies to.
    pub resource_type: &'static str,
    pub name: &'static str,
    pub apply: ConfirmedRule,
}

pub const RULES: &[Rule] = &[
    Rule {
        resource_type: CONTAINER_APP,
        name: "container_app_environment",
        apply: container_app_environment,
    },
    Rule {
        resource_type: CONTAINER_APP,
        name: "container_app_registry",
        apply: container_app_registry,
    },
    Rule {
        resource_type: WEB_SITE,
        name: "web_server_farm",
        apply: web_server_farm,
    },
    Rule {
        resource_type: WEB_SITE,
        name: "web_app_insights",
        apply: web_app_insights,
    },
    Rule {
        resource_type: VIRTUAL_MACHINE,
        name: "vm_network_interfaces",
        apply: vm_network_interfaces,
    },
    Rule {
        resource_type: VM_SCALE_SET,
        name: "vmss_virtual_networks",
        apply: vmss_virtual_networks,
    },
    Rule {
        resource_type: VM_SCALE_SET,
        name: "vmss_load_balancers",
        apply: vmss_load_balancers,
    },
    Rule {
        resource_type: STORAGE_ACCOUNT,
        name: "storage_virtual_networks",
        apply: storage_virtual_networks,
    },
    Rule {
        resource_type: METRIC_ALERT,
        name: "metric_alert_scopes",
        apply: metric_alert_scopes,
    },
    Rule {
        resource_type: AUTOSCALE_SETTING,
        name: "autoscale_targets",
        apply: autoscale_targets,
    },
];

/// Rules registered for a lower-cased resource type.
pub fn rules_for(resource_type: &str) -> impl Iterator<Item = &'static Rule> + '_ {
    RULES.iter().filter(move |r| r.resource_type == resource_type)
}

/// Resource types with at least one confirmed rule.
pub fn supported_types() -> Vec<&'static str> {
    RULES.iter().map(|r| r.resource_type).sorted().dedup().collect()
}

/// Container app -> its managed environment.
fn container_app_environment(
    resource: &Resource,
    ctx: &mut RuleContext<'_>,
) -> Result<Vec<String>, Box<dyn Error>> {
    let props = resource.properties();
    let mut ids = Vec::new();
    for key in ["managedEnvironmentId", "environmentId"] {
        if let Some(env_id) = str_at(props.get(key), key)? {
            ids.push(ctx.catalog.resolve_id(env_id));
        }
    }
    Ok(ids)
}

/// Registry hosts a container app pulls from: declared registries and image
/// references such as `myacr.azurecr.io/api:1.0`.
fn container_app_registry_servers(resource: &Resource) -> Result<Vec<String>, Box<dyn Error>> {
    let props = resource.properties();
    let mut servers = Vec::new();

    let registries = array_at(
        field_in(props, &["configuration", "registries"]),
        "configuration.registries",
    )?;
    for registry in registries {
        if let Some(server) = str_at(registry.get("server"), "configuration.registries[].server")? {
            servers.push(server.to_ascii_lowercase());
        }
    }

    let containers = array_at(
        field_in(props, &["template", "containers"]),
        "template.containers",
    )?;
    for container in containers {
        if let Some(image) = str_at(container.get("image"), "template.containers[].image")? {
            let host = image.split('/').next().unwrap_or("");
            if host.to_ascii_lowercase().ends_with(".azurecr.io") {
                servers.push(host.to_ascii_lowercase());
            }
        }
    }
    Ok(servers.into_iter().unique().collect())
}

/// Container app -> registries whose login server it pulls from.
///
/// Confirmed point to point: each registry's login server is looked up and
/// compared, no substring matching.
fn container_app_registry(
    resource: &Resource,
    ctx: &mut RuleContext<'_>,
) -> Result<Vec<String>, Box<dyn Error>> {
    let servers = container_app_registry_servers(resource)?;
    if servers.is_empty() {
        return Ok(vec![]);
    }

    let mut ids = Vec::new();
    for registry in ctx.catalog.of_type(CONTAINER_REGISTRY) {
        match ctx.lookup.login_server(registry) {
            Ok(Some(login_server)) => {
                if servers.iter().any(|s| s.eq_ignore_ascii_case(&login_server)) {
                    ids.push(registry.id().to_string());
                }
            }
            Ok(None) => log::debug!("registry '{}' has no login server", registry.name),
            Err(e) => ctx.diagnostics.record(
                Some(resource.id()),
                "lookup:login_server",
                format!("registry '{}': {e}", registry.name),
            ),
        }
    }
    Ok(ids)
}

/// Web app -> its App Service plan.
fn web_server_farm(
    resource: &Resource,
    ctx: &mut RuleContext<'_>,
) -> Result<Vec<String>, Box<dyn Error>> {
    let props = resource.properties();
    Ok(str_at(props.get("serverFarmId"), "serverFarmId")?
        .map(|id| ctx.catalog.resolve_id(id))
        .into_iter()
        .collect())
}

/// Values of the Application Insights connection string setting, from the
/// site config and from enriched app settings.
fn insights_connection_values(resource: &Resource) -> Result<Vec<&str>, Box<dyn Error>> {
    let mut values = Vec::new();

    let site_settings = array_at(
        field_in(resource.properties(), &["siteConfig", "appSettings"]),
        "siteConfig.appSettings",
    )?;
    for setting in site_settings {
        if setting.get("name").and_then(Value::as_str) == Some(INSIGHTS_CONNECTION_SETTING) {
            if let Some(value) = str_at(setting.get("value"), "siteConfig.appSettings[].value")? {
                values.push(value);
            }
        }
    }

    let env_settings = object_at(
        resource
            .environment_variables
            .as_ref()
            .and_then(|env| env.get("appSettings")),
        "environmentVariables.appSettings",
    )?;
    if let Some(value) = env_settings
        .and_then(|settings| settings.get(INSIGHTS_CONNECTION_SETTING))
        .and_then(Value::as_str)
    {
        values.push(value);
    }
    Ok(values)
}

/// Web app -> every insights component named in its connection string setting.
fn web_app_insights(
    resource: &Resource,
    ctx: &mut RuleContext<'_>,
) -> Result<Vec<String>, Box<dyn Error>> {
    let values = insights_connection_values(resource)?;
    if values.is_empty() {
        return Ok(vec![]);
    }
    Ok(ctx
        .catalog
        .of_type(APP_INSIGHTS)
        .filter(|insights| {
            !insights.name.is_empty() && values.iter().any(|v| v.contains(&insights.name))
        })
        .map(|insights| insights.id().to_string())
        .collect())
}

/// Virtual machine -> its network interfaces.
fn vm_network_interfaces(
    resource: &Resource,
    ctx: &mut RuleContext<'_>,
) -> Result<Vec<String>, Box<dyn Error>> {
    let nics = array_at(
        field_in(resource.properties(), &["networkProfile", "networkInterfaces"]),
        "networkProfile.networkInterfaces",
    )?;
    let mut ids = Vec::new();
    for nic in nics {
        if let Some(id) = str_at(nic.get("id"), "networkProfile.networkInterfaces[].id")? {
            ids.push(ctx.catalog.resolve_id(id));
        }
    }
    Ok(ids)
}

/// IP configurations of every NIC configuration of a scale set.
fn vmss_ip_configurations(resource: &Resource) -> Result<Vec<&Value>, Box<dyn Error>> {
    let nic_configs = array_at(
        field_in(
            resource.properties(),
            &["virtualMachineProfile", "networkProfile", "networkInterfaceConfigurations"],
        ),
        "virtualMachineProfile.networkProfile.networkInterfaceConfigurations",
    )?;
    let mut ip_configs = Vec::new();
    for nic_config in nic_configs {
        let configs = array_at(
            nic_config.get("properties").and_then(|p| p.get("ipConfigurations")),
            "networkInterfaceConfigurations[].properties.ipConfigurations",
        )?;
        ip_configs.extend(configs.iter());
    }
    Ok(ip_configs)
}

/// Virtual networks owning a subnet reference.
///
/// A subnet id is `<vnet id>/subnets/<name>`, so the parent network is the
/// one whose id the reference contains (case-insensitive).
pub fn subnet_parent_networks(subnet_id: &str, catalog: &Catalog) -> Vec<String> {
    let subnet_lower = subnet_id.to_ascii_lowercase();
    catalog
        .of_type(VIRTUAL_NETWORK)
        .filter(|vnet| {
            let needle = format!("{}/subnets/", vnet.id().to_ascii_lowercase());
            subnet_lower.contains(&needle)
        })
        .map(|vnet| vnet.id().to_string())
        .collect()
}

/// Scale set -> virtual networks of the subnets its NICs join.
fn vmss_virtual_networks(
    resource: &Resource,
    ctx: &mut RuleContext<'_>,
) -> Result<Vec<String>, Box<dyn Error>> {
    let mut ids = Vec::new();
    for ip_config in vmss_ip_configurations(resource)? {
        let subnet = ip_config
            .get("properties")
            .and_then(|p| p.get("subnet"))
            .and_then(|s| s.get("id"));
        if let Some(subnet_id) = str_at(subnet, "ipConfigurations[].properties.subnet.id")? {
            ids.extend(subnet_parent_networks(subnet_id, ctx.catalog));
        }
    }
    Ok(ids.into_iter().unique().collect())
}

/// Load balancer id from a backend pool or NAT pool id.
///
/// `/…/loadBalancers/lb1/backendAddressPools/pool` becomes `/…/loadBalancers/lb1`.
pub fn load_balancer_id(pool_id: &str) -> Option<&str> {
    const SEGMENT: &str = "/loadbalancers/";
    let start = pool_id.to_ascii_lowercase().find(SEGMENT)? + SEGMENT.len();
    let name_len = pool_id[start..].find('/').unwrap_or(pool_id.len() - start);
    if name_len == 0 {
        return None;
    }
    Some(&pool_id[..start + name_len])
}

/// Scale set -> load balancers behind its backend and inbound NAT pools.
fn vmss_load_balancers(
    resource: &Resource,
    ctx: &mut RuleContext<'_>,
) -> Result<Vec<String>, Box<dyn Error>> {
    let mut ids = Vec::new();
    for ip_config in vmss_ip_configurations(resource)? {
        let props = ip_config.get("properties");
        for pool_key in ["loadBalancerBackendAddressPools", "loadBalancerInboundNatPools"] {
            let pools = array_at(props.and_then(|p| p.get(pool_key)), pool_key)?;
            for pool in pools {
                if let Some(pool_id) = str_at(pool.get("id"), pool_key)? {
                    match load_balancer_id(pool_id) {
                        Some(lb_id) => ids.push(ctx.catalog.resolve_id(lb_id)),
                        None => log::debug!("no load balancer segment in '{pool_id}'"),
                    }
                }
            }
        }
    }
    Ok(ids.into_iter().unique().collect())
}

/// Storage account -> virtual networks allowed through its network rules.
fn storage_virtual_networks(
    resource: &Resource,
    ctx: &mut RuleContext<'_>,
) -> Result<Vec<String>, Box<dyn Error>> {
    let from_config = resource
        .specific_configuration
        .as_ref()
        .and_then(|c| c.get("networkRuleSet"))
        .and_then(|n| n.get("virtualNetworkRules"));
    let from_properties = field_in(
        resource.properties(),
        &["networkAcls", "virtualNetworkRules"],
    );

    let mut ids = Vec::new();
    for (rules, path) in [
        (from_config, "specificConfiguration.networkRuleSet.virtualNetworkRules"),
        (from_properties, "networkAcls.virtualNetworkRules"),
    ] {
        for rule in array_at(rules, path)? {
            let subnet = rule
                .get("id")
                .or_else(|| rule.get("virtualNetworkResourceId"));
            if let Some(subnet_id) = str_at(subnet, path)? {
                ids.extend(subnet_parent_networks(subnet_id, ctx.catalog));
            }
        }
    }
    Ok(ids.into_iter().unique().collect())
}

/// Metric alert -> the resources it watches.
fn metric_alert_scopes(
    resource: &Resource,
    ctx: &mut RuleContext<'_>,
) -> Result<Vec<String>, Box<dyn Error>> {
    let mut ids = Vec::new();
    for scope in array_at(resource.properties().get("scopes"), "scopes")? {
        if let Some(scope) = str_at(Some(scope), "scopes[]")? {
            if scope.starts_with("/subscriptions/") {
                ids.push(ctx.catalog.resolve_id(scope));
            }
        }
    }
    Ok(ids)
}

/// Autoscale setting -> scaled resource and metric sources.
fn autoscale_targets(
    resource: &Resource,
    ctx: &mut RuleContext<'_>,
) -> Result<Vec<String>, Box<dyn Error>> {
    let props = resource.properties();
    let mut ids = Vec::new();
    if let Some(target) = str_at(props.get("targetResourceUri"), "targetResourceUri")? {
        ids.push(ctx.catalog.resolve_id(target));
    }
    for profile in array_at(props.get("profiles"), "profiles")? {
        for rule in array_at(profile.get("rules"), "profiles[].rules")? {
            let uri = rule
                .get("metricTrigger")
                .and_then(|t| t.get("metricResourceUri"));
            if let Some(uri) = str_at(uri, "profiles[].rules[].metricTrigger.metricResourceUri")? {
                ids.push(ctx.catalog.resolve_id(uri));
            }
        }
    }
    Ok(ids.into_iter().unique().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::lookup::CatalogLoginServers;
    use serde_json::json;

    const SUB: &str = "/subscriptions/s/resourceGroups/rg/providers";

    fn run_rule(name: &str, resource: &Resource, others: &[Resource]) -> Vec<String> {
        let mut all = vec![resource.clone()];
        all.extend_from_slice(others);
        let mut diagnostics = Diagnostics::new();
        let catalog = Catalog::build(&all, &mut diagnostics);
        let mut lookup = CatalogLoginServers;
        let mut ctx = RuleContext {
            catalog: &catalog,
            lookup: &mut lookup,
            diagnostics: &mut diagnostics,
        };
        let rule = RULES.iter().find(|r| r.name == name).unwrap();
        let mut ids = (rule.apply)(resource, &mut ctx).unwrap();
        ids.sort();
        ids
    }

    #[test]
    fn test_registry_is_enumerable() {
        let types = supported_types();
        assert!(types.contains(&CONTAINER_APP));
        assert!(types.contains(&STORAGE_ACCOUNT));
        assert_eq!(rules_for(WEB_SITE).count(), 2);
        assert_eq!(rules_for("microsoft.unknown/things").count(), 0);
    }

    #[test]
    fn test_container_app_environment() {
        let env_id = format!("{SUB}/Microsoft.App/managedEnvironments/env1");
        let mut app = Resource::new("app", "app", CONTAINER_APP, "rg");
        app.properties = json!({ "managedEnvironmentId": env_id.to_lowercase() });
        let env = Resource::new(&env_id, "env1", MANAGED_ENVIRONMENT, "rg");
        assert_eq!(run_rule("container_app_environment", &app, &[env]), vec![env_id]);
    }

    #[test]
    fn test_container_app_registry_by_login_server() {
        let mut app = Resource::new("app", "app", CONTAINER_APP, "rg");
        app.properties = json!({
            "configuration": { "registries": [{ "server": "MyAcr.azurecr.io" }] },
            "template": { "containers": [{ "image": "otheracr.azurecr.io/api:1" }] }
        });
        let mut acr = Resource::new("acr1", "myacr", CONTAINER_REGISTRY, "rg");
        acr.properties = json!({ "loginServer": "myacr.azurecr.io" });
        let mut other = Resource::new("acr2", "otheracr", CONTAINER_REGISTRY, "rg");
        other.properties = json!({ "loginServer": "otheracr.azurecr.io" });
        let mut unused = Resource::new("acr3", "unused", CONTAINER_REGISTRY, "rg");
        unused.properties = json!({ "loginServer": "unused.azurecr.io" });
        assert_eq!(
            run_rule("container_app_registry", &app, &[acr, other, unused]),
            vec!["acr1", "acr2"]
        );
    }

    #[test]
    fn test_web_server_farm() {
        let mut app = Resource::new("app1id", "app1", WEB_SITE, "rg");
        app.properties = json!({ "serverFarmId": "plan1id" });
        let plan = Resource::new("plan1id", "plan1", SERVER_FARM, "rg");
        assert_eq!(run_rule("web_server_farm", &app, &[plan]), vec!["plan1id"]);
    }

    #[test]
    fn test_web_app_insights_all_matches() {
        let mut app = Resource::new("app", "app", WEB_SITE, "rg");
        app.properties = json!({ "siteConfig": { "appSettings": [
            { "name": INSIGHTS_CONNECTION_SETTING, "value": "InstrumentationKey=x;Name=ai-prod;ai-prod-eu" },
            { "name": "OTHER", "value": "ai-test" }
        ]}});
        let insights = [
            Resource::new("ai1", "ai-prod", APP_INSIGHTS, "rg"),
            Resource::new("ai2", "ai-prod-eu", APP_INSIGHTS, "rg"),
            Resource::new("ai3", "ai-test", APP_INSIGHTS, "rg"),
        ];
        assert_eq!(run_rule("web_app_insights", &app, &insights), vec!["ai1", "ai2"]);
    }

    #[test]
    fn test_web_app_insights_from_enriched_settings() {
        let mut app = Resource::new("app", "app", WEB_SITE, "rg");
        app.environment_variables = Some(json!({ "appSettings": {
            INSIGHTS_CONNECTION_SETTING: "endpoint=ai-prod"
        }}));
        let insights = Resource::new("ai1", "ai-prod", APP_INSIGHTS, "rg");
        assert_eq!(run_rule("web_app_insights", &app, &[insights]), vec!["ai1"]);
    }

    #[test]
    fn test_vm_network_interfaces() {
        let mut vm = Resource::new("vm", "vm", VIRTUAL_MACHINE, "rg");
        vm.properties = json!({ "networkProfile": { "networkInterfaces": [
            { "id": "nic1" }, { "id": "nic2" }, { "primary": true }
        ]}});
        assert_eq!(run_rule("vm_network_interfaces", &vm, &[]), vec!["nic1", "nic2"]);
    }

    #[test]
    fn test_vm_network_interfaces_schema_surprise() {
        let mut vm = Resource::new("vm", "vm", VIRTUAL_MACHINE, "rg");
        vm.properties = json!({ "networkProfile": { "networkInterfaces": "nic1" } });
        let mut diagnostics = Diagnostics::new();
        let catalog = Catalog::build(&[vm.clone()], &mut diagnostics);
        let mut lookup = CatalogLoginServers;
        let mut ctx = RuleContext {
            catalog: &catalog,
            lookup: &mut lookup,
            diagnostics: &mut diagnostics,
        };
        assert!(vm_network_interfaces(&vm, &mut ctx).is_err());
    }

    fn scale_set() -> Resource {
        let mut vmss = Resource::new("vmss", "vmss", VM_SCALE_SET, "rg");
        vmss.properties = json!({ "virtualMachineProfile": { "networkProfile": {
            "networkInterfaceConfigurations": [{ "properties": { "ipConfigurations": [{
                "properties": {
                    "subnet": { "id": format!("{SUB}/Microsoft.Network/virtualNetworks/vnet1/subnets/default") },
                    "loadBalancerBackendAddressPools": [
                        { "id": format!("{SUB}/Microsoft.Network/loadBalancers/lb1/backendAddressPools/pool") }
                    ],
                    "loadBalancerInboundNatPools": [
                        { "id": format!("{SUB}/Microsoft.Network/loadBalancers/lb1/inboundNatPools/nat") }
                    ]
                }
            }]}}]
        }}});
        vmss
    }

    #[test]
    fn test_vmss_virtual_networks() {
        let vnet1 = Resource::new(
            &format!("{SUB}/Microsoft.Network/virtualNetworks/vnet1"),
            "vnet1",
            VIRTUAL_NETWORK,
            "rg",
        );
        let vnet10 = Resource::new(
            &format!("{SUB}/Microsoft.Network/virtualNetworks/vnet10"),
            "vnet10",
            VIRTUAL_NETWORK,
            "rg",
        );
        assert_eq!(
            run_rule("vmss_virtual_networks", &scale_set(), &[vnet1, vnet10]),
            vec![format!("{SUB}/Microsoft.Network/virtualNetworks/vnet1")]
        );
    }

    #[test]
    fn test_vmss_load_balancers() {
        let lb = Resource::new(
            &format!("{SUB}/Microsoft.Network/loadBalancers/lb1"),
            "lb1",
            LOAD_BALANCER,
            "rg",
        );
        assert_eq!(
            run_rule("vmss_load_balancers", &scale_set(), &[lb]),
            vec![format!("{SUB}/Microsoft.Network/loadBalancers/lb1")]
        );
    }

    #[test]
    fn test_load_balancer_id() {
        assert_eq!(
            load_balancer_id("/x/providers/Microsoft.Network/loadBalancers/lb1/backendAddressPools/p"),
            Some("/x/providers/Microsoft.Network/loadBalancers/lb1")
        );
        assert_eq!(load_balancer_id("/x/loadBalancers/lb2"), Some("/x/loadBalancers/lb2"));
        assert_eq!(load_balancer_id("/x/loadBalancers/"), None);
        assert_eq!(load_balancer_id("/x/virtualNetworks/v"), None);
    }

    #[test]
    fn test_storage_virtual_networks() {
        let vnet_id = format!("{SUB}/Microsoft.Network/virtualNetworks/vnet1");
        let mut storage = Resource::new("st", "st", STORAGE_ACCOUNT, "rg");
        storage.specific_configuration = Some(json!({ "networkRuleSet": {
            "virtualNetworkRules": [{ "virtualNetworkResourceId": format!("{vnet_id}/subnets/app") }]
        }}));
        storage.properties = json!({ "networkAcls": {
            "virtualNetworkRules": [{ "id": format!("{vnet_id}/subnets/data") }]
        }});
        let vnet = Resource::new(&vnet_id, "vnet1", VIRTUAL_NETWORK, "rg");
        assert_eq!(run_rule("storage_virtual_networks", &storage, &[vnet]), vec![vnet_id]);
    }

    #[test]
    fn test_metric_alert_and_autoscale() {
        let mut alert = Resource::new("alert", "alert", METRIC_ALERT, "rg");
        alert.properties = json!({ "scopes": ["/subscriptions/s/x/app1", "not-an-id"] });
        assert_eq!(
            run_rule("metric_alert_scopes", &alert, &[]),
            vec!["/subscriptions/s/x/app1"]
        );

        let mut autoscale = Resource::new("as", "as", AUTOSCALE_SETTING, "rg");
        autoscale.properties = json!({
            "targetResourceUri": "/subscriptions/s/x/plan",
            "profiles": [{ "rules": [
                { "metricTrigger": { "metricResourceUri": "/subscriptions/s/x/plan" } },
                { "metricTrigger": { "metricResourceUri": "/subscriptions/s/x/queue" } }
            ]}]
        });
        assert_eq!(
            run_rule("autoscale_targets", &autoscale, &[]),
            vec!["/subscriptions/s/x/plan", "/subscriptions/s/x/queue"]
        );
    }
}
