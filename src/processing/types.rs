//! Lower-cased Azure resource type names used by the rules.

pub const CONTAINER_APP: &str = "microsoft.app/containerapps";
pub const MANAGED_ENVIRONMENT: &str = "microsoft.app/managedenvironments";
pub const CONTAINER_REGISTRY: &str = "microsoft.containerregistry/registries";
pub const CONTAINER_GROUP: &str = "microsoft.containerinstance/containergroups";
pub const WEB_SITE: &str = "microsoft.web/sites";
pub const SERVER_FARM: &str = "microsoft.web/serverfarms";
pub const APP_INSIGHTS: &str = "microsoft.insights/components";
pub const METRIC_ALERT: &str = "microsoft.insights/metricalerts";
pub const AUTOSCALE_SETTING: &str = "microsoft.insights/autoscalesettings";
pub const VIRTUAL_MACHINE: &str = "microsoft.compute/virtualmachines";
pub const VM_SCALE_SET: &str = "microsoft.compute/virtualmachinescalesets";
pub const VIRTUAL_NETWORK: &str = "microsoft.network/virtualnetworks";
pub const NETWORK_INTERFACE: &str = "microsoft.network/networkinterfaces";
pub const LOAD_BALANCER: &str = "microsoft.network/loadbalancers";
pub const PUBLIC_IP: &str = "microsoft.network/publicipaddresses";
pub const STORAGE_ACCOUNT: &str = "microsoft.storage/storageaccounts";
pub const KEY_VAULT: &str = "microsoft.keyvault/vaults";
pub const SQL_SERVER: &str = "microsoft.sql/servers";
pub const SQL_DATABASE: &str = "microsoft.sql/servers/databases";
pub const COSMOS_ACCOUNT: &str = "microsoft.documentdb/databaseaccounts";
pub const POSTGRES_SERVER: &str = "microsoft.dbforpostgresql/servers";
pub const POSTGRES_FLEXIBLE: &str = "microsoft.dbforpostgresql/flexibleservers";
pub const MYSQL_SERVER: &str = "microsoft.dbformysql/servers";
pub const MYSQL_FLEXIBLE: &str = "microsoft.dbformysql/flexibleservers";
pub const SERVICE_BUS: &str = "microsoft.servicebus/namespaces";
pub const EVENT_HUB: &str = "microsoft.eventhub/namespaces";
pub const REDIS: &str = "microsoft.cache/redis";
pub const SIGNALR: &str = "microsoft.signalrservice/signalr";
pub const WEB_PUBSUB: &str = "microsoft.signalrservice/webpubsub";
pub const API_MANAGEMENT: &str = "microsoft.apimanagement/service";
pub const DASHBOARD: &str = "microsoft.portal/dashboards";
