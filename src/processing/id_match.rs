//! Phase 1: global id containment.
//!
//! ARM ids are unique path strings, so one resource's id appearing verbatim in
//! another's documents is a strong dependency signal. This is O(N²) in catalog
//! size times blob length, fine for subscription-sized inventories (hundreds to
//! low thousands of resources) and the main scaling limit of the engine.

use super::blob::combined_blob;
use crate::models::{Catalog, Resource};

/// Ids of other catalog resources found verbatim in `resource`'s blob.
pub fn ids_referenced_by<'a>(resource: &Resource, catalog: &'a Catalog) -> Vec<&'a str> {
    let blob = combined_blob(resource);
    catalog
        .ids()
        .filter(|id| *id != resource.id() && blob.contains(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Diagnostics;
    use serde_json::json;

    #[test]
    fn test_finds_ids_in_any_document() {
        let nic_id = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/networkInterfaces/nic1";
        let kv_id = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/kv1";
        let mut vm = Resource::new("vm1", "vm1", "microsoft.compute/virtualmachines", "rg");
        vm.properties = json!({ "networkProfile": { "networkInterfaces": [{ "id": nic_id }] } });
        vm.specific_configuration = Some(json!({ "secretsVault": kv_id }));
        let mut diagnostics = Diagnostics::new();
        let catalog = Catalog::build(
            &[
                vm.clone(),
                Resource::new(nic_id, "nic1", "microsoft.network/networkinterfaces", "rg"),
                Resource::new(kv_id, "kv1", "microsoft.keyvault/vaults", "rg"),
                Resource::new("/unrelated", "other", "microsoft.web/sites", "rg"),
            ],
            &mut diagnostics,
        );
        let mut found = ids_referenced_by(&vm, &catalog);
        found.sort();
        assert_eq!(found, vec![kv_id, nic_id]);
    }

    #[test]
    fn test_never_matches_itself() {
        let mut app = Resource::new("/self", "app", "microsoft.web/sites", "rg");
        app.properties = json!({ "selfLink": "/self" });
        let mut diagnostics = Diagnostics::new();
        let catalog = Catalog::build(&[app.clone()], &mut diagnostics);
        assert!(ids_referenced_by(&app, &catalog).is_empty());
    }
}
