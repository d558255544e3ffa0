//! Inventory adapter: player affinity and offline handling.

mod common;

use common::{embedded, legacy, resolve, MemoryHost};
use tickroute_adapters::{InventoryOps, ItemStack, Material};
use tickroute_scheduler::{BackendCapability, PlayerId};

#[test]
fn add_reports_whether_everything_fit() {
    let host = MemoryHost::new();
    let world = host.add_world("overworld");
    let alex = host.add_player(world, "alex", true);
    let scheduler = embedded(&host);
    let inventory = InventoryOps::new(scheduler.clone(), host.clone());

    let three = vec![ItemStack::new(Material::Stone, 64); 3];
    assert!(resolve(&scheduler, inventory.add_items(alex, three)));
    // Capacity is four stacks.
    let two = vec![ItemStack::new(Material::Dirt, 10); 2];
    assert!(!resolve(&scheduler, inventory.add_items(alex, two)));

    let contents = resolve(&scheduler, inventory.contents(alex)).unwrap();
    assert_eq!(contents.len(), 4);
    assert!(host.threads().iter().all(|t| t.starts_with("tickroute-region")));
}

#[test]
fn has_item_sums_across_stacks_and_remove_counts() {
    let host = MemoryHost::new();
    let world = host.add_world("overworld");
    let alex = host.add_player(world, "alex", true);
    let scheduler = legacy();
    assert_eq!(scheduler.capability(), BackendCapability::GlobalThread);
    let inventory = InventoryOps::new(scheduler.clone(), host.clone());

    let items = vec![ItemStack::new(Material::Sand, 40), ItemStack::new(Material::Sand, 30)];
    assert!(resolve(&scheduler, inventory.add_items(alex, items)));
    assert!(resolve(&scheduler, inventory.has_item(alex, Material::Sand, 70)));
    assert!(!resolve(&scheduler, inventory.has_item(alex, Material::Sand, 71)));
    assert!(!resolve(&scheduler, inventory.has_item(alex, Material::Gravel, 1)));

    let removed = resolve(&scheduler, inventory.remove_items(alex, vec![ItemStack::new(Material::Sand, 50)]));
    assert_eq!(removed, 50);
    assert!(resolve(&scheduler, inventory.has_item(alex, Material::Sand, 20)));
    assert!(!resolve(&scheduler, inventory.has_item(alex, Material::Sand, 21)));
}

#[test]
fn offline_players_are_skipped() {
    let host = MemoryHost::new();
    let world = host.add_world("overworld");
    let sam = host.add_player(world, "sam", false);
    let scheduler = embedded(&host);
    let inventory = InventoryOps::new(scheduler.clone(), host.clone());

    assert!(!resolve(&scheduler, inventory.open_inventory(sam, "Chest")));
    assert!(!resolve(&scheduler, inventory.update_inventory(sam)));
    assert_eq!(resolve(&scheduler, inventory.contents(sam)), None);
    assert_eq!(resolve(&scheduler, inventory.remove_items(sam, vec![ItemStack::new(Material::Stone, 1)])), 0);
    assert!(host.state().opened.is_empty());

    // Never connected to the region backend: served by the fallback.
    assert!(scheduler.metrics().affinity_failures >= 1);
}

#[test]
fn open_inventory_records_title() {
    let host = MemoryHost::new();
    let world = host.add_world("overworld");
    let alex = host.add_player(world, "alex", true);
    let scheduler = embedded(&host);
    let inventory = InventoryOps::new(scheduler.clone(), host.clone());

    assert!(resolve(&scheduler, inventory.open_inventory(alex, "Backpack")));
    assert!(resolve(&scheduler, inventory.update_inventory(alex)));
    assert_eq!(host.state().opened, vec![(alex, "Backpack".to_string())]);
    assert!(!resolve(&scheduler, inventory.open_inventory(PlayerId::new(), "Nobody")));
}
