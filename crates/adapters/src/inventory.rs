//! Inventory access with player affinity. Offline players are skipped.

use std::sync::Arc;

use tickroute_core::{ExecutionTarget, PlayerId};
use tickroute_scheduler::{Pending, Scheduler};

use crate::call::call_on;
use crate::host::InventoryAccess;
use crate::model::{ItemStack, Material};

pub struct InventoryOps<H> {
    scheduler: Arc<Scheduler>,
    host: Arc<H>,
}

impl<H> Clone for InventoryOps<H> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            host: self.host.clone(),
        }
    }
}

impl<H: InventoryAccess> InventoryOps<H> {
    pub fn new(scheduler: Arc<Scheduler>, host: Arc<H>) -> Self {
        Self { scheduler, host }
    }

    /// Run `op` on the player's context if they are online, else resolve to `offline`.
    fn on_player<T, F>(&self, player: PlayerId, offline: T, op: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(&H) -> T + Send + 'static,
    {
        let host = self.host.clone();
        call_on(&self.scheduler, ExecutionTarget::Player(player), move || {
            if host.is_online(player) {
                op(host.as_ref())
            } else {
                tracing::debug!(%player, "player offline, skipping inventory operation");
                offline
            }
        })
    }

    pub fn open_inventory(&self, player: PlayerId, title: impl Into<String>) -> Pending<bool> {
        let title = title.into();
        self.on_player(player, false, move |host| host.open_inventory(player, &title))
    }

    pub fn update_inventory(&self, player: PlayerId) -> Pending<bool> {
        self.on_player(player, false, move |host| host.update_inventory(player))
    }

    pub fn contents(&self, player: PlayerId) -> Pending<Option<Vec<ItemStack>>> {
        self.on_player(player, None, move |host| host.contents(player))
    }

    /// Resolves to `true` when every item fit.
    pub fn add_items(&self, player: PlayerId, items: Vec<ItemStack>) -> Pending<bool> {
        self.on_player(player, false, move |host| {
            let leftover = host.add_items(player, &items);
            if !leftover.is_empty() {
                tracing::debug!(%player, leftover = leftover.len(), "inventory full");
            }
            leftover.is_empty()
        })
    }

    /// Resolves to the number of items removed.
    pub fn remove_items(&self, player: PlayerId, items: Vec<ItemStack>) -> Pending<u32> {
        self.on_player(player, 0, move |host| host.remove_items(player, &items))
    }

    /// Whether the player carries at least `amount` of `material` across all stacks.
    pub fn has_item(&self, player: PlayerId, material: Material, amount: u32) -> Pending<bool> {
        self.on_player(player, false, move |host| {
            let total: u64 = host
                .contents(player)
                .unwrap_or_default()
                .iter()
                .filter(|stack| stack.material == material)
                .map(|stack| u64::from(stack.amount))
                .sum();
            total >= u64::from(amount)
        })
    }
}
