#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tickroute_adapters::{
    BlockPos, ChunkPos, EntityAccess, EntitySnapshot, InventoryAccess, ItemStack, Location, Material, PhysicsAccess,
    PlayerSnapshot, SoundAccess, SoundKey, Vector, WorldAccess,
};
use tickroute_scheduler::{EntityId, LoadError, Pending, PlayerId, Scheduler, SchedulerConfig, WorldId};

pub const TIMEOUT: Duration = Duration::from_secs(5);
const MAX_TICKS: usize = 500;

#[derive(Default)]
pub struct MemoryWorld {
    pub name: String,
    pub blocks: HashMap<BlockPos, Material>,
    pub loaded: HashSet<ChunkPos>,
    pub generated: HashSet<ChunkPos>,
    /// Remaining `NotReady` answers per chunk before it loads.
    pub busy: HashMap<ChunkPos, u32>,
    pub broken: HashSet<ChunkPos>,
}

#[derive(Default)]
pub struct HostState {
    pub worlds: HashMap<WorldId, MemoryWorld>,
    pub order: Vec<WorldId>,
    pub entities: HashMap<EntityId, EntitySnapshot>,
    pub players: HashMap<PlayerId, PlayerSnapshot>,
    pub inventories: HashMap<PlayerId, Vec<ItemStack>>,
    pub opened: Vec<(PlayerId, String)>,
    pub sounds: Vec<SoundKey>,
    pub played: Vec<(String, SoundKey)>,
    pub stopped: Vec<(PlayerId, Option<SoundKey>)>,
    pub physics_updates: Vec<(WorldId, BlockPos)>,
    pub load_attempts: u32,
    /// Thread name of every host call, in call order.
    pub threads: Vec<String>,
}

/// In-memory game engine.
pub struct MemoryHost {
    state: Mutex<HostState>,
    pub stack_capacity: usize,
}

impl MemoryHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(HostState {
                sounds: vec![
                    SoundKey::new("entity.zombie.ambient"),
                    SoundKey::new("block.note_block.harp"),
                    SoundKey::new("ui.button.click"),
                ],
                ..HostState::default()
            }),
            stack_capacity: 4,
        })
    }

    pub fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap()
    }

    /// Lock and record the calling thread.
    fn enter(&self) -> MutexGuard<'_, HostState> {
        let mut state = self.state();
        let thread = std::thread::current().name().unwrap_or("unnamed").to_string();
        state.threads.push(thread);
        state
    }

    pub fn add_world(&self, name: &str) -> WorldId {
        let id = WorldId::new();
        let mut state = self.state();
        state.worlds.insert(
            id,
            MemoryWorld {
                name: name.to_string(),
                ..MemoryWorld::default()
            },
        );
        state.order.push(id);
        id
    }

    pub fn add_entity(&self, world: WorldId, kind: &str, location: (f64, f64, f64), on_ground: bool) -> EntityId {
        let id = EntityId::new();
        self.state().entities.insert(
            id,
            EntitySnapshot {
                id,
                kind: kind.to_string(),
                location: Location::new(world, location.0, location.1, location.2),
                velocity: Vector::default(),
                on_ground,
                valid: true,
            },
        );
        id
    }

    pub fn add_player(&self, world: WorldId, name: &str, online: bool) -> PlayerId {
        let id = PlayerId::new();
        let mut state = self.state();
        state.players.insert(
            id,
            PlayerSnapshot {
                id,
                name: name.to_string(),
                world,
                online,
            },
        );
        state.inventories.insert(id, Vec::new());
        id
    }

    pub fn velocity(&self, id: EntityId) -> Vector {
        self.state().entities[&id].velocity
    }

    pub fn threads(&self) -> Vec<String> {
        self.state().threads.clone()
    }
}

impl WorldAccess for MemoryHost {
    fn world_by_name(&self, name: &str) -> Option<WorldId> {
        let state = self.enter();
        state.worlds.iter().find(|(_, w)| w.name == name).map(|(id, _)| *id)
    }

    fn worlds(&self) -> Vec<WorldId> {
        self.enter().order.clone()
    }

    fn block_at(&self, world: WorldId, pos: BlockPos) -> Option<Material> {
        let state = self.enter();
        let world = state.worlds.get(&world)?;
        Some(world.blocks.get(&pos).cloned().unwrap_or(Material::Air))
    }

    fn set_block(&self, world: WorldId, pos: BlockPos, material: Material) -> bool {
        let mut state = self.enter();
        match state.worlds.get_mut(&world) {
            Some(world) => world.blocks.insert(pos, material.clone()) != Some(material),
            None => false,
        }
    }

    fn loaded_chunks(&self, world: WorldId) -> Vec<ChunkPos> {
        let state = self.enter();
        let mut chunks: Vec<_> = state
            .worlds
            .get(&world)
            .map(|w| w.loaded.iter().copied().collect())
            .unwrap_or_default();
        chunks.sort_by_key(|c| (c.x, c.z));
        chunks
    }

    fn is_chunk_loaded(&self, world: WorldId, chunk: ChunkPos) -> bool {
        self.enter().worlds.get(&world).is_some_and(|w| w.loaded.contains(&chunk))
    }

    fn is_chunk_generated(&self, world: WorldId, chunk: ChunkPos) -> bool {
        self.enter().worlds.get(&world).is_some_and(|w| w.generated.contains(&chunk))
    }

    fn load_chunk(&self, world: WorldId, chunk: ChunkPos) -> Result<ChunkPos, LoadError> {
        let mut state = self.enter();
        state.load_attempts += 1;
        let Some(world) = state.worlds.get_mut(&world) else {
            return Err(LoadError::Unrecoverable("no such world".into()));
        };
        if world.broken.contains(&chunk) {
            return Err(LoadError::Unrecoverable(format!("chunk {chunk:?} corrupt")));
        }
        if let Some(remaining) = world.busy.get_mut(&chunk) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(LoadError::NotReady(format!("chunk {chunk:?} generating")));
            }
        }
        world.generated.insert(chunk);
        world.loaded.insert(chunk);
        Ok(chunk)
    }

    fn unload_chunk(&self, world: WorldId, chunk: ChunkPos, _save: bool) -> bool {
        let mut state = self.enter();
        state.worlds.get_mut(&world).is_some_and(|w| w.loaded.remove(&chunk))
    }
}

impl EntityAccess for MemoryHost {
    fn entities(&self, world: WorldId) -> Vec<EntitySnapshot> {
        let state = self.enter();
        let mut entities: Vec<_> = state
            .entities
            .values()
            .filter(|e| e.location.world == world)
            .cloned()
            .collect();
        entities.sort_by_key(|e| e.id);
        entities
    }

    fn entity(&self, id: EntityId) -> Option<EntitySnapshot> {
        self.enter().entities.get(&id).cloned()
    }

    fn players(&self, world: WorldId) -> Vec<PlayerSnapshot> {
        let state = self.enter();
        let mut players: Vec<_> = state.players.values().filter(|p| p.world == world).cloned().collect();
        players.sort_by(|a, b| a.name.cmp(&b.name));
        players
    }

    fn set_velocity(&self, id: EntityId, velocity: Vector) -> bool {
        let mut state = self.enter();
        match state.entities.get_mut(&id) {
            Some(entity) if entity.valid => {
                entity.velocity = velocity;
                true
            }
            _ => false,
        }
    }
}

impl InventoryAccess for MemoryHost {
    fn is_online(&self, player: PlayerId) -> bool {
        self.enter().players.get(&player).is_some_and(|p| p.online)
    }

    fn open_inventory(&self, player: PlayerId, title: &str) -> bool {
        self.enter().opened.push((player, title.to_string()));
        true
    }

    fn update_inventory(&self, _player: PlayerId) -> bool {
        self.enter();
        true
    }

    fn contents(&self, player: PlayerId) -> Option<Vec<ItemStack>> {
        self.enter().inventories.get(&player).cloned()
    }

    fn add_items(&self, player: PlayerId, items: &[ItemStack]) -> Vec<ItemStack> {
        let capacity = self.stack_capacity;
        let mut state = self.enter();
        let Some(inventory) = state.inventories.get_mut(&player) else {
            return items.to_vec();
        };
        let mut leftover = Vec::new();
        for item in items {
            if inventory.len() < capacity {
                inventory.push(item.clone());
            } else {
                leftover.push(item.clone());
            }
        }
        leftover
    }

    fn remove_items(&self, player: PlayerId, items: &[ItemStack]) -> u32 {
        let mut state = self.enter();
        let Some(inventory) = state.inventories.get_mut(&player) else {
            return 0;
        };
        let mut removed = 0;
        for wanted in items {
            let mut remaining = wanted.amount;
            for stack in inventory.iter_mut().filter(|s| s.material == wanted.material) {
                let take = remaining.min(stack.amount);
                stack.amount -= take;
                remaining -= take;
                removed += take;
            }
        }
        inventory.retain(|s| s.amount > 0);
        removed
    }
}

impl SoundAccess for MemoryHost {
    fn known_sounds(&self) -> Vec<SoundKey> {
        self.enter().sounds.clone()
    }

    fn play_at(&self, location: &Location, sound: &SoundKey, _volume: f32, _pitch: f32) {
        self.enter().played.push((format!("world:{}", location.world), sound.clone()));
    }

    fn play_at_entity(&self, entity: EntityId, sound: &SoundKey, _volume: f32, _pitch: f32) -> bool {
        let mut state = self.enter();
        if !state.entities.contains_key(&entity) {
            return false;
        }
        state.played.push((format!("entity:{entity}"), sound.clone()));
        true
    }

    fn play_to_player(&self, player: PlayerId, sound: &SoundKey, _volume: f32, _pitch: f32) -> bool {
        self.enter().played.push((format!("player:{player}"), sound.clone()));
        true
    }

    fn stop_all(&self, player: PlayerId) {
        self.enter().stopped.push((player, None));
    }

    fn stop(&self, player: PlayerId, sound: &SoundKey) {
        self.enter().stopped.push((player, Some(sound.clone())));
    }

    fn player_online(&self, player: PlayerId) -> bool {
        self.enter().players.get(&player).is_some_and(|p| p.online)
    }
}

impl PhysicsAccess for MemoryHost {
    fn trigger_update(&self, world: WorldId, pos: BlockPos) -> bool {
        self.enter().physics_updates.push((world, pos));
        true
    }
}

/// Scheduler config driven by explicit `tick` calls. Also installs the log
/// subscriber so failing suites show the scheduler's traces.
pub fn manual_config() -> SchedulerConfig {
    tickroute_core::telemetry::init_tracing("warn");
    SchedulerConfig {
        fallback_workers: 2,
        region_workers: 2,
        retry_backoff_ticks: 5,
        drive_ticks: false,
        ..SchedulerConfig::default()
    }
}

/// Region-threaded scheduler with every world, entity and online player of
/// `host` registered.
pub fn embedded(host: &MemoryHost) -> Arc<Scheduler> {
    let scheduler = Scheduler::embedded(manual_config()).unwrap();
    let region = scheduler.region().unwrap();
    let state = host.state();
    for world in &state.order {
        region.load_world(*world);
    }
    for entity in state.entities.keys() {
        region.spawn_entity(*entity);
    }
    for player in state.players.values().filter(|p| p.online) {
        region.connect_player(player.id);
    }
    scheduler
}

pub fn legacy() -> Arc<Scheduler> {
    Scheduler::legacy(manual_config()).unwrap()
}

/// Tick `scheduler` until `pending` resolves.
pub fn resolve<T>(scheduler: &Scheduler, mut pending: Pending<T>) -> T {
    for _ in 0..MAX_TICKS {
        if let Some(value) = pending.try_take().unwrap() {
            return value;
        }
        scheduler.tick();
        assert!(scheduler.wait_idle(TIMEOUT));
    }
    panic!("pending value did not resolve within {MAX_TICKS} ticks");
}

/// Advance `scheduler` by `n` ticks, waiting for fallback work each time.
pub fn ticks(scheduler: &Scheduler, n: usize) {
    for _ in 0..n {
        scheduler.tick();
        assert!(scheduler.wait_idle(TIMEOUT));
    }
}
