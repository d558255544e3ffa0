//! Plain values exchanged with the host: positions, blocks, items, sounds.

use serde::{Deserialize, Serialize};

use tickroute_core::{EntityId, PlayerId, WorldId};

/// Blocks per chunk edge.
pub const CHUNK_SIZE: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Every chunk in the square of side `2 * radius + 1` around `self`, row by row.
    /// Clipped at the edges of the coordinate space.
    pub fn square(self, radius: u32) -> impl Iterator<Item = ChunkPos> {
        let r = i32::try_from(radius).unwrap_or(i32::MAX);
        let (x0, x1) = (self.x.saturating_sub(r), self.x.saturating_add(r));
        let (z0, z1) = (self.z.saturating_sub(r), self.z.saturating_add(r));
        (x0..=x1).flat_map(move |x| (z0..=z1).map(move |z| ChunkPos { x, z }))
    }

    /// The block at the chunk's origin corner, `y` blocks up.
    pub fn origin(self, y: i32) -> BlockPos {
        BlockPos::new(self.x.saturating_mul(CHUNK_SIZE), y, self.z.saturating_mul(CHUNK_SIZE))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn chunk(self) -> ChunkPos {
        ChunkPos::new(self.x.div_euclid(CHUNK_SIZE), self.z.div_euclid(CHUNK_SIZE))
    }
}

/// A point in a world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: WorldId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(world: WorldId, x: f64, y: f64, z: f64) -> Self {
        Self { world, x, y, z }
    }

    pub fn block(&self) -> BlockPos {
        BlockPos::new(self.x.floor() as i32, self.y.floor() as i32, self.z.floor() as i32)
    }

    pub fn chunk(&self) -> ChunkPos {
        self.block().chunk()
    }

    /// Euclidean distance, or `None` across worlds.
    pub fn distance(&self, other: &Location) -> Option<f64> {
        if self.world != other.world {
            return None;
        }
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        Some((dx * dx + dy * dy + dz * dz).sqrt())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl std::ops::Add for Vector {
    type Output = Vector;

    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    Air,
    Stone,
    Dirt,
    Grass,
    Sand,
    Gravel,
    Water,
    Lava,
    Glass,
    Torch,
    Other(String),
}

impl Material {
    pub fn is_solid(&self) -> bool {
        matches!(
            self,
            Self::Stone | Self::Dirt | Self::Grass | Self::Sand | Self::Gravel | Self::Glass
        )
    }

    pub fn has_gravity(&self) -> bool {
        matches!(self, Self::Sand | Self::Gravel)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub material: Material,
    pub amount: u32,
}

impl ItemStack {
    pub fn new(material: Material, amount: u32) -> Self {
        Self { material, amount }
    }
}

/// Namespaced sound identifier, e.g. `entity.zombie.ambient`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoundKey(pub String);

impl SoundKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive match that also accepts `ENTITY_ZOMBIE_AMBIENT` style names.
    pub fn matches_name(&self, name: &str) -> bool {
        let normalized = name.replace('_', ".");
        self.0.eq_ignore_ascii_case(&normalized) || self.0.eq_ignore_ascii_case(name)
    }
}

impl std::fmt::Display for SoundKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One step of a sound sequence; `delay_ticks` is the gap before the next step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundCue {
    pub location: Location,
    pub sound: SoundKey,
    pub volume: f32,
    pub pitch: f32,
    pub delay_ticks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: String,
    pub location: Location,
    pub velocity: Vector,
    pub on_ground: bool,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub world: WorldId,
    pub online: bool,
}

/// Sphere around a location used to scope physics work.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsRegion {
    pub center: Location,
    pub radius: u32,
}

impl PhysicsRegion {
    pub const DEFAULT_RADIUS: u32 = 16;

    pub fn new(center: Location, radius: u32) -> Self {
        Self { center, radius }
    }

    pub fn contains(&self, location: &Location) -> bool {
        self.center
            .distance(location)
            .is_some_and(|d| d <= f64::from(self.radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_blocks_map_to_negative_chunks() {
        assert_eq!(BlockPos::new(-1, 64, 15).chunk(), ChunkPos::new(-1, 0));
        assert_eq!(BlockPos::new(-16, 0, -17).chunk(), ChunkPos::new(-1, -2));
        assert_eq!(BlockPos::new(16, 0, 31).chunk(), ChunkPos::new(1, 1));
    }

    #[test]
    fn square_covers_radius() {
        let chunks: Vec<_> = ChunkPos::new(0, 0).square(1).collect();
        assert_eq!(chunks.len(), 9);
        assert!(chunks.contains(&ChunkPos::new(-1, 1)));
        assert_eq!(ChunkPos::new(3, 3).square(0).collect::<Vec<_>>(), vec![ChunkPos::new(3, 3)]);
    }

    #[test]
    fn square_is_clipped_at_coordinate_limits() {
        let edge: Vec<_> = ChunkPos::new(i32::MAX, i32::MIN).square(1).collect();
        assert_eq!(edge.len(), 4);
        assert!(edge.contains(&ChunkPos::new(i32::MAX - 1, i32::MIN + 1)));

        let first = ChunkPos::new(0, 0).square(u32::MAX).next();
        assert_eq!(first, Some(ChunkPos::new(-i32::MAX, -i32::MAX)));
        assert_eq!(ChunkPos::new(i32::MAX, 0).origin(64).x, i32::MAX);
    }

    #[test]
    fn region_contains_by_distance_in_same_world() {
        let world = WorldId::new();
        let region = PhysicsRegion::new(Location::new(world, 0.0, 64.0, 0.0), PhysicsRegion::DEFAULT_RADIUS);
        assert!(region.contains(&Location::new(world, 16.0, 64.0, 0.0)));
        assert!(!region.contains(&Location::new(world, 12.0, 64.0, 12.0)));
        assert!(!region.contains(&Location::new(WorldId::new(), 0.0, 64.0, 0.0)));
    }

    #[test]
    fn sound_names_match_both_styles() {
        let key = SoundKey::new("entity.zombie.ambient");
        assert!(key.matches_name("ENTITY_ZOMBIE_AMBIENT"));
        assert!(key.matches_name("entity.zombie.ambient"));
        assert!(!key.matches_name("entity.zombie.hurt"));
    }

    #[test]
    fn gravity_blocks_are_solid() {
        assert!(Material::Sand.has_gravity() && Material::Sand.is_solid());
        assert!(!Material::Water.is_solid());
        assert!(!Material::Air.has_gravity());
    }
}
