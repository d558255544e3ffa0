use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::ids::{EntityId, PlayerId, WorldId};

/// Where a unit of work must run. Says nothing about *when*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionTarget {
    /// The global context (server-wide state not owned by any region).
    Global,
    /// The context owning a world.
    World(WorldId),
    /// The context currently owning an entity.
    Entity(EntityId),
    /// The context currently owning a player.
    Player(PlayerId),
    /// Any worker; no affinity at all.
    PlainAsync,
}

impl ExecutionTarget {
    /// Stable label used in logs and metrics.
    pub fn route(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::World(_) => "world",
            Self::Entity(_) => "entity",
            Self::Player(_) => "player",
            Self::PlainAsync => "async",
        }
    }

    /// Whether the target names an affinity context (anything but plain async).
    pub fn has_affinity(&self) -> bool {
        !matches!(self, Self::PlainAsync)
    }

    /// Reject structurally invalid targets (nil identifiers).
    ///
    /// Such a submission would fail on every backend, so it is never retried.
    pub fn validate(&self) -> Result<(), DispatchError> {
        let nil = match self {
            Self::World(id) => id.is_nil(),
            Self::Entity(id) => id.is_nil(),
            Self::Player(id) => id.is_nil(),
            Self::Global | Self::PlainAsync => false,
        };
        if nil {
            Err(DispatchError::InvalidTarget {
                reason: format!("{} target has a nil id", self.route()),
            })
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Display for ExecutionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::World(id) => write!(f, "world:{id}"),
            Self::Entity(id) => write!(f, "entity:{id}"),
            Self::Player(id) => write!(f, "player:{id}"),
            Self::PlainAsync => write!(f, "async"),
        }
    }
}
