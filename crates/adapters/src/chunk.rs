//! Chunk loading with bounded retries, plus loaded-chunk queries.

use std::sync::Arc;

use tickroute_core::{ExecutionTarget, WorldId};
use tickroute_scheduler::{LoadError, Pending, ResourceSource, Scheduler};

use crate::call::call_on;
use crate::host::WorldAccess;
use crate::model::ChunkPos;

/// Loads chunks through the host on the owning world's context.
pub struct ChunkSource<H> {
    host: Arc<H>,
}

impl<H: WorldAccess> ResourceSource for ChunkSource<H> {
    type Key = (WorldId, ChunkPos);
    type Resource = ChunkPos;

    fn owner(&self, key: &Self::Key) -> ExecutionTarget {
        ExecutionTarget::World(key.0)
    }

    fn try_load(&self, key: &Self::Key) -> Result<ChunkPos, LoadError> {
        let (world, chunk) = *key;
        if self.host.is_chunk_loaded(world, chunk) {
            return Ok(chunk);
        }
        self.host.load_chunk(world, chunk)
    }
}

pub struct ChunkOps<H> {
    scheduler: Arc<Scheduler>,
    host: Arc<H>,
    source: Arc<ChunkSource<H>>,
}

impl<H> Clone for ChunkOps<H> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            host: self.host.clone(),
            source: self.source.clone(),
        }
    }
}

impl<H: WorldAccess> ChunkOps<H> {
    pub fn new(scheduler: Arc<Scheduler>, host: Arc<H>) -> Self {
        let source = Arc::new(ChunkSource { host: host.clone() });
        Self { scheduler, host, source }
    }

    /// Load a chunk, retrying with the configured backoff up to `max_retries`
    /// attempts. Resolves to `None` when every attempt failed.
    pub fn load_chunk_with_retry(&self, world: WorldId, chunk: ChunkPos, max_retries: u64) -> Pending<Option<ChunkPos>> {
        self.scheduler
            .loader()
            .load_with_retry(self.source.clone(), (world, chunk), max_retries)
    }

    pub fn load_chunk(&self, world: WorldId, chunk: ChunkPos) -> Pending<Option<ChunkPos>> {
        self.scheduler
            .loader()
            .load_with_default_retry(self.source.clone(), (world, chunk))
    }

    pub fn is_chunk_loaded(&self, world: WorldId, chunk: ChunkPos) -> Pending<bool> {
        let host = self.host.clone();
        call_on(&self.scheduler, ExecutionTarget::World(world), move || host.is_chunk_loaded(world, chunk))
    }

    pub fn loaded_chunks(&self, world: WorldId) -> Pending<Vec<ChunkPos>> {
        let host = self.host.clone();
        call_on(&self.scheduler, ExecutionTarget::World(world), move || host.loaded_chunks(world))
    }

    pub fn unload_chunk(&self, world: WorldId, chunk: ChunkPos, save: bool) -> Pending<bool> {
        let host = self.host.clone();
        call_on(&self.scheduler, ExecutionTarget::World(world), move || {
            host.is_chunk_loaded(world, chunk) && host.unload_chunk(world, chunk, save)
        })
    }

    /// Generate the chunk if it has never been generated. Resolves to whether
    /// the chunk exists afterwards.
    pub fn ensure_generated(&self, world: WorldId, chunk: ChunkPos) -> Pending<bool> {
        let host = self.host.clone();
        call_on(&self.scheduler, ExecutionTarget::World(world), move || {
            if host.is_chunk_generated(world, chunk) {
                return true;
            }
            match host.load_chunk(world, chunk) {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(%world, x = chunk.x, z = chunk.z, error = %e, "chunk generation failed");
                    false
                }
            }
        })
    }

    /// Loaded chunks within the square of `radius` chunks around `center`.
    pub fn chunks_in_radius(&self, world: WorldId, center: ChunkPos, radius: u32) -> Pending<Vec<ChunkPos>> {
        let host = self.host.clone();
        call_on(&self.scheduler, ExecutionTarget::World(world), move || {
            center
                .square(radius)
                .filter(|chunk| host.is_chunk_loaded(world, *chunk))
                .collect()
        })
    }

    /// Load every chunk in the square around `center`; resolves to how many
    /// are loaded afterwards.
    pub fn preload(&self, world: WorldId, center: ChunkPos, radius: u32) -> Pending<usize> {
        let host = self.host.clone();
        call_on(&self.scheduler, ExecutionTarget::World(world), move || {
            let mut loaded = 0;
            for chunk in center.square(radius) {
                if host.is_chunk_loaded(world, chunk) || host.load_chunk(world, chunk).is_ok() {
                    loaded += 1;
                }
            }
            tracing::debug!(%world, loaded, radius, "preloaded chunks");
            loaded
        })
    }
}
