//! Sound playback routed to the context that owns the listener or location.

use std::sync::Arc;

use tickroute_core::{EntityId, ExecutionTarget, PlayerId, WorldId};
use tickroute_scheduler::{pending, Pending, Scheduler, TaskHandle};

use crate::call::call_on;
use crate::host::SoundAccess;
use crate::model::{Location, SoundCue, SoundKey};

/// Cues started by [`SoundOps::play_sequence`].
pub struct PlayingSequence {
    pub handles: Vec<TaskHandle>,
    /// Resolves once the last cue has played; `Abandoned` if it never does.
    pub finished: Pending<()>,
}

pub struct SoundOps<H> {
    scheduler: Arc<Scheduler>,
    host: Arc<H>,
}

impl<H> Clone for SoundOps<H> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
            host: self.host.clone(),
        }
    }
}

impl<H: SoundAccess> SoundOps<H> {
    pub fn new(scheduler: Arc<Scheduler>, host: Arc<H>) -> Self {
        Self { scheduler, host }
    }

    pub fn play_at(&self, location: Location, sound: SoundKey, volume: f32, pitch: f32) -> TaskHandle {
        let host = self.host.clone();
        self.scheduler.submit(ExecutionTarget::World(location.world), move || {
            host.play_at(&location, &sound, volume, pitch)
        })
    }

    pub fn play_for_entity(&self, entity: EntityId, sound: SoundKey, volume: f32, pitch: f32) -> TaskHandle {
        let host = self.host.clone();
        self.scheduler.submit(ExecutionTarget::Entity(entity), move || {
            if !host.play_at_entity(entity, &sound, volume, pitch) {
                tracing::debug!(%entity, %sound, "entity gone, sound dropped");
            }
        })
    }

    pub fn play_for_player(&self, player: PlayerId, sound: SoundKey, volume: f32, pitch: f32) -> TaskHandle {
        let host = self.host.clone();
        self.scheduler.submit(ExecutionTarget::Player(player), move || {
            if host.player_online(player) {
                host.play_to_player(player, &sound, volume, pitch);
            }
        })
    }

    /// Play at `location` on `world`'s context, even if `location` names another world.
    pub fn play_in_world(&self, world: WorldId, location: Location, sound: SoundKey, volume: f32, pitch: f32) -> TaskHandle {
        let host = self.host.clone();
        self.scheduler.submit(ExecutionTarget::World(world), move || {
            let location = Location { world, ..location };
            host.play_at(&location, &sound, volume, pitch)
        })
    }

    /// Play a sound looked up by name. Resolves to `false` for unknown names.
    pub fn play_named(&self, location: Location, name: impl Into<String>, volume: f32, pitch: f32) -> Pending<bool> {
        let host = self.host.clone();
        let name = name.into();
        call_on(&self.scheduler, ExecutionTarget::World(location.world), move || {
            match host.known_sounds().into_iter().find(|key| key.matches_name(&name)) {
                Some(sound) => {
                    host.play_at(&location, &sound, volume, pitch);
                    true
                }
                None => {
                    tracing::warn!(sound = %name, "unknown sound");
                    false
                }
            }
        })
    }

    pub fn stop_all(&self, player: PlayerId) -> TaskHandle {
        let host = self.host.clone();
        self.scheduler.submit(ExecutionTarget::Player(player), move || {
            if host.player_online(player) {
                host.stop_all(player);
            }
        })
    }

    pub fn stop(&self, player: PlayerId, sound: SoundKey) -> TaskHandle {
        let host = self.host.clone();
        self.scheduler.submit(ExecutionTarget::Player(player), move || {
            if host.player_online(player) {
                host.stop(player, &sound);
            }
        })
    }

    /// Names of every sound the host knows, gathered off the game contexts.
    pub fn available_sounds(&self) -> Pending<Vec<String>> {
        let host = self.host.clone();
        call_on(&self.scheduler, ExecutionTarget::PlainAsync, move || {
            host.known_sounds().into_iter().map(|key| key.0).collect()
        })
    }

    /// Schedule every cue up front. A cue plays, then its `delay_ticks` pass
    /// before the next one, so the first cue plays on the next tick.
    pub fn play_sequence(&self, cues: Vec<SoundCue>) -> PlayingSequence {
        let (completer, finished) = pending::channel();
        let mut completer = Some(completer);
        let last = cues.len().saturating_sub(1);
        let mut at = 0u64;
        let mut handles = Vec::with_capacity(cues.len());

        for (i, cue) in cues.into_iter().enumerate() {
            let host = self.host.clone();
            let done = if i == last { completer.take() } else { None };
            let offset = at;
            at = at.saturating_add(cue.delay_ticks);
            handles.push(self.scheduler.run_after(ExecutionTarget::World(cue.location.world), offset, move || {
                host.play_at(&cue.location, &cue.sound, cue.volume, cue.pitch);
                if let Some(done) = done {
                    let _ = done.complete(());
                }
            }));
        }
        // Nothing to play.
        if let Some(done) = completer {
            let _ = done.complete(());
        }
        PlayingSequence { handles, finished }
    }
}
