use std::sync::{Arc, OnceLock};

use serde::Serialize;
use tracing::info;

use crate::backend::RegionScheduler;
#[cfg(feature = "region-threaded")]
use crate::backend::RegionThreadedScheduler;

/// Marker the host resolves only when its region-threaded scheduler API exists.
pub const REGION_SCHEDULER_MARKER: &str = "io.papermc.paper.threadedregions.scheduler.ScheduledTask";

/// Which scheduling model the host runtime provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BackendCapability {
    /// Regions tick on independent threads; affinity primitives are available.
    RegionThreaded,
    /// One main tick thread; only the generic async primitive is used.
    GlobalThread,
}

impl BackendCapability {
    pub fn is_region_threaded(self) -> bool {
        matches!(self, Self::RegionThreaded)
    }
}

/// What the capability probe and the dispatcher need from the host runtime.
pub trait HostEnvironment: Send + Sync {
    /// Whether the host can resolve the named API marker.
    fn resolve_marker(&self, marker: &str) -> bool;

    /// The host's affinity scheduler, when it has one.
    fn region_scheduler(&self) -> Option<Arc<dyn RegionScheduler>> {
        None
    }
}

/// A single-threaded-tick host with no region API.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyHost;

impl HostEnvironment for LegacyHost {
    fn resolve_marker(&self, _marker: &str) -> bool {
        false
    }
}

/// Host backed by the in-process [`RegionThreadedScheduler`], or by nothing.
#[cfg(feature = "region-threaded")]
#[derive(Default, Clone)]
pub struct EmbeddedHost {
    region: Option<Arc<RegionThreadedScheduler>>,
}

#[cfg(feature = "region-threaded")]
impl EmbeddedHost {
    pub fn new(region: Arc<RegionThreadedScheduler>) -> Self {
        Self { region: Some(region) }
    }

    pub fn without_regions() -> Self {
        Self { region: None }
    }

    pub fn region(&self) -> Option<&Arc<RegionThreadedScheduler>> {
        self.region.as_ref()
    }
}

#[cfg(feature = "region-threaded")]
impl HostEnvironment for EmbeddedHost {
    fn resolve_marker(&self, marker: &str) -> bool {
        self.region.is_some() && marker == REGION_SCHEDULER_MARKER
    }

    fn region_scheduler(&self) -> Option<Arc<dyn RegionScheduler>> {
        self.region
            .as_ref()
            .map(|region| Arc::clone(region) as Arc<dyn RegionScheduler>)
    }
}

/// Decides once which scheduling model is active and remembers the answer.
///
/// The probe never fails: if the host cannot answer (or panics while
/// answering) the capability is treated as absent.
#[derive(Debug, Default)]
pub struct CapabilityProbe {
    detected: OnceLock<BackendCapability>,
}

impl CapabilityProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe `host` on first call; later calls return the cached answer.
    pub fn detect(&self, host: &dyn HostEnvironment) -> BackendCapability {
        *self.detected.get_or_init(|| probe(host))
    }

    /// The cached answer, if [`detect`](Self::detect) has run.
    pub fn cached(&self) -> Option<BackendCapability> {
        self.detected.get().copied()
    }
}

#[cfg(feature = "region-threaded")]
fn probe(host: &dyn HostEnvironment) -> BackendCapability {
    use std::panic::{self, AssertUnwindSafe};

    let resolved = panic::catch_unwind(AssertUnwindSafe(|| host.resolve_marker(REGION_SCHEDULER_MARKER)))
        .unwrap_or_else(|_| {
            tracing::warn!(marker = REGION_SCHEDULER_MARKER, "host panicked resolving marker; assuming absent");
            false
        });
    let capability = if resolved {
        BackendCapability::RegionThreaded
    } else {
        BackendCapability::GlobalThread
    };
    info!(?capability, "scheduling capability detected");
    capability
}

#[cfg(not(feature = "region-threaded"))]
fn probe(_host: &dyn HostEnvironment) -> BackendCapability {
    info!("built without region-threaded support; using the async primitive only");
    BackendCapability::GlobalThread
}
