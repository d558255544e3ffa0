use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Dispatch counters shared by the dispatcher and every runnable it wraps.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    submitted: AtomicU64,
    region_dispatches: AtomicU64,
    fallback_dispatches: AtomicU64,
    affinity_failures: AtomicU64,
    total_failures: AtomicU64,
    rejected_invalid: AtomicU64,
    invocations: AtomicU64,
    panics: AtomicU64,
    per_route: RwLock<HashMap<&'static str, u64>>,
    last_fallback_at: RwLock<Option<DateTime<Utc>>>,
}

/// Point-in-time copy of [`DispatchMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    /// Submissions per target route label.
    pub per_route: HashMap<String, u64>,
    pub region_dispatches: u64,
    pub fallback_dispatches: u64,
    /// Advanced-backend refusals recovered by the fallback.
    pub affinity_failures: u64,
    /// Submissions neither primitive accepted.
    pub total_failures: u64,
    /// Poison submissions answered with a no-op handle.
    pub rejected_invalid: u64,
    pub invocations: u64,
    pub panics: u64,
    pub last_fallback_at: Option<DateTime<Utc>>,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submission(&self, route: &'static str) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        let mut per_route = self.per_route.write().unwrap_or_else(PoisonError::into_inner);
        *per_route.entry(route).or_default() += 1;
    }

    pub fn record_region(&self) {
        self.region_dispatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallback_dispatches.fetch_add(1, Ordering::Relaxed);
        *self.last_fallback_at.write().unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
    }

    pub fn record_affinity_failure(&self) {
        self.affinity_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_total_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_invalid(&self) {
        self.rejected_invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invocation(&self) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_panic(&self) {
        self.panics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let per_route = self
            .per_route
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(route, count)| (route.to_string(), *count))
            .collect();

        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            per_route,
            region_dispatches: self.region_dispatches.load(Ordering::Relaxed),
            fallback_dispatches: self.fallback_dispatches.load(Ordering::Relaxed),
            affinity_failures: self.affinity_failures.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            rejected_invalid: self.rejected_invalid.load(Ordering::Relaxed),
            invocations: self.invocations.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
            last_fallback_at: *self.last_fallback_at.read().unwrap_or_else(PoisonError::into_inner),
        }
    }
}
