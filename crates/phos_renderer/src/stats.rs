use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by every worker of a render.
#[derive(Debug, Default)]
pub struct RenderStats {
    rays: AtomicU64,
    shadow_rays: AtomicU64,
    samples: AtomicU64,
    patches: AtomicU64,
}

/// Plain copy of [`RenderStats`] at one moment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    pub rays: u64,
    pub shadow_rays: u64,
    pub samples: u64,
    pub patches: u64,
}

impl RenderStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_rays(&self, n: usize) {
        self.rays.fetch_add(n as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_shadow_rays(&self, n: usize) {
        self.shadow_rays.fetch_add(n as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_samples(&self, n: usize) {
        self.samples.fetch_add(n as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn patch_done(&self) {
        self.patches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.rays.store(0, Ordering::Relaxed);
        self.shadow_rays.store(0, Ordering::Relaxed);
        self.samples.store(0, Ordering::Relaxed);
        self.patches.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            rays: self.rays.load(Ordering::Relaxed),
            shadow_rays: self.shadow_rays.load(Ordering::Relaxed),
            samples: self.samples.load(Ordering::Relaxed),
            patches: self.patches.load(Ordering::Relaxed),
        }
    }
}
