//! Render driver: configuration and the worker pool.
//!
//! The scene and BVH are built once and shared read-only. A fixed pool of
//! workers pulls patches from the film's atomic counter until none are
//! left; each worker owns its tile buffers and arena, so the only shared
//! mutable state is the film accumulator and the statistics counters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use phos_core::Scene;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::bvh::Bvh;
use crate::camera::Camera;
use crate::error::{RenderError, RenderResult};
use crate::film::Film;
use crate::image::ImageBuffer;
use crate::integrator::{Integrator, TileScratch};
use crate::stats::{RenderStats, StatsSnapshot};

/// Upper bound on path segments held by one tile.
pub const MAX_SEGMENTS_PER_TILE: usize = 65_536;

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Strata per pixel side; samples per pixel is the square of this
    pub samples_per_dimension: u32,
    /// Maximum ray bounce depth
    pub max_depth: u32,
    /// Bounces before Russian roulette starts
    pub min_bounces: u32,
    /// Lowest termination probability once roulette is active
    pub roulette_floor: f32,
    /// Side of a square patch in pixels
    pub patch_size: u32,
    /// Worker count, 0 for one per hardware thread
    pub threads: usize,
    pub seed: u64,
    /// Bump arena budget per worker, in bytes
    pub arena_bytes: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            samples_per_dimension: 4,
            max_depth: 8,
            min_bounces: 3,
            roulette_floor: 0.05,
            patch_size: 16,
            threads: 0,
            seed: 0,
            arena_bytes: 1 << 20,
        }
    }
}

impl RenderConfig {
    pub fn samples_per_pixel(&self) -> u32 {
        self.samples_per_dimension * self.samples_per_dimension
    }

    /// Segments needed by the largest (unclipped) patch.
    pub fn segments_per_patch(&self) -> usize {
        (self.patch_size as usize).pow(2) * self.samples_per_pixel() as usize
    }

    /// Reject configurations that could not run to completion.
    pub fn validate(&self) -> RenderResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidConfig(format!(
                "image size {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.samples_per_dimension == 0 {
            return Err(RenderError::InvalidConfig(
                "samples_per_dimension must be at least 1".into(),
            ));
        }
        if self.patch_size == 0 {
            return Err(RenderError::InvalidConfig("patch_size must be at least 1".into()));
        }
        if self.max_depth == 0 {
            return Err(RenderError::InvalidConfig("max_depth must be at least 1".into()));
        }
        if !(0.0..1.0).contains(&self.roulette_floor) {
            return Err(RenderError::InvalidConfig(format!(
                "roulette_floor {} is outside [0, 1)",
                self.roulette_floor
            )));
        }
        if self.arena_bytes == 0 {
            return Err(RenderError::InvalidConfig("arena_bytes must be positive".into()));
        }

        let needed = self.segments_per_patch();
        if needed > MAX_SEGMENTS_PER_TILE {
            return Err(RenderError::Capacity {
                needed,
                capacity: MAX_SEGMENTS_PER_TILE,
            });
        }
        Ok(())
    }
}

/// Owns a prepared scene and renders frames of it.
pub struct Renderer {
    scene: Scene,
    bvh: Bvh,
    camera: Camera,
    config: RenderConfig,
    stats: RenderStats,
    cancelled: AtomicBool,
}

impl Renderer {
    /// Validate `config`, build the BVH and fit the camera to the image.
    pub fn new(scene: Scene, camera: Camera, config: RenderConfig) -> RenderResult<Self> {
        config.validate()?;
        if scene.triangle_count() == 0 {
            return Err(RenderError::EmptyScene);
        }

        let bvh = Bvh::build(&scene);

        let mut camera = camera.with_resolution(config.width, config.height);
        camera.initialize();

        Ok(Self {
            scene,
            bvh,
            camera,
            config,
            stats: RenderStats::new(),
            cancelled: AtomicBool::new(false),
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Counters of the current or last render.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Ask a running render to stop; workers finish their current patch.
    ///
    /// The request holds until a render consumes it, so cancelling just
    /// before [`Renderer::render`] starts still stops that render.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Render one frame.
    pub fn render(&self) -> RenderResult<ImageBuffer> {
        let start = Instant::now();
        self.stats.reset();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|e| RenderError::ThreadPool(e.to_string()))?;

        let film = Film::new(self.config.width, self.config.height, self.config.patch_size);
        let integrator = Integrator::new(&self.scene, &self.bvh, &self.camera, &self.config);
        let failure: Mutex<Option<RenderError>> = Mutex::new(None);
        let failed = AtomicBool::new(false);
        let workers = pool.current_num_threads();

        log::info!(
            "Rendering {}x{} at {} spp: {} patches on {} threads",
            self.config.width,
            self.config.height,
            self.config.samples_per_pixel(),
            film.patches().len(),
            workers
        );

        pool.scope(|s| {
            for _ in 0..workers {
                s.spawn(|_| {
                    let mut scratch = TileScratch::new(&self.config, self.scene.materials.len());
                    while !self.cancelled.load(Ordering::Relaxed) && !failed.load(Ordering::Relaxed) {
                        let Some(patch) = film.next_patch() else { break };

                        let mut rng = StdRng::seed_from_u64(
                            self.config.seed ^ (patch.index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15),
                        );
                        if let Err(e) = integrator.render_patch(&patch, &film, &mut scratch, &mut rng, &self.stats) {
                            log::error!("Patch {} failed: {}", patch.index, e);
                            failed.store(true, Ordering::Relaxed);
                            if let Ok(mut slot) = failure.lock() {
                                slot.get_or_insert(e);
                            }
                            break;
                        }
                    }
                });
            }
        });

        // Consume the request so the next render starts clean
        let cancelled = self.cancelled.swap(false, Ordering::Relaxed);
        if let Some(e) = failure.into_inner().ok().flatten() {
            return Err(e);
        }
        if cancelled {
            log::info!("Render cancelled after {:.2?}", start.elapsed());
            return Err(RenderError::Cancelled);
        }

        let stats = self.stats.snapshot();
        let elapsed = start.elapsed();
        log::info!(
            "Rendered {} patches in {:.2?}: {} rays, {} shadow rays ({:.2} Mrays/s)",
            stats.patches,
            elapsed,
            stats.rays,
            stats.shadow_rays,
            (stats.rays + stats.shadow_rays) as f64 / elapsed.as_secs_f64().max(1e-9) / 1e6
        );

        Ok(film.resolve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phos_core::{shapes, Material};
    use phos_math::{Color, Vec3};

    #[test]
    fn test_default_config_is_valid() {
        let config = RenderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.samples_per_pixel(), 16);
        assert_eq!(config.segments_per_patch(), 16 * 16 * 16);
    }

    #[test]
    fn test_config_capacity_is_checked_up_front() {
        let config = RenderConfig {
            patch_size: 64,
            samples_per_dimension: 8,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(RenderError::Capacity {
                needed: 64 * 64 * 64,
                capacity: MAX_SEGMENTS_PER_TILE
            })
        );
    }

    #[test]
    fn test_invalid_configs() {
        let bad = [
            RenderConfig {
                width: 0,
                ..Default::default()
            },
            RenderConfig {
                samples_per_dimension: 0,
                ..Default::default()
            },
            RenderConfig {
                roulette_floor: 1.0,
                ..Default::default()
            },
            RenderConfig {
                max_depth: 0,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(RenderError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: RenderConfig = serde_json::from_str(r#"{ "width": 320, "max_depth": 4 }"#).unwrap();
        assert_eq!(config.width, 320);
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.height, RenderConfig::default().height);
    }

    #[test]
    fn test_empty_scene_is_rejected() {
        let result = Renderer::new(Scene::new("empty"), Camera::new(), RenderConfig::default());
        assert!(matches!(result, Err(RenderError::EmptyScene)));
    }

    #[test]
    fn test_render_counts_every_patch() {
        let mut scene = Scene::new("box").with_environment(Color::splat(0.5));
        let m = scene.add_material(Material::diffuse("grey", Color::splat(0.5)));
        scene
            .add_mesh(shapes::cuboid(Vec3::splat(-0.5), Vec3::splat(0.5)), m)
            .unwrap();

        let camera = Camera::new().with_position(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y);
        let config = RenderConfig {
            width: 40,
            height: 30,
            samples_per_dimension: 1,
            patch_size: 8,
            threads: 2,
            ..Default::default()
        };
        let renderer = Renderer::new(scene, camera, config).unwrap();
        let image = renderer.render().unwrap();

        assert_eq!((image.width, image.height), (40, 30));
        let stats = renderer.stats();
        assert_eq!(stats.patches, 5 * 4);
        assert_eq!(stats.samples, 40 * 30);
        assert!(stats.rays >= 40 * 30);
        assert!(image.pixels.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_cancel_before_render_is_honoured_once() {
        let mut scene = Scene::new("box");
        let m = scene.add_material(Material::diffuse("grey", Color::splat(0.5)));
        scene
            .add_mesh(shapes::cuboid(Vec3::splat(-0.5), Vec3::splat(0.5)), m)
            .unwrap();

        let camera = Camera::new().with_position(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y);
        let config = RenderConfig {
            width: 16,
            height: 16,
            samples_per_dimension: 1,
            threads: 1,
            ..Default::default()
        };
        let renderer = Renderer::new(scene, camera, config).unwrap();

        renderer.cancel();
        assert!(matches!(renderer.render(), Err(RenderError::Cancelled)));
        assert_eq!(renderer.stats().patches, 0);

        let image = renderer.render().unwrap();
        assert_eq!((image.width, image.height), (16, 16));
        assert!(renderer.stats().patches > 0);
    }
}
