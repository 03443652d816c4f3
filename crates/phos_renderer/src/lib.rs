//! Phos renderer - CPU stream path tracing
//!
//! Offline Monte Carlo path tracer built around three pieces:
//! - an 8-wide BVH with single-ray and ray-stream traversal ([`bvh`]);
//! - a BSDF library with arena-allocated, per-hit instances ([`bsdf`],
//!   [`MaterialExt`]);
//! - a tile integrator that keeps path state in struct-of-arrays form,
//!   shades hits grouped by material and samples lights with batched
//!   shadow rays ([`Integrator`]).
//!
//! ```no_run
//! use phos_core::{shapes, Light, Material, Scene};
//! use phos_math::{Color, Vec3};
//! use phos_renderer::{Camera, RenderConfig, Renderer};
//!
//! let mut scene = Scene::new("demo");
//! let grey = scene.add_material(Material::diffuse("grey", Color::splat(0.6)));
//! scene.add_mesh(shapes::uv_sphere(Vec3::ZERO, 1.0, 32, 16), grey)?;
//! scene.add_light(Light::sphere(Vec3::new(0.0, 4.0, 0.0), 0.5, Color::splat(20.0)));
//!
//! let camera = Camera::new().with_position(Vec3::new(0.0, 1.0, 5.0), Vec3::ZERO, Vec3::Y);
//! let renderer = Renderer::new(scene, camera, RenderConfig::default())?;
//! let image = renderer.render()?;
//! assert_eq!(image.width, 512);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod arena;
pub mod bsdf;
pub mod bvh;
mod camera;
mod error;
mod film;
mod image;
mod integrator;
mod material;
mod renderer;
pub mod segment;
mod stats;
pub mod triangle;

pub use arena::TileArena;
pub use bsdf::{Bsdf, BsdfFlags, BsdfSample};
pub use bvh::{Bvh, Hit};
pub use camera::Camera;
pub use error::{RenderError, RenderResult};
pub use film::{generate_patches, Film, Patch, Splat};
pub use image::{clamp_01, color_to_rgba, linear_to_gamma, ImageBuffer};
pub use integrator::{roulette, Integrator, TileScratch, RAY_EPSILON};
pub use material::MaterialExt;
pub use renderer::{RenderConfig, Renderer, MAX_SEGMENTS_PER_TILE};
pub use stats::{RenderStats, StatsSnapshot};
