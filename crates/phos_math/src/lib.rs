//! Math primitives for the phos renderer.
//!
//! Vectors come straight from glam; this crate adds the renderer-specific
//! value types on top: colors, rays, bounding boxes, 8-wide SIMD lanes,
//! tangent frames and the sampling warps used by the BSDF library.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod color;
mod frame;
mod ray;
pub mod sampling;
pub mod simd;

pub use aabb::{gamma, Aabb};
pub use color::{Color, ColorExt};
pub use frame::{tangent, Frame};
pub use ray::Ray;
