//! Area lights.
//!
//! Lights are sampled directly by the integrator (next-event estimation);
//! they are not inserted into the triangle BVH.

use std::f32::consts::PI;

use phos_math::{sampling, Color, Frame, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Emitting surface geometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LightShape {
    Sphere {
        center: Vec3,
        radius: f32,
    },
    /// Parallelogram spanned by `edge_u` and `edge_v` from `corner`,
    /// emitting on the side of `edge_u x edge_v`.
    Rect {
        corner: Vec3,
        edge_u: Vec3,
        edge_v: Vec3,
    },
}

/// A point sampled on a light surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LightSample {
    pub point: Vec3,
    pub normal: Vec3,
    /// Density with respect to surface area.
    pub pdf_area: f32,
}

/// An area light with uniform emitted radiance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub shape: LightShape,
    pub emission: Color,
}

impl Light {
    pub fn sphere(center: Vec3, radius: f32, emission: Color) -> Self {
        Self {
            shape: LightShape::Sphere { center, radius },
            emission,
        }
    }

    pub fn rect(corner: Vec3, edge_u: Vec3, edge_v: Vec3, emission: Color) -> Self {
        Self {
            shape: LightShape::Rect {
                corner,
                edge_u,
                edge_v,
            },
            emission,
        }
    }

    /// Surface area of the emitter.
    pub fn area(&self) -> f32 {
        match &self.shape {
            LightShape::Sphere { radius, .. } => 4.0 * PI * radius * radius,
            LightShape::Rect { edge_u, edge_v, .. } => edge_u.cross(*edge_v).length(),
        }
    }

    /// Sample a point on the light as seen from `reference`.
    ///
    /// Spheres are sampled uniformly over the hemisphere facing the
    /// reference point (the far side can never be visible from it), so the
    /// area density is `1 / (2 pi r^2)`.
    pub fn sample(&self, reference: Vec3, u: Vec2) -> LightSample {
        match &self.shape {
            LightShape::Sphere { center, radius } => {
                let axis = (reference - *center).normalize_or_zero();
                let axis = if axis == Vec3::ZERO { Vec3::Y } else { axis };
                let normal = Frame::from_normal(axis).to_world(sampling::uniform_hemisphere(u));
                LightSample {
                    point: *center + normal * *radius,
                    normal,
                    pdf_area: 1.0 / (2.0 * PI * radius * radius),
                }
            }
            LightShape::Rect {
                corner,
                edge_u,
                edge_v,
            } => {
                let n = edge_u.cross(*edge_v);
                let area = n.length();
                LightSample {
                    point: *corner + *edge_u * u.x + *edge_v * u.y,
                    normal: n / area,
                    pdf_area: 1.0 / area,
                }
            }
        }
    }
}
