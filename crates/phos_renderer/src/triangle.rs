//! Scalar ray-triangle intersection.
//!
//! Reference implementation of the Möller-Trumbore test that the 8-wide
//! leaf batches vectorise. It is used where a single triangle has to be
//! tested on its own, such as brute-force validation of the BVH.

use phos_math::{Ray, Vec3};

use crate::bvh::Hit;

/// Determinant threshold below which a ray counts as parallel, relative to
/// the product of the edge lengths so small triangles are not rejected.
pub const PARALLEL_EPSILON: f32 = 1e-8;

/// Absolute determinant threshold for a triangle with edges `edge1`, `edge2`.
///
/// Zero for degenerate edges, which the strict comparison then rejects.
#[inline]
pub fn parallel_threshold(edge1: Vec3, edge2: Vec3) -> f32 {
    PARALLEL_EPSILON * edge1.length() * edge2.length()
}

/// Intersect `ray` with triangle `(v0, v1, v2)` within `[0, t_max)`.
///
/// Returns `(t, u, v)` with barycentrics relative to `v1` and `v2`.
pub fn intersect_triangle(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3, t_max: f32) -> Option<(f32, f32, f32)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);

    // Ray is parallel to triangle
    if a.abs() <= parallel_threshold(edge1, edge2) {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = s.dot(h) * f;
    if u < 0.0 {
        return None;
    }

    let q = s.cross(edge1);
    let v = ray.direction.dot(q) * f;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(q) * f;
    if t >= 0.0 && t < t_max {
        Some((t, u, v))
    } else {
        None
    }
}

/// Closest hit over every triangle by linear scan.
pub fn intersect_brute_force(ray: &Ray, triangles: &[(u32, [Vec3; 3])], t_max: f32) -> Option<Hit> {
    let mut best: Option<Hit> = None;
    let mut closest = t_max;
    for &(prim, [v0, v1, v2]) in triangles {
        if let Some((t, u, v)) = intersect_triangle(ray, v0, v1, v2, closest) {
            closest = t;
            best = Some(Hit { t, prim, u, v });
        }
    }
    best
}
