use phos_math::simd::{movemask, CmpGe, CmpGt, CmpLe, CmpLt, Float8, RayX8, Vec3x8, LANES};
use phos_math::Vec3;

use super::Hit;
use crate::triangle::parallel_threshold;

/// Up to eight triangles of one leaf, packed for an 8-wide
/// Möller-Trumbore test. Unused lanes have zero edges and never hit.
#[derive(Debug, Clone)]
pub struct TriangleBatch {
    v0: Vec3x8,
    e1: Vec3x8,
    e2: Vec3x8,
    /// Per-lane parallel threshold; zero in unused lanes.
    min_det: Float8,
    prims: [u32; LANES],
    count: u8,
}

/// Per-lane outcome of a batch test.
struct LaneHits {
    mask: u32,
    t: [f32; LANES],
    u: [f32; LANES],
    v: [f32; LANES],
}

impl TriangleBatch {
    /// Pack `(prim id, corners)` pairs. At most [`LANES`] are used.
    pub fn new(triangles: &[(u32, [Vec3; 3])]) -> Self {
        debug_assert!(!triangles.is_empty() && triangles.len() <= LANES);

        let mut v0 = [Vec3::ZERO; LANES];
        let mut e1 = [Vec3::ZERO; LANES];
        let mut e2 = [Vec3::ZERO; LANES];
        let mut min_det = [0.0f32; LANES];
        let mut prims = [u32::MAX; LANES];
        let count = triangles.len().min(LANES);

        for (i, (prim, [a, b, c])) in triangles.iter().take(LANES).enumerate() {
            v0[i] = *a;
            e1[i] = *b - *a;
            e2[i] = *c - *a;
            min_det[i] = parallel_threshold(e1[i], e2[i]);
            prims[i] = *prim;
        }

        Self {
            v0: Vec3x8::from_slice(&v0),
            e1: Vec3x8::from_slice(&e1),
            e2: Vec3x8::from_slice(&e2),
            min_det: Float8::from(min_det),
            prims,
            count: count as u8,
        }
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn prims(&self) -> &[u32] {
        &self.prims[..self.len()]
    }

    fn test(&self, ray: &RayX8, t_max: f32) -> LaneHits {
        let p = ray.direction.cross(&self.e2);
        let det = self.e1.dot(&p);
        let inv_det = Float8::splat(1.0) / det;

        let s = ray.origin - self.v0;
        let u = s.dot(&p) * inv_det;
        let q = s.cross(&self.e1);
        let v = ray.direction.dot(&q) * inv_det;
        let t = self.e2.dot(&q) * inv_det;

        let zero = Float8::splat(0.0);
        let valid = det.abs().cmp_gt(self.min_det)
            & u.cmp_ge(zero)
            & v.cmp_ge(zero)
            & (u + v).cmp_le(Float8::splat(1.0))
            & t.cmp_ge(zero)
            & t.cmp_lt(Float8::splat(t_max));

        let lanes = (1u32 << self.count) - 1;
        LaneHits {
            mask: movemask(valid) & lanes,
            t: t.to_array(),
            u: u.to_array(),
            v: v.to_array(),
        }
    }

    /// Closest hit in `[0, t_max)`; ties go to the lower lane.
    pub fn intersect(&self, ray: &RayX8, t_max: f32) -> Option<Hit> {
        let hits = self.test(ray, t_max);
        let mut mask = hits.mask;
        let mut best: Option<Hit> = None;
        while mask != 0 {
            let i = mask.trailing_zeros() as usize;
            mask &= mask - 1;
            if best.map_or(true, |b| hits.t[i] < b.t) {
                best = Some(Hit {
                    t: hits.t[i],
                    prim: self.prims[i],
                    u: hits.u[i],
                    v: hits.v[i],
                });
            }
        }
        best
    }

    /// Any hit in `[0, t_max)`.
    #[inline]
    pub fn occluded(&self, ray: &RayX8, t_max: f32) -> bool {
        self.test(ray, t_max).mask != 0
    }
}
