//! Fixed-width SIMD lanes.
//!
//! Everything vectorised in the renderer (wide BVH node tests and batched
//! triangle tests) goes through the 8-lane types here, built on
//! `wide::f32x8`. `wide` picks AVX/SSE/NEON where available and falls back
//! to scalar code otherwise, so the same code path is used for testing and
//! for production.

use crate::{gamma, Aabb, Ray, Vec3};
use std::ops::{Add, Mul, Sub};
pub use wide::{f32x8, CmpGe, CmpGt, CmpLe, CmpLt};

/// Number of lanes in every batch type.
pub const LANES: usize = 8;

pub type Float8 = f32x8;

/// Bitmask of the lanes whose sign bit is set in `mask`
/// (bit `i` = lane `i`), as produced by the `cmp_*` methods.
#[inline]
pub fn movemask(mask: Float8) -> u32 {
    mask.move_mask() as u32 & 0xff
}

/// Lane-wise `if mask { a } else { b }`.
#[inline]
pub fn select(mask: Float8, a: Float8, b: Float8) -> Float8 {
    mask.blend(a, b)
}

/// Eight 3-vectors stored one axis per register.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Vec3x8 {
    pub x: Float8,
    pub y: Float8,
    pub z: Float8,
}

impl Vec3x8 {
    #[inline]
    pub fn new(x: Float8, y: Float8, z: Float8) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn splat(v: Vec3) -> Self {
        Self {
            x: Float8::splat(v.x),
            y: Float8::splat(v.y),
            z: Float8::splat(v.z),
        }
    }

    /// Pack up to 8 vectors; missing lanes are zero.
    pub fn from_slice(vs: &[Vec3]) -> Self {
        let mut x = [0.0f32; LANES];
        let mut y = [0.0f32; LANES];
        let mut z = [0.0f32; LANES];
        for (i, v) in vs.iter().take(LANES).enumerate() {
            x[i] = v.x;
            y[i] = v.y;
            z[i] = v.z;
        }
        Self {
            x: Float8::from(x),
            y: Float8::from(y),
            z: Float8::from(z),
        }
    }

    /// Unpack lane `i`.
    pub fn lane(&self, i: usize) -> Vec3 {
        Vec3::new(
            self.x.to_array()[i],
            self.y.to_array()[i],
            self.z.to_array()[i],
        )
    }

    #[inline]
    pub fn dot(&self, o: &Vec3x8) -> Float8 {
        self.x * o.x + self.y * o.y + self.z * o.z
    }

    #[inline]
    pub fn cross(&self, o: &Vec3x8) -> Vec3x8 {
        Vec3x8 {
            x: self.y * o.z - self.z * o.y,
            y: self.z * o.x - self.x * o.z,
            z: self.x * o.y - self.y * o.x,
        }
    }
}

impl Add for Vec3x8 {
    type Output = Vec3x8;

    #[inline]
    fn add(self, o: Vec3x8) -> Vec3x8 {
        Vec3x8::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl Sub for Vec3x8 {
    type Output = Vec3x8;

    #[inline]
    fn sub(self, o: Vec3x8) -> Vec3x8 {
        Vec3x8::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl Mul<Float8> for Vec3x8 {
    type Output = Vec3x8;

    #[inline]
    fn mul(self, s: Float8) -> Vec3x8 {
        Vec3x8::new(self.x * s, self.y * s, self.z * s)
    }
}

/// A ray broadcast to every lane, with the reciprocal direction and the
/// per-axis slab order precomputed for [`Aabb8::intersect`].
#[derive(Debug, Copy, Clone)]
pub struct RayX8 {
    pub origin: Vec3x8,
    pub direction: Vec3x8,
    inv_dir: Vec3x8,
    /// For each axis, `true` if the direction component is negative so the
    /// max slab is entered first.
    negative: [bool; 3],
}

impl RayX8 {
    pub fn new(ray: &Ray) -> Self {
        let inv = ray.inv_direction();
        Self {
            origin: Vec3x8::splat(ray.origin),
            direction: Vec3x8::splat(ray.direction),
            inv_dir: Vec3x8::splat(inv),
            negative: [
                inv.x.is_sign_negative(),
                inv.y.is_sign_negative(),
                inv.z.is_sign_negative(),
            ],
        }
    }
}

/// Eight bounding boxes in struct-of-arrays layout: all min x, min y, min z,
/// then all max x, max y, max z.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb8 {
    pub bounds: [[f32; LANES]; 6],
}

impl Default for Aabb8 {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb8 {
    /// Every slot empty (never hit).
    pub const EMPTY: Aabb8 = Aabb8 {
        bounds: [
            [f32::INFINITY; LANES],
            [f32::INFINITY; LANES],
            [f32::INFINITY; LANES],
            [f32::NEG_INFINITY; LANES],
            [f32::NEG_INFINITY; LANES],
            [f32::NEG_INFINITY; LANES],
        ],
    };

    pub fn set(&mut self, slot: usize, b: &Aabb) {
        for axis in 0..3 {
            self.bounds[axis][slot] = b.min[axis];
            self.bounds[axis + 3][slot] = b.max[axis];
        }
    }

    pub fn get(&self, slot: usize) -> Aabb {
        Aabb::new(
            Vec3::new(
                self.bounds[0][slot],
                self.bounds[1][slot],
                self.bounds[2][slot],
            ),
            Vec3::new(
                self.bounds[3][slot],
                self.bounds[4][slot],
                self.bounds[5][slot],
            ),
        )
    }

    /// Slab test of one ray against all eight boxes within `[0, t_max]`.
    ///
    /// Returns the hit bitmask and the per-lane entry distances. Slabs are
    /// chosen by direction sign, so empty slots report `near = +inf` and
    /// never set their bit. Far distances are widened as in
    /// [`Aabb::intersect`].
    #[inline]
    pub fn intersect(&self, ray: &RayX8, t_max: f32) -> (u32, [f32; LANES]) {
        let o = [ray.origin.x, ray.origin.y, ray.origin.z];
        let inv = [ray.inv_dir.x, ray.inv_dir.y, ray.inv_dir.z];

        let widen = Float8::splat(1.0 + 2.0 * gamma(3));
        let mut near = [Float8::splat(0.0); 3];
        let mut far = [Float8::splat(0.0); 3];
        for axis in 0..3 {
            let (lo, hi) = if ray.negative[axis] {
                (axis + 3, axis)
            } else {
                (axis, axis + 3)
            };
            near[axis] = (Float8::from(self.bounds[lo]) - o[axis]) * inv[axis];
            far[axis] = (Float8::from(self.bounds[hi]) - o[axis]) * inv[axis] * widen;
        }

        let n = near[0].max(near[1]).max(near[2].max(Float8::splat(0.0)));
        let f = far[0].min(far[1]).min(far[2].min(Float8::splat(t_max)));
        (movemask(n.cmp_le(f)), n.to_array())
    }
}
