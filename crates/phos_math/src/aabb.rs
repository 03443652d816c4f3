use crate::{Ray, Vec3};

/// Conservative bound on the relative rounding error of `n` chained float
/// operations (Pharr et al. `gamma(n)`).
#[inline]
pub fn gamma(n: i32) -> f32 {
    let e = f32::EPSILON * 0.5;
    (n as f32 * e) / (1.0 - n as f32 * e)
}

/// Axis-Aligned Bounding Box for spatial acceleration structures (BVH).
///
/// The default box is *empty*: `min = +inf`, `max = -inf`. Merging anything
/// into an empty box yields that thing's bounds, so boxes can be grown by
/// folding without a special first case. Once populated, `min <= max` holds
/// on every axis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// An empty box (contains nothing, identity for `merge`).
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a box from explicit corners. The caller guarantees `min <= max`.
    #[inline]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from two arbitrary corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Bounds of a single point (zero volume).
    #[inline]
    pub fn from_point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    /// Bounds of a triangle.
    pub fn from_triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self {
            min: a.min(b).min(c),
            max: a.max(b).max(c),
        }
    }

    /// Create an AABB that surrounds two other AABBs.
    #[inline]
    pub fn merge(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grow the box so it contains `p`.
    #[inline]
    pub fn merge_point(&self, p: Vec3) -> Aabb {
        Aabb {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    /// True until something has been merged into the box.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// True if the box has no extent along `axis` (0=X, 1=Y, 2=Z).
    pub fn is_flat_on(&self, axis: usize) -> bool {
        self.min[axis] == self.max[axis]
    }

    /// Returns the center point of the bounding box.
    #[inline]
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths of the box.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Surface area, zero for an empty box.
    pub fn area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.extent();
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    ///
    /// Ties resolve toward the lower axis index.
    pub fn dominant_axis(&self) -> usize {
        let d = self.extent();
        let mut axis = 0;
        for i in 1..3 {
            if d[i] > d[axis] {
                axis = i;
            }
        }
        axis
    }

    /// Position of `p` relative to the box, normalized to [0, 1] on every
    /// axis with non-zero extent. Flat axes report the raw offset from `min`.
    pub fn offset(&self, p: Vec3) -> Vec3 {
        let mut o = p - self.min;
        let d = self.extent();
        for i in 0..3 {
            if d[i] > 0.0 {
                o[i] /= d[i];
            }
        }
        o
    }

    /// Slab test against a ray within `[0, t_max)`.
    ///
    /// `inv_dir` must come from [`Ray::inv_direction`]. The far distance is
    /// widened by `1 + 2 * gamma(3)` so a ray grazing a box edge is never
    /// rejected because of rounding. Returns the entry distance (clamped to
    /// 0 when the origin is inside).
    pub fn intersect(&self, ray: &Ray, inv_dir: Vec3, t_max: f32) -> Option<f32> {
        let mut t0 = 0.0f32;
        let mut t1 = t_max;

        for axis in 0..3 {
            // Pick slabs by direction sign rather than min/max of the two
            // distances: an empty box then yields near > far on every axis.
            let (lo, hi) = if inv_dir[axis].is_sign_negative() {
                (self.max[axis], self.min[axis])
            } else {
                (self.min[axis], self.max[axis])
            };
            let near = (lo - ray.origin[axis]) * inv_dir[axis];
            let far = (hi - ray.origin[axis]) * inv_dir[axis] * (1.0 + 2.0 * gamma(3));

            t0 = if near > t0 { near } else { t0 };
            t1 = if far < t1 { far } else { t1 };
            if t0 > t1 {
                return None;
            }
        }

        Some(t0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points(Vec3::new(10.0, 0.0, 10.0), Vec3::new(0.0, 10.0, 0.0));

        assert_eq!(aabb.min, Vec3::ZERO);
        assert_eq!(aabb.max, Vec3::splat(10.0));
    }

    #[test]
    fn test_empty_is_merge_identity() {
        let b = Aabb::from_points(Vec3::new(-1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0));

        assert!(Aabb::EMPTY.is_empty());
        assert_eq!(Aabb::EMPTY.merge(&b), b);
        assert_eq!(b.merge(&Aabb::EMPTY), b);
        assert_eq!(Aabb::EMPTY.merge(&Aabb::EMPTY), Aabb::EMPTY);
        assert_eq!(Aabb::EMPTY.area(), 0.0);
    }

    #[test]
    fn test_aabb_merge() {
        let box1 = Aabb::from_points(Vec3::ZERO, Vec3::splat(5.0));
        let box2 = Aabb::from_points(Vec3::splat(3.0), Vec3::splat(10.0));
        let merged = box1.merge(&box2);

        assert_eq!(merged.min, Vec3::ZERO);
        assert_eq!(merged.max, Vec3::splat(10.0));

        let grown = Aabb::EMPTY
            .merge_point(Vec3::new(1.0, -1.0, 0.0))
            .merge_point(Vec3::new(-1.0, 1.0, 0.0));
        assert_eq!(grown.min, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(grown.max, Vec3::new(1.0, 1.0, 0.0));
        assert!(grown.is_flat_on(2));
        assert!(!grown.is_flat_on(0));
    }

    #[test]
    fn test_aabb_area_and_centroid() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 2.0, 3.0));

        assert_eq!(aabb.area(), 2.0 * (2.0 + 3.0 + 6.0));
        assert_eq!(aabb.centroid(), Vec3::new(0.5, 1.0, 1.5));
    }

    #[test]
    fn test_aabb_dominant_axis() {
        let aabb_x = Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0));
        assert_eq!(aabb_x.dominant_axis(), 0);

        let aabb_y = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 10.0, 1.0));
        assert_eq!(aabb_y.dominant_axis(), 1);

        let aabb_z = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 10.0));
        assert_eq!(aabb_z.dominant_axis(), 2);

        let cube = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        assert_eq!(cube.dominant_axis(), 0);
    }

    #[test]
    fn test_aabb_offset() {
        let aabb = Aabb::from_points(Vec3::new(0.0, 0.0, 1.0), Vec3::new(4.0, 2.0, 1.0));
        let o = aabb.offset(Vec3::new(1.0, 2.0, 1.0));

        assert_eq!(o, Vec3::new(0.25, 1.0, 0.0));
    }

    #[test]
    fn test_aabb_intersect() {
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));

        // Ray pointing at center
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let t = aabb.intersect(&ray, ray.inv_direction(), 100.0);
        assert!((t.unwrap() - 4.0).abs() < 1e-5);

        // Box beyond t_max
        assert!(aabb.intersect(&ray, ray.inv_direction(), 3.0).is_none());

        // Ray pointing away
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), -Vec3::Z);
        assert!(aabb.intersect(&ray, ray.inv_direction(), 100.0).is_none());

        // Ray missing the box
        let ray = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::Z);
        assert!(aabb.intersect(&ray, ray.inv_direction(), 100.0).is_none());

        // Empty box is never hit
        assert!(Aabb::EMPTY
            .intersect(&ray, ray.inv_direction(), f32::INFINITY)
            .is_none());

        // Origin inside reports zero entry distance
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(aabb.intersect(&ray, ray.inv_direction(), 100.0), Some(0.0));
    }

    #[test]
    fn test_aabb_intersect_axis_parallel_on_slab() {
        // Origin exactly on the x = -1 slab with zero x direction
        let aabb = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::new(-1.0, 0.0, -5.0), Vec3::Z);

        let t = aabb.intersect(&ray, ray.inv_direction(), f32::INFINITY);
        assert!(t.is_some());

        let outside = Ray::new(Vec3::new(-1.5, 0.0, -5.0), Vec3::Z);
        assert!(aabb
            .intersect(&outside, outside.inv_direction(), f32::INFINITY)
            .is_none());
    }

    #[test]
    fn test_gamma_is_small_and_positive() {
        assert!(gamma(3) > 0.0);
        assert!(gamma(3) < 1e-6);
    }
}
