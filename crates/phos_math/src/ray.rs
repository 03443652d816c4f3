use crate::Vec3;

/// A ray in 3D space with origin and direction.
///
/// The direction is expected to be normalized by the integrator, but
/// intersection code never relies on it: hit distances are always expressed
/// in units of `direction`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Component-wise reciprocal of the direction used by slab tests.
    ///
    /// A zero component maps to a signed `f32::MAX` rather than infinity, so
    /// `(bound - origin) * inv` stays finite (or a signed infinity) and never
    /// turns into `0 * inf = NaN` when the origin lies exactly on a slab.
    #[inline]
    pub fn inv_direction(&self) -> Vec3 {
        Vec3::new(
            safe_recip(self.direction.x),
            safe_recip(self.direction.y),
            safe_recip(self.direction.z),
        )
    }
}

#[inline]
fn safe_recip(d: f32) -> f32 {
    if d == 0.0 {
        f32::MAX.copysign(d)
    } else {
        1.0 / d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_creation() {
        let origin = Vec3::new(1.0, 2.0, 3.0);
        let direction = Vec3::new(0.0, 1.0, 0.0);
        let ray = Ray::new(origin, direction);

        assert_eq!(ray.origin, origin);
        assert_eq!(ray.direction, direction);
    }

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(1.0), Vec3::X);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_inv_direction_zero_components() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, -0.0, 2.0));
        let inv = ray.inv_direction();

        assert_eq!(inv.x, f32::MAX);
        assert_eq!(inv.y, -f32::MAX);
        assert_eq!(inv.z, 0.5);
        assert!(!(0.0 * inv.x).is_nan());
    }
}
