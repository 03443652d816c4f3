//! Warps from the unit square to directions and points.
//!
//! All inputs are uniform samples in `[0, 1)^2`. Hemisphere warps return
//! directions in a local frame whose +Z axis is the surface normal.

use crate::{Vec2, Vec3};
use std::f32::consts::{FRAC_1_PI, FRAC_PI_2, FRAC_PI_4, PI};

/// Shirley-Chiu concentric mapping onto the unit disk.
pub fn concentric_disk(u: Vec2) -> Vec2 {
    let o = u * 2.0 - Vec2::ONE;
    if o.x == 0.0 && o.y == 0.0 {
        return Vec2::ZERO;
    }

    let (r, theta) = if o.x.abs() > o.y.abs() {
        (o.x, FRAC_PI_4 * (o.y / o.x))
    } else {
        (o.y, FRAC_PI_2 - FRAC_PI_4 * (o.x / o.y))
    };
    Vec2::new(theta.cos(), theta.sin()) * r
}

/// Cosine-weighted direction on the +Z hemisphere.
pub fn cosine_hemisphere(u: Vec2) -> Vec3 {
    let d = concentric_disk(u);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    Vec3::new(d.x, d.y, z)
}

#[inline]
pub fn cosine_hemisphere_pdf(cos_theta: f32) -> f32 {
    cos_theta * FRAC_1_PI
}

/// Uniform direction on the +Z hemisphere.
pub fn uniform_hemisphere(u: Vec2) -> Vec3 {
    let z = u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

#[inline]
pub fn uniform_hemisphere_pdf() -> f32 {
    0.5 * FRAC_1_PI
}

/// Uniform direction on the unit sphere.
pub fn uniform_sphere(u: Vec2) -> Vec3 {
    let z = 1.0 - 2.0 * u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

#[inline]
pub fn uniform_sphere_pdf() -> f32 {
    0.25 * FRAC_1_PI
}

/// Jittered sample inside stratum `(i, j)` of an `n x n` grid over the unit
/// square. `jitter` is a uniform sample in `[0, 1)^2`.
#[inline]
pub fn stratified(i: u32, j: u32, n: u32, jitter: Vec2) -> Vec2 {
    let inv = 1.0 / n as f32;
    let p = (Vec2::new(i as f32, j as f32) + jitter) * inv;
    // Keep the result strictly below 1 even when jitter rounds up
    p.min(Vec2::splat(1.0 - f32::EPSILON))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_u(rng: &mut StdRng) -> Vec2 {
        Vec2::new(rng.gen(), rng.gen())
    }

    #[test]
    fn test_concentric_disk_stays_in_disk() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let d = concentric_disk(random_u(&mut rng));
            assert!(d.length() <= 1.0 + 1e-5);
        }
        assert_eq!(concentric_disk(Vec2::splat(0.5)), Vec2::ZERO);
    }

    #[test]
    fn test_hemisphere_warps_are_unit_and_upper() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..1000 {
            let u = random_u(&mut rng);
            for w in [cosine_hemisphere(u), uniform_hemisphere(u)] {
                assert!((w.length() - 1.0).abs() < 1e-4);
                assert!(w.z >= 0.0);
            }
            assert!((uniform_sphere(u).length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_cosine_hemisphere_mean_cosine() {
        // E[cos] under cos/pi density is 2/3
        let mut rng = StdRng::seed_from_u64(3);
        let n = 200_000;
        let mut sum = 0.0f64;
        for _ in 0..n {
            sum += cosine_hemisphere(random_u(&mut rng)).z as f64;
        }
        let mean = sum / n as f64;
        assert!((mean - 2.0 / 3.0).abs() < 5e-3, "mean cos = {mean}");
    }

    #[test]
    fn test_stratified_covers_each_cell() {
        let n = 4;
        for i in 0..n {
            for j in 0..n {
                let p = stratified(i, j, n, Vec2::splat(0.5));
                assert_eq!((p.x * n as f32) as u32, i);
                assert_eq!((p.y * n as f32) as u32, j);
            }
        }
        let edge = stratified(n - 1, n - 1, n, Vec2::splat(0.999_999_9));
        assert!(edge.x < 1.0 && edge.y < 1.0);
    }
}
