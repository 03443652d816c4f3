use std::f32::consts::PI;

use phos_math::{tangent, Color, Vec2, Vec3};

use super::fresnel::Fresnel;

/// Map artist roughness in `[0, 1]` to a GGX alpha.
///
/// Polynomial fit in `ln(roughness)` from pbrt-v3's
/// `TrowbridgeReitzDistribution::RoughnessToAlpha`; do not feed roughness
/// to the distribution directly.
pub fn roughness_to_alpha(roughness: f32) -> f32 {
    let x = roughness.max(1e-3).ln();
    1.62142 + 0.819955 * x + 0.1734 * x * x + 0.0171201 * x * x * x + 0.000640711 * x * x * x * x
}

/// Torrance-Sparrow reflection over a GGX (Trowbridge-Reitz) distribution
/// with separable Smith shadowing.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Microfacet {
    pub r: Color,
    pub alpha: f32,
    pub fresnel: Fresnel,
}

impl Microfacet {
    pub fn new(r: Color, alpha: f32, fresnel: Fresnel) -> Self {
        Self {
            r,
            alpha: alpha.max(1e-3),
            fresnel,
        }
    }

    /// GGX normal distribution `D(h)`.
    #[inline]
    fn d(&self, cos_h: f32) -> f32 {
        let a2 = self.alpha * self.alpha;
        let denom = cos_h * cos_h * (a2 - 1.0) + 1.0;
        a2 / (PI * denom * denom)
    }

    #[inline]
    fn g1(&self, cos: f32) -> f32 {
        let a2 = self.alpha * self.alpha;
        let c = cos.abs();
        2.0 * c / (c + (a2 + (1.0 - a2) * c * c).sqrt())
    }

    pub fn f(&self, wi: Vec3, wo: Vec3) -> Color {
        if !tangent::same_hemisphere(wi, wo) {
            return Color::ZERO;
        }
        let cos_i = tangent::abs_cos_theta(wi);
        let cos_o = tangent::abs_cos_theta(wo);
        if cos_i == 0.0 || cos_o == 0.0 {
            return Color::ZERO;
        }
        let wh = wi + wo;
        if wh == Vec3::ZERO {
            return Color::ZERO;
        }
        let wh = wh.normalize();

        let d = self.d(tangent::abs_cos_theta(wh));
        let g = self.g1(cos_i) * self.g1(cos_o);
        let f = self.fresnel.evaluate(wi.dot(wh).abs());

        self.r * f * (d * g / (4.0 * cos_i * cos_o))
    }

    /// Sample a half vector proportionally to `D(h) cos(theta_h)` and
    /// reflect `wo` about it.
    pub fn sample_wi(&self, wo: Vec3, u: Vec2) -> Vec3 {
        let theta = (self.alpha * (u.x / (1.0 - u.x)).sqrt()).atan();
        let phi = 2.0 * PI * u.y;
        let (sin_t, cos_t) = theta.sin_cos();
        let mut wh = Vec3::new(sin_t * phi.cos(), sin_t * phi.sin(), cos_t);
        if wo.z < 0.0 {
            wh = -wh;
        }
        -wo + wh * (2.0 * wo.dot(wh))
    }

    pub fn pdf(&self, wi: Vec3, wo: Vec3) -> f32 {
        if !tangent::same_hemisphere(wi, wo) {
            return 0.0;
        }
        let wh = wi + wo;
        if wh == Vec3::ZERO {
            return 0.0;
        }
        let wh = wh.normalize();
        let wo_dot_h = wo.dot(wh).abs();
        if wo_dot_h == 0.0 {
            return 0.0;
        }
        let cos_h = tangent::abs_cos_theta(wh);
        self.d(cos_h) * cos_h / (4.0 * wo_dot_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roughness_to_alpha_is_monotonic() {
        let mut last = 0.0;
        for i in 1..=10 {
            let a = roughness_to_alpha(i as f32 / 10.0);
            assert!(a > last);
            last = a;
        }
        assert!((roughness_to_alpha(1.0) - 1.62142).abs() < 1e-5);
        assert!(roughness_to_alpha(0.0) > 0.0);
    }

    #[test]
    fn test_distribution_normalized() {
        // Integral of D(h) cos(theta_h) over the hemisphere is 1
        let m = Microfacet::new(Color::ONE, 0.4, Fresnel::One);
        let n = 400;
        let mut sum = 0.0f64;
        for i in 0..n {
            let cos_t = (i as f32 + 0.5) / n as f32;
            // d(omega) = 2 pi d(cos)
            sum += (m.d(cos_t) * cos_t * 2.0 * PI) as f64 / n as f64;
        }
        assert!((sum - 1.0).abs() < 0.02, "sum = {sum}");
    }

    #[test]
    fn test_degenerate_directions_are_zero() {
        let m = Microfacet::new(Color::ONE, 0.3, Fresnel::One);
        let grazing = Vec3::new(1.0, 0.0, 0.0);
        assert_eq!(m.f(grazing, Vec3::Z), Color::ZERO);
        assert_eq!(m.f(Vec3::Z, -Vec3::Z), Color::ZERO);
        assert_eq!(m.pdf(Vec3::Z, -Vec3::Z), 0.0);
    }

    #[test]
    fn test_sampled_directions_stay_on_wo_side() {
        let m = Microfacet::new(Color::ONE, 0.2, Fresnel::One);
        let wo = Vec3::new(0.3, 0.1, 0.9).normalize();
        let wi = m.sample_wi(wo, Vec2::new(0.0, 0.25));

        // u.x == 0 samples the macro normal: a perfect mirror direction
        assert!((wi - Vec3::new(-wo.x, -wo.y, wo.z)).length() < 1e-5);
    }
}
