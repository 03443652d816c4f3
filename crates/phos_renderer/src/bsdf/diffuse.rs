use std::f32::consts::FRAC_1_PI;

use phos_math::{sampling, tangent, Color, Vec2, Vec3};

/// Cosine-weighted hemisphere sample on the side of `wo`.
#[inline]
pub(crate) fn sample_cosine(wo: Vec3, u: Vec2) -> Vec3 {
    let mut wi = sampling::cosine_hemisphere(u);
    if wo.z < 0.0 {
        wi.z = -wi.z;
    }
    wi
}

#[inline]
pub(crate) fn pdf_cosine(wi: Vec3, wo: Vec3) -> f32 {
    if tangent::same_hemisphere(wi, wo) {
        tangent::abs_cos_theta(wi) * FRAC_1_PI
    } else {
        0.0
    }
}

/// Ideal diffuse reflector.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Lambert {
    pub k: Color,
}

impl Lambert {
    pub fn new(k: Color) -> Self {
        Self { k }
    }

    pub fn f(&self, wi: Vec3, wo: Vec3) -> Color {
        if tangent::same_hemisphere(wi, wo) {
            self.k * FRAC_1_PI
        } else {
            Color::ZERO
        }
    }
}

/// Oren-Nayar rough diffuse reflector (qualitative model).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrenNayar {
    pub k: Color,
    a: f32,
    b: f32,
}

impl OrenNayar {
    /// `sigma_deg` is the standard deviation of the facet slope angle in
    /// degrees. `0` reduces to Lambert.
    pub fn new(k: Color, sigma_deg: f32) -> Self {
        let sigma = sigma_deg.to_radians();
        let sigma2 = sigma * sigma;
        Self {
            k,
            a: 1.0 - sigma2 / (2.0 * (sigma2 + 0.33)),
            b: 0.45 * sigma2 / (sigma2 + 0.09),
        }
    }

    pub fn f(&self, wi: Vec3, wo: Vec3) -> Color {
        if !tangent::same_hemisphere(wi, wo) {
            return Color::ZERO;
        }

        let sin_theta_i = tangent::sin_theta(wi);
        let sin_theta_o = tangent::sin_theta(wo);

        let mut max_cos = 0.0;
        if sin_theta_i > 1e-4 && sin_theta_o > 1e-4 {
            let d_cos = tangent::cos_phi(wi) * tangent::cos_phi(wo)
                + tangent::sin_phi(wi) * tangent::sin_phi(wo);
            max_cos = d_cos.max(0.0);
        }

        let (sin_alpha, tan_beta) = if tangent::abs_cos_theta(wi) > tangent::abs_cos_theta(wo) {
            (sin_theta_o, sin_theta_i / tangent::abs_cos_theta(wi))
        } else {
            (sin_theta_i, sin_theta_o / tangent::abs_cos_theta(wo))
        };

        self.k * FRAC_1_PI * (self.a + self.b * max_cos * sin_alpha * tan_beta)
    }
}
