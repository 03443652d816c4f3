use phos_math::{tangent, Color, Vec3};

/// Perfect mirror. Delta distribution: `f` and `pdf` are zero for every
/// explicit direction pair, only `sample` produces energy.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpecularReflection {
    pub k: Color,
}

impl SpecularReflection {
    pub fn new(k: Color) -> Self {
        Self { k }
    }

    /// The mirrored direction and its value.
    pub fn sample(&self, wo: Vec3) -> (Vec3, Color) {
        let wi = tangent::reflect(wo);
        let cos = tangent::abs_cos_theta(wi);
        if cos == 0.0 {
            return (wi, Color::ZERO);
        }
        (wi, self.k / cos)
    }
}

/// Perfect refraction through a smooth interface between `eta_a` (the
/// side the normal points to) and `eta_b`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpecularTransmission {
    pub k: Color,
    pub eta_a: f32,
    pub eta_b: f32,
}

impl SpecularTransmission {
    pub fn new(k: Color, eta_a: f32, eta_b: f32) -> Self {
        Self { k, eta_a, eta_b }
    }

    /// The refracted direction and its value, or `None` under total
    /// internal reflection.
    pub fn sample(&self, wo: Vec3) -> Option<(Vec3, Color)> {
        let entering = tangent::cos_theta(wo) > 0.0;
        let (eta_i, eta_t) = if entering {
            (self.eta_a, self.eta_b)
        } else {
            (self.eta_b, self.eta_a)
        };
        let eta = eta_i / eta_t;

        let cos_i = tangent::abs_cos_theta(wo);
        let sin2_t = eta * eta * tangent::sin2_theta(wo);
        if sin2_t >= 1.0 {
            return None;
        }
        let cos_t = (1.0 - sin2_t).sqrt();

        let n = if entering { Vec3::Z } else { -Vec3::Z };
        let wi = -wo * eta + n * (eta * cos_i - cos_t);

        let cos_wi = tangent::abs_cos_theta(wi);
        if cos_wi == 0.0 {
            return None;
        }
        Some((wi, self.k / cos_wi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_reflects_about_normal() {
        let m = SpecularReflection::new(Color::splat(0.9));
        let wo = Vec3::new(0.6, 0.0, 0.8);
        let (wi, f) = m.sample(wo);

        assert!((wi - Vec3::new(-0.6, 0.0, 0.8)).length() < 1e-6);
        // f * cos == k
        assert!((f * 0.8 - Color::splat(0.9)).length() < 1e-5);
    }

    #[test]
    fn test_refraction_obeys_snell() {
        let t = SpecularTransmission::new(Color::ONE, 1.0, 1.5);
        let theta_i = 40f32.to_radians();
        let wo = Vec3::new(theta_i.sin(), 0.0, theta_i.cos());
        let (wi, _) = t.sample(wo).unwrap();

        assert!(wi.z < 0.0);
        assert!((wi.length() - 1.0).abs() < 1e-5);
        let sin_t = (wi.x * wi.x + wi.y * wi.y).sqrt();
        assert!((1.0 * theta_i.sin() - 1.5 * sin_t).abs() < 1e-5);
    }

    #[test]
    fn test_refraction_round_trip() {
        // Reversing the refracted ray leads back out along the original
        let t = SpecularTransmission::new(Color::ONE, 1.0, 1.5);
        for wo in [
            Vec3::Z,
            Vec3::new(0.3, -0.2, 0.9).normalize(),
            Vec3::new(-0.7, 0.1, 0.3).normalize(),
        ] {
            let (inside, _) = t.sample(wo).unwrap();
            let (back, _) = t.sample(inside).unwrap();
            assert!((back - wo).length() < 1e-4, "{wo:?} -> {back:?}");
        }
    }

    #[test]
    fn test_total_internal_reflection() {
        let t = SpecularTransmission::new(Color::ONE, 1.0, 1.5);
        let theta = 60f32.to_radians();
        // Inside the glass, heading out at 60 degrees from the normal
        let wo = Vec3::new(theta.sin(), 0.0, -theta.cos());
        assert!(t.sample(wo).is_none());
    }
}
