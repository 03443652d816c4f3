use phos_math::Color;

/// Fresnel reflectance term.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Fresnel {
    /// Everything is reflected.
    One,
    /// Exact dielectric interface; `eta_i` is the medium on the normal side.
    Dielectric { eta_i: f32, eta_t: f32 },
    /// Schlick's approximation seeded with normal-incidence reflectance.
    Schlick(Color),
}

impl Fresnel {
    pub fn dielectric(eta_i: f32, eta_t: f32) -> Self {
        Fresnel::Dielectric { eta_i, eta_t }
    }

    pub fn evaluate(&self, cos_theta_i: f32) -> Color {
        match *self {
            Fresnel::One => Color::ONE,
            Fresnel::Dielectric { eta_i, eta_t } => {
                Color::splat(fresnel_dielectric(cos_theta_i, eta_i, eta_t))
            }
            Fresnel::Schlick(f0) => f0 + (Color::ONE - f0) * schlick_weight(cos_theta_i.abs()),
        }
    }
}

/// `(1 - cos)^5`
#[inline]
pub fn schlick_weight(cos_theta: f32) -> f32 {
    let x = (1.0 - cos_theta).clamp(0.0, 1.0);
    let x2 = x * x;
    x2 * x2 * x
}

/// Unpolarized reflectance of a dielectric interface.
///
/// A negative `cos_theta_i` means the incident direction is on the far side
/// of the normal, so the indices are swapped. Returns 1 under total internal
/// reflection.
pub fn fresnel_dielectric(cos_theta_i: f32, eta_i: f32, eta_t: f32) -> f32 {
    let mut cos_i = cos_theta_i.clamp(-1.0, 1.0);
    let (eta_i, eta_t) = if cos_i > 0.0 {
        (eta_i, eta_t)
    } else {
        cos_i = -cos_i;
        (eta_t, eta_i)
    };

    let sin_i = (1.0 - cos_i * cos_i).max(0.0).sqrt();
    let sin_t = eta_i / eta_t * sin_i;
    if sin_t >= 1.0 {
        return 1.0;
    }
    let cos_t = (1.0 - sin_t * sin_t).max(0.0).sqrt();

    let r_parl = (eta_t * cos_i - eta_i * cos_t) / (eta_t * cos_i + eta_i * cos_t);
    let r_perp = (eta_i * cos_i - eta_t * cos_t) / (eta_i * cos_i + eta_t * cos_t);
    0.5 * (r_parl * r_parl + r_perp * r_perp)
}
