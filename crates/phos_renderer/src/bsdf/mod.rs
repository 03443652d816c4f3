//! Reflectance models.
//!
//! Every model works in a local shading frame where the shading normal is
//! +Z, with `wo` pointing toward the viewer and `wi` toward the light, and
//! implements the same contract:
//!
//! - `f(wi, wo)`: value for an explicit direction pair (zero where the model
//!   has no contribution, and always zero for delta lobes).
//! - `sample(wo, u, u_lobe)`: importance-sample `wi`; the returned pdf is
//!   consistent with `pdf(wi, wo)` for non-delta lobes and `1` for delta
//!   lobes.
//! - `pdf(wi, wo)`: density of `sample` producing `wi`; zero for delta
//!   lobes, which are recognised through [`BsdfFlags`] instead.
//!
//! [`Bsdf`] is a closed enum so per-bucket evaluation is a match, not a
//! virtual call. Instances are built per shading event in a
//! [`TileArena`](crate::TileArena); blends refer to their lobes by arena
//! reference.

mod diffuse;
mod fresnel;
mod microfacet;
mod specular;

use std::ops::BitOr;

use phos_math::{Color, Vec2, Vec3};

use crate::error::{RenderError, RenderResult};

pub use diffuse::{Lambert, OrenNayar};
pub use fresnel::{fresnel_dielectric, schlick_weight, Fresnel};
pub use microfacet::{roughness_to_alpha, Microfacet};
pub use specular::{SpecularReflection, SpecularTransmission};

/// Capability bits of a BSDF.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct BsdfFlags(u8);

impl BsdfFlags {
    pub const NONE: BsdfFlags = BsdfFlags(0);
    /// Spreads light over the hemisphere (Lambert, Oren-Nayar).
    pub const DIFFUSE: BsdfFlags = BsdfFlags(1 << 0);
    /// Glossy lobe with a finite distribution (microfacets).
    pub const SPECULAR: BsdfFlags = BsdfFlags(1 << 1);
    pub const REFLECTIVE: BsdfFlags = BsdfFlags(1 << 2);
    pub const TRANSMISSIVE: BsdfFlags = BsdfFlags(1 << 3);

    #[inline]
    pub fn contains(self, other: BsdfFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn intersects(self, other: BsdfFlags) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for BsdfFlags {
    type Output = BsdfFlags;

    fn bitor(self, rhs: BsdfFlags) -> BsdfFlags {
        BsdfFlags(self.0 | rhs.0)
    }
}

/// Result of importance sampling a BSDF.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BsdfSample {
    pub wi: Vec3,
    pub f: Color,
    pub pdf: f32,
    /// The direction came from a delta lobe; `pdf` is the lobe selection
    /// probability, not a density.
    pub delta: bool,
}

impl BsdfSample {
    /// A sample carrying no energy; the path should end.
    pub fn absorbed(wi: Vec3) -> Self {
        Self {
            wi,
            f: Color::ZERO,
            pdf: 0.0,
            delta: false,
        }
    }
}

/// Mixing weight of a [`Bsdf::Blend`], evaluated at `cos(theta_o)`.
/// The first lobe receives `s`, the second `1 - s`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BlendWeight {
    Constant(f32),
    /// Dielectric Fresnel reflectance of a coat.
    Fresnel { eta_i: f32, eta_t: f32 },
}

impl BlendWeight {
    #[inline]
    pub fn at(&self, cos_theta_o: f32) -> f32 {
        match *self {
            BlendWeight::Constant(s) => s.clamp(0.0, 1.0),
            BlendWeight::Fresnel { eta_i, eta_t } => fresnel_dielectric(cos_theta_o, eta_i, eta_t),
        }
    }
}

/// A transient BSDF instance.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Bsdf<'a> {
    Lambert(Lambert),
    OrenNayar(OrenNayar),
    Microfacet(Microfacet),
    SpecularReflection(SpecularReflection),
    SpecularTransmission(SpecularTransmission),
    Blend {
        a: &'a Bsdf<'a>,
        b: &'a Bsdf<'a>,
        weight: BlendWeight,
    },
    /// Black body with no lobes; cannot be sampled.
    Absorb,
}

impl<'a> Bsdf<'a> {
    pub fn flags(&self) -> BsdfFlags {
        match self {
            Bsdf::Lambert(_) | Bsdf::OrenNayar(_) => BsdfFlags::DIFFUSE | BsdfFlags::REFLECTIVE,
            Bsdf::Microfacet(_) => BsdfFlags::SPECULAR | BsdfFlags::REFLECTIVE,
            Bsdf::SpecularReflection(_) => BsdfFlags::REFLECTIVE,
            Bsdf::SpecularTransmission(_) => BsdfFlags::TRANSMISSIVE,
            Bsdf::Blend { a, b, .. } => a.flags() | b.flags(),
            Bsdf::Absorb => BsdfFlags::NONE,
        }
    }

    /// Has a non-delta lobe worth evaluating for explicit light samples.
    #[inline]
    pub fn has_distribution(&self) -> bool {
        self.flags()
            .intersects(BsdfFlags::DIFFUSE | BsdfFlags::SPECULAR)
    }

    #[inline]
    pub fn is_transmissive(&self) -> bool {
        self.flags().contains(BsdfFlags::TRANSMISSIVE)
    }

    pub fn f(&self, wi: Vec3, wo: Vec3) -> Color {
        match self {
            Bsdf::Lambert(m) => m.f(wi, wo),
            Bsdf::OrenNayar(m) => m.f(wi, wo),
            Bsdf::Microfacet(m) => m.f(wi, wo),
            Bsdf::SpecularReflection(_) | Bsdf::SpecularTransmission(_) | Bsdf::Absorb => {
                Color::ZERO
            }
            Bsdf::Blend { a, b, weight } => {
                let s = weight.at(wo.z);
                let mut f = Color::ZERO;
                if a.has_distribution() {
                    f += a.f(wi, wo) * s;
                }
                if b.has_distribution() {
                    f += b.f(wi, wo) * (1.0 - s);
                }
                f
            }
        }
    }

    pub fn pdf(&self, wi: Vec3, wo: Vec3) -> f32 {
        match self {
            Bsdf::Lambert(_) | Bsdf::OrenNayar(_) => diffuse::pdf_cosine(wi, wo),
            Bsdf::Microfacet(m) => m.pdf(wi, wo),
            Bsdf::SpecularReflection(_) | Bsdf::SpecularTransmission(_) | Bsdf::Absorb => 0.0,
            Bsdf::Blend { a, b, weight } => {
                let s = weight.at(wo.z);
                s * a.pdf(wi, wo) + (1.0 - s) * b.pdf(wi, wo)
            }
        }
    }

    /// Importance-sample an incident direction.
    ///
    /// `u` drives the direction, `u_lobe` the choice between blended lobes.
    /// Fails only for [`Bsdf::Absorb`].
    pub fn sample(&self, wo: Vec3, u: Vec2, u_lobe: f32) -> RenderResult<BsdfSample> {
        let sample = match self {
            Bsdf::Lambert(_) | Bsdf::OrenNayar(_) => {
                let wi = diffuse::sample_cosine(wo, u);
                BsdfSample {
                    wi,
                    f: self.f(wi, wo),
                    pdf: diffuse::pdf_cosine(wi, wo),
                    delta: false,
                }
            }
            Bsdf::Microfacet(m) => {
                let wi = m.sample_wi(wo, u);
                BsdfSample {
                    wi,
                    f: m.f(wi, wo),
                    pdf: m.pdf(wi, wo),
                    delta: false,
                }
            }
            Bsdf::SpecularReflection(m) => {
                let (wi, f) = m.sample(wo);
                BsdfSample {
                    wi,
                    f,
                    pdf: 1.0,
                    delta: true,
                }
            }
            Bsdf::SpecularTransmission(m) => match m.sample(wo) {
                Some((wi, f)) => BsdfSample {
                    wi,
                    f,
                    pdf: 1.0,
                    delta: true,
                },
                None => BsdfSample::absorbed(-wo),
            },
            Bsdf::Blend { a, b, weight } => {
                let s = weight.at(wo.z);
                let (chosen, other, p, u_lobe) = if u_lobe < s {
                    (a, b, s, u_lobe / s)
                } else {
                    (b, a, 1.0 - s, (u_lobe - s) / (1.0 - s))
                };

                let mut bs = chosen.sample(wo, u, u_lobe)?;
                if bs.delta {
                    // The other lobe cannot produce this exact direction
                    bs.f *= p;
                    bs.pdf *= p;
                } else {
                    bs.f = self.f(bs.wi, wo);
                    bs.pdf = p * bs.pdf + (1.0 - p) * other.pdf(bs.wi, wo);
                }
                bs
            }
            Bsdf::Absorb => return Err(RenderError::UnsupportedSample),
        };
        Ok(sample)
    }
}
