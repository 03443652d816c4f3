//! Persistent surface descriptions.
//!
//! A [`Material`] holds parameters only. The renderer turns it into a
//! transient BSDF at every shading event; nothing here is mutated while
//! rendering, so materials are shared read-only between worker threads.

use phos_math::Color;
use serde::{Deserialize, Serialize};

/// Index of a material in its scene.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

impl MaterialId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The surface models a material can describe.
///
/// `sigma` is the Oren-Nayar roughness in degrees; `roughness` is the
/// artist-facing microfacet roughness in `[0, 1]`, remapped to a
/// distribution alpha by the renderer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialKind {
    /// Rough diffuse (Oren-Nayar; `sigma == 0` is Lambertian).
    Diffuse { albedo: Color, sigma: f32 },
    /// Diffuse base under a glossy dielectric coat.
    Plastic { kd: Color, ks: Color, roughness: f32 },
    /// Perfect mirror.
    Mirror { k: Color },
    /// Smooth dielectric with index of refraction `eta`.
    Glass { k: Color, eta: f32 },
    /// Diffuse base under a clear specular coat.
    Paint { k: Color, eta: f32 },
    /// Rough conductor tinted by `k`.
    Metal { k: Color, roughness: f32 },
    /// Absorbs everything that reaches it.
    Black,
}

/// A named surface description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub kind: MaterialKind,
}

impl Default for Material {
    fn default() -> Self {
        Self::diffuse("default", Color::splat(0.5))
    }
}

impl Material {
    pub fn new(name: impl Into<String>, kind: MaterialKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Lambertian diffuse.
    pub fn diffuse(name: impl Into<String>, albedo: Color) -> Self {
        Self::new(name, MaterialKind::Diffuse { albedo, sigma: 0.0 })
    }

    pub fn plastic(name: impl Into<String>, kd: Color, ks: Color, roughness: f32) -> Self {
        Self::new(name, MaterialKind::Plastic { kd, ks, roughness })
    }

    pub fn mirror(name: impl Into<String>, k: Color) -> Self {
        Self::new(name, MaterialKind::Mirror { k })
    }

    pub fn glass(name: impl Into<String>, eta: f32) -> Self {
        Self::new(name, MaterialKind::Glass { k: Color::ONE, eta })
    }

    pub fn paint(name: impl Into<String>, k: Color) -> Self {
        Self::new(name, MaterialKind::Paint { k, eta: 1.63 })
    }

    pub fn metal(name: impl Into<String>, k: Color, roughness: f32) -> Self {
        Self::new(name, MaterialKind::Metal { k, roughness })
    }

    /// Surface that ends every path hitting it.
    pub fn black(name: impl Into<String>) -> Self {
        Self::new(name, MaterialKind::Black)
    }

    /// Set the Oren-Nayar roughness (degrees) of a diffuse material.
    ///
    /// Has no effect on other kinds.
    pub fn with_sigma(mut self, sigma_deg: f32) -> Self {
        if let MaterialKind::Diffuse { sigma, .. } = &mut self.kind {
            *sigma = sigma_deg;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_builders() {
        let m = Material::diffuse("wall", Color::splat(0.8)).with_sigma(20.0);
        assert_eq!(
            m.kind,
            MaterialKind::Diffuse {
                albedo: Color::splat(0.8),
                sigma: 20.0
            }
        );

        let g = Material::glass("glass", 1.5).with_sigma(20.0);
        assert_eq!(
            g.kind,
            MaterialKind::Glass {
                k: Color::ONE,
                eta: 1.5
            }
        );
    }

    #[test]
    fn test_material_json_roundtrip() {
        let m = Material::metal("gold", Color::new(1.0, 0.78, 0.34), 0.3);
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"type\":\"metal\""));

        let back: Material = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);

        let black: Material = serde_json::from_str(r#"{"name":"soot","kind":{"type":"black"}}"#).unwrap();
        assert_eq!(black, Material::black("soot"));
    }
}
