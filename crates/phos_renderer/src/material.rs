//! Binding of persistent scene materials to transient BSDFs.

use phos_core::{Material, MaterialKind};
use phos_math::Color;

use crate::arena::TileArena;
use crate::bsdf::{
    roughness_to_alpha, BlendWeight, Bsdf, Fresnel, Lambert, Microfacet, OrenNayar,
    SpecularReflection, SpecularTransmission,
};
use crate::error::RenderResult;

/// Index of refraction of the plastic coat.
const PLASTIC_ETA: f32 = 1.5;

/// Extension trait turning a [`Material`] into a BSDF.
pub trait MaterialExt {
    /// Build a fresh BSDF for one shading event.
    ///
    /// The BSDF and all of its lobes live in `arena` and are invalidated by
    /// the arena's next reset. The material itself is never modified, so
    /// this is safe to call from every worker at once.
    fn instantiate<'a>(&self, arena: &'a TileArena) -> RenderResult<&'a Bsdf<'a>>;
}

impl MaterialExt for Material {
    fn instantiate<'a>(&self, arena: &'a TileArena) -> RenderResult<&'a Bsdf<'a>> {
        let bsdf = match &self.kind {
            MaterialKind::Diffuse { albedo, sigma } => {
                if *sigma > 0.0 {
                    Bsdf::OrenNayar(OrenNayar::new(*albedo, *sigma))
                } else {
                    Bsdf::Lambert(Lambert::new(*albedo))
                }
            }
            MaterialKind::Plastic { kd, ks, roughness } => Bsdf::Blend {
                a: arena.alloc(Bsdf::Microfacet(Microfacet::new(
                    *ks,
                    roughness_to_alpha(*roughness),
                    Fresnel::One,
                )))?,
                b: arena.alloc(Bsdf::Lambert(Lambert::new(*kd)))?,
                weight: BlendWeight::Fresnel {
                    eta_i: 1.0,
                    eta_t: PLASTIC_ETA,
                },
            },
            MaterialKind::Mirror { k } => Bsdf::SpecularReflection(SpecularReflection::new(*k)),
            MaterialKind::Glass { k, eta } => Bsdf::Blend {
                a: arena.alloc(Bsdf::SpecularReflection(SpecularReflection::new(*k)))?,
                b: arena.alloc(Bsdf::SpecularTransmission(SpecularTransmission::new(
                    *k, 1.0, *eta,
                )))?,
                weight: BlendWeight::Fresnel {
                    eta_i: 1.0,
                    eta_t: *eta,
                },
            },
            MaterialKind::Paint { k, eta } => Bsdf::Blend {
                a: arena.alloc(Bsdf::SpecularReflection(SpecularReflection::new(Color::ONE)))?,
                b: arena.alloc(Bsdf::Lambert(Lambert::new(*k)))?,
                weight: BlendWeight::Fresnel {
                    eta_i: 1.0,
                    eta_t: *eta,
                },
            },
            MaterialKind::Metal { k, roughness } => Bsdf::Microfacet(Microfacet::new(
                Color::ONE,
                roughness_to_alpha(*roughness),
                Fresnel::Schlick(*k),
            )),
            MaterialKind::Black => Bsdf::Absorb,
        };
        arena.alloc(bsdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsdf::BsdfFlags;

    #[test]
    fn test_material_kinds_map_to_expected_lobes() {
        let arena = TileArena::new(1 << 16);

        let diffuse = Material::diffuse("d", Color::splat(0.5));
        assert!(matches!(diffuse.instantiate(&arena).unwrap(), Bsdf::Lambert(_)));

        let rough = Material::diffuse("r", Color::splat(0.5)).with_sigma(20.0);
        assert!(matches!(rough.instantiate(&arena).unwrap(), Bsdf::OrenNayar(_)));

        let mirror = Material::mirror("m", Color::ONE).instantiate(&arena).unwrap();
        assert!(!mirror.has_distribution());

        let glass = Material::glass("g", 1.5).instantiate(&arena).unwrap();
        assert!(!glass.has_distribution());
        assert!(glass.is_transmissive());

        let paint = Material::paint("p", Color::X).instantiate(&arena).unwrap();
        assert!(paint.has_distribution());
        assert!(!paint.flags().contains(BsdfFlags::SPECULAR));

        let plastic = Material::plastic("pl", Color::Y, Color::splat(0.04), 0.2)
            .instantiate(&arena)
            .unwrap();
        assert!(plastic
            .flags()
            .contains(BsdfFlags::DIFFUSE | BsdfFlags::SPECULAR));

        let metal = Material::metal("au", Color::new(1.0, 0.8, 0.3), 0.3)
            .instantiate(&arena)
            .unwrap();
        assert!(matches!(metal, Bsdf::Microfacet(_)));

        let black = Material::black("b").instantiate(&arena).unwrap();
        assert_eq!(*black, Bsdf::Absorb);
        assert!(black.flags().is_empty());
    }

    #[test]
    fn test_instances_are_independent() {
        let arena = TileArena::new(1 << 16);
        let m = Material::glass("g", 1.5);
        let a = m.instantiate(&arena).unwrap();
        let b = m.instantiate(&arena).unwrap();

        assert_eq!(a, b);
        assert!(!std::ptr::eq(a, b));
    }
}
