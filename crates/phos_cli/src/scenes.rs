//! Procedural demo scenes.

use anyhow::Result;
use phos_core::{shapes, LatLongMap, Light, Material, Scene};
use phos_math::{Color, Vec3};
use phos_renderer::Camera;

/// Unit Cornell box spanning [-1, 1] on every axis, open towards +Z.
pub fn cornell_box() -> Result<(Scene, Camera)> {
    let mut scene = Scene::new("cornell");

    let white = scene.add_material(Material::diffuse("white", Color::new(0.73, 0.73, 0.73)));
    let red = scene.add_material(Material::diffuse("red", Color::new(0.65, 0.05, 0.05)));
    let green = scene.add_material(Material::diffuse("green", Color::new(0.12, 0.45, 0.15)));
    let mirror = scene.add_material(Material::mirror("mirror", Color::splat(0.9)));
    let glass = scene.add_material(Material::glass("glass", 1.5));

    let (x, y, z) = (Vec3::X * 2.0, Vec3::Y * 2.0, Vec3::Z * 2.0);
    let lo = Vec3::splat(-1.0);

    // Walls face into the box
    scene.add_mesh(shapes::quad(lo, z, x), white)?; // floor
    scene.add_mesh(shapes::quad(Vec3::new(-1.0, 1.0, -1.0), x, z), white)?; // ceiling
    scene.add_mesh(shapes::quad(lo, x, y), white)?; // back
    scene.add_mesh(shapes::quad(lo, y, z), red)?; // left
    scene.add_mesh(shapes::quad(Vec3::new(1.0, -1.0, -1.0), z, y), green)?; // right

    scene.add_mesh(
        shapes::cuboid(Vec3::new(-0.65, -1.0, -0.6), Vec3::new(-0.1, 0.2, -0.05)),
        mirror,
    )?;
    scene.add_mesh(shapes::uv_sphere(Vec3::new(0.45, -0.6, 0.3), 0.4, 64, 32), glass)?;

    scene.add_light(Light::rect(
        Vec3::new(-0.25, 0.99, -0.25),
        Vec3::new(0.5, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 0.5),
        Color::new(17.0, 12.0, 4.0),
    ));

    let camera = Camera::new()
        .with_position(Vec3::new(0.0, 0.0, 3.9), Vec3::ZERO, Vec3::Y)
        .with_lens(37.0, 0.0, 3.9);
    Ok((scene, camera))
}

/// One sphere per material kind on a diffuse floor.
pub fn material_swatches() -> Result<(Scene, Camera)> {
    let horizon = Color::new(0.45, 0.45, 0.4);
    let zenith = Color::new(0.15, 0.25, 0.5);
    let sky = LatLongMap::from_fn(128, 64, |d| {
        if d.y > 0.0 {
            horizon.lerp(zenith, d.y.sqrt())
        } else {
            Color::splat(0.1)
        }
    })?;
    let mut scene = Scene::new("materials").with_environment(sky);

    let floor = scene.add_material(Material::diffuse("floor", Color::splat(0.4)));
    scene.add_mesh(
        shapes::quad(
            Vec3::new(-20.0, 0.0, -20.0),
            Vec3::new(0.0, 0.0, 40.0),
            Vec3::new(40.0, 0.0, 0.0),
        ),
        floor,
    )?;

    let swatches = [
        Material::diffuse("diffuse", Color::new(0.8, 0.3, 0.2)).with_sigma(20.0),
        Material::plastic("plastic", Color::new(0.1, 0.3, 0.7), Color::splat(0.3), 0.05),
        Material::mirror("mirror", Color::splat(0.95)),
        Material::glass("glass", 1.5),
        Material::paint("paint", Color::new(0.7, 0.6, 0.1)),
        Material::metal("metal", Color::new(0.95, 0.64, 0.54), 0.2),
    ];
    let count = swatches.len();
    for (i, material) in swatches.into_iter().enumerate() {
        let id = scene.add_material(material);
        let x = (i as f32 - (count - 1) as f32 * 0.5) * 2.2;
        scene.add_mesh(shapes::uv_sphere(Vec3::new(x, 1.0, 0.0), 1.0, 64, 32), id)?;
    }

    scene.add_light(Light::sphere(Vec3::new(-3.0, 8.0, 6.0), 1.5, Color::splat(40.0)));

    let camera = Camera::new()
        .with_position(Vec3::new(0.0, 4.0, 14.0), Vec3::new(0.0, 1.0, 0.0), Vec3::Y)
        .with_lens(45.0, 0.0, 14.0);
    Ok((scene, camera))
}

#[cfg(test)]
mod tests {
    use super::*;
    use phos_renderer::{RenderConfig, Renderer};

    #[test]
    fn test_cornell_box_walls_face_inward() {
        let (scene, _) = cornell_box().unwrap();
        assert_eq!(scene.lights.len(), 1);

        // The first five meshes are the walls; their normals point at the centre
        for mesh in scene.meshes.iter().take(5) {
            let face = mesh.triangles().next().unwrap().face;
            let [a, b, c] = scene.pool.triangle(face);
            let n = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(n.dot(-centroid) > 0.0);
        }
    }

    #[test]
    fn test_presets_render() {
        for (scene, camera) in [cornell_box().unwrap(), material_swatches().unwrap()] {
            let config = RenderConfig {
                width: 16,
                height: 12,
                samples_per_dimension: 1,
                threads: 1,
                ..Default::default()
            };
            let image = Renderer::new(scene, camera, config).unwrap().render().unwrap();
            assert!(image.pixels.iter().all(|p| p.is_finite()));
            assert!(image.average().max_element() > 0.0);
        }
    }
}
