//! End-to-end renders checked against closed-form radiance.

use phos_core::{shapes, Light, Material, Scene};
use phos_math::{Color, Vec3};
use phos_renderer::{Camera, ImageBuffer, RenderConfig, Renderer};

/// Mean of the `(2r+1)^2` pixels around the image centre.
fn centre_mean(image: &ImageBuffer, r: u32) -> Color {
    let (cx, cy) = (image.width / 2, image.height / 2);
    let mut sum = Color::ZERO;
    for y in cy - r..=cy + r {
        for x in cx - r..=cx + r {
            sum += image.get(x, y);
        }
    }
    sum / ((2 * r + 1) * (2 * r + 1)) as f32
}

#[test]
fn test_furnace_convex_sphere() {
    // Every bounce off a convex diffuse object escapes to the constant
    // environment, so the sphere shows albedo * environment.
    let mut scene = Scene::new("furnace").with_environment(Color::ONE);
    let m = scene.add_material(Material::diffuse("half", Color::splat(0.5)));
    scene
        .add_mesh(shapes::uv_sphere(Vec3::ZERO, 1.0, 64, 32), m)
        .unwrap();

    let camera = Camera::new()
        .with_position(Vec3::new(0.0, 0.0, 6.0), Vec3::ZERO, Vec3::Y)
        .with_lens(30.0, 0.0, 6.0);
    let config = RenderConfig {
        width: 15,
        height: 15,
        samples_per_dimension: 4,
        threads: 2,
        ..Default::default()
    };
    let image = Renderer::new(scene, camera, config).unwrap().render().unwrap();

    let centre = centre_mean(&image, 1);
    assert!((centre - Color::splat(0.5)).abs().max_element() < 0.02, "centre {centre}");
    // Corners see the environment directly
    assert!((image.get(0, 0) - Color::ONE).abs().max_element() < 1e-5);
}

#[test]
fn test_sphere_light_over_diffuse_plane() {
    // A sphere light of radius r at height h over a Lambertian floor
    // gives E = pi * Le * (r / h)^2 directly below it, so the floor
    // reflects albedo * Le * (r / h)^2.
    let (radius, height, le, albedo) = (0.5_f32, 2.0_f32, 10.0_f32, 0.5_f32);

    let mut scene = Scene::new("floor");
    let m = scene.add_material(Material::diffuse("floor", Color::splat(albedo)));
    scene
        .add_mesh(
            shapes::quad(
                Vec3::new(-10.0, 0.0, -10.0),
                Vec3::new(0.0, 0.0, 20.0),
                Vec3::new(20.0, 0.0, 0.0),
            ),
            m,
        )
        .unwrap();
    scene.add_light(Light::sphere(Vec3::new(0.0, height, 0.0), radius, Color::splat(le)));

    let camera = Camera::new()
        .with_position(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, Vec3::Z)
        .with_lens(5.0, 0.0, 5.0);
    let config = RenderConfig {
        width: 9,
        height: 9,
        samples_per_dimension: 12,
        threads: 2,
        seed: 7,
        ..Default::default()
    };
    let image = Renderer::new(scene, camera, config).unwrap().render().unwrap();

    let expected = albedo * le * (radius / height).powi(2);
    let centre = centre_mean(&image, 1);
    let rel = (centre.x - expected).abs() / expected;
    assert!(rel < 0.1, "centre {} expected {expected}", centre.x);
    assert!(image.pixels.iter().all(|p| p.is_finite()));
}

#[test]
fn test_same_seed_renders_identical_images() {
    let build = || {
        let mut scene = Scene::new("box");
        let white = scene.add_material(Material::diffuse("white", Color::splat(0.7)));
        let red = scene.add_material(Material::diffuse("red", Color::new(0.6, 0.1, 0.1)));
        scene
            .add_mesh(shapes::cuboid(Vec3::new(-2.0, -0.1, -2.0), Vec3::new(2.0, 0.0, 2.0)), white)
            .unwrap();
        scene
            .add_mesh(shapes::cuboid(Vec3::splat(-0.5), Vec3::splat(0.5)), red)
            .unwrap();
        scene.add_light(Light::rect(
            Vec3::new(-0.5, 3.0, -0.5),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Color::splat(8.0),
        ));

        let camera = Camera::new().with_position(Vec3::new(2.0, 2.0, 4.0), Vec3::ZERO, Vec3::Y);
        let config = RenderConfig {
            width: 24,
            height: 20,
            samples_per_dimension: 2,
            patch_size: 8,
            threads: 3,
            seed: 11,
            ..Default::default()
        };
        Renderer::new(scene, camera, config).unwrap()
    };

    let a = build().render().unwrap();
    let b = build().render().unwrap();
    assert_eq!(a, b);
    assert!(a.average().max_element() > 0.0);
}
