//! Simple path tracer example.
//!
//! Renders a field of tessellated spheres under a sphere light and a dim sky,
//! and saves the result in PPM format.

use phos_core::{shapes, Light, Material, Scene};
use phos_math::{Color, Vec3};
use phos_renderer::{color_to_rgba, Camera, ImageBuffer, RenderConfig, Renderer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::{BufWriter, Write};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Phos Path Tracer - Simple Example");
    println!("=================================");

    let start = std::time::Instant::now();
    let scene = build_scene()?;
    println!(
        "Scene built in {:?}: {} triangles, {} materials",
        start.elapsed(),
        scene.triangle_count(),
        scene.materials.len()
    );

    let camera = Camera::new()
        .with_position(
            Vec3::new(13.0, 2.0, 3.0), // look_from
            Vec3::new(0.0, 0.0, 0.0),  // look_at
            Vec3::new(0.0, 1.0, 0.0),  // vup
        )
        .with_lens(20.0, 0.6, 10.0);

    let config = RenderConfig {
        width: 800,
        height: 450,
        samples_per_dimension: 6,
        max_depth: 10,
        ..Default::default()
    };

    let renderer = Renderer::new(scene, camera, config)?;
    let image = renderer.render()?;
    println!("{:?}", renderer.stats());

    let filename = "output.ppm";
    save_ppm(&image, filename)?;
    println!("Saved to {}", filename);
    Ok(())
}

fn build_scene() -> Result<Scene, Box<dyn std::error::Error>> {
    let mut scene = Scene::new("spheres").with_environment(Color::new(0.05, 0.07, 0.1));

    let ground = scene.add_material(Material::diffuse("ground", Color::splat(0.5)));
    scene.add_mesh(
        shapes::quad(
            Vec3::new(-50.0, 0.0, -50.0),
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(100.0, 0.0, 0.0),
        ),
        ground,
    )?;

    // Three main spheres
    let glass = scene.add_material(Material::glass("glass", 1.5));
    let brown = scene.add_material(Material::diffuse("brown", Color::new(0.4, 0.2, 0.1)));
    let steel = scene.add_material(Material::metal("steel", Color::new(0.7, 0.6, 0.5), 0.05));
    scene.add_mesh(shapes::uv_sphere(Vec3::new(0.0, 1.0, 0.0), 1.0, 64, 32), glass)?;
    scene.add_mesh(shapes::uv_sphere(Vec3::new(-4.0, 1.0, 0.0), 1.0, 64, 32), brown)?;
    scene.add_mesh(shapes::uv_sphere(Vec3::new(4.0, 1.0, 0.0), 1.0, 64, 32), steel)?;

    // Small random spheres
    let mut rng = StdRng::seed_from_u64(42);
    for a in -5..5 {
        for b in -5..5 {
            let center = Vec3::new(
                a as f32 + 0.9 * rng.gen::<f32>(),
                0.2,
                b as f32 + 0.9 * rng.gen::<f32>(),
            );
            if (center - Vec3::new(4.0, 0.2, 0.0)).length() <= 0.9 {
                continue;
            }

            let choose_mat: f32 = rng.gen();
            let material = if choose_mat < 0.7 {
                let albedo = Color::new(
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                );
                Material::diffuse(format!("diffuse_{a}_{b}"), albedo)
            } else if choose_mat < 0.85 {
                let kd = Color::new(rng.gen(), rng.gen(), rng.gen());
                Material::plastic(format!("plastic_{a}_{b}"), kd, Color::splat(0.25), 0.1)
            } else if choose_mat < 0.95 {
                let albedo = Color::new(
                    0.5 + 0.5 * rng.gen::<f32>(),
                    0.5 + 0.5 * rng.gen::<f32>(),
                    0.5 + 0.5 * rng.gen::<f32>(),
                );
                Material::metal(format!("metal_{a}_{b}"), albedo, 0.5 * rng.gen::<f32>())
            } else {
                Material::glass(format!("glass_{a}_{b}"), 1.5)
            };
            let id = scene.add_material(material);
            scene.add_mesh(shapes::uv_sphere(center, 0.2, 24, 12), id)?;
        }
    }

    scene.add_light(Light::sphere(Vec3::new(2.0, 8.0, 4.0), 1.5, Color::splat(30.0)));
    Ok(scene)
}

fn save_ppm(image: &ImageBuffer, filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "P3")?;
    writeln!(writer, "{} {}", image.width, image.height)?;
    writeln!(writer, "255")?;

    for y in 0..image.height {
        for x in 0..image.width {
            let rgba = color_to_rgba(image.get(x, y));
            writeln!(writer, "{} {} {}", rgba[0], rgba[1], rgba[2])?;
        }
    }

    Ok(())
}
