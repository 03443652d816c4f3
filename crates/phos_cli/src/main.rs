use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use image::codecs::hdr::HdrEncoder;
use phos_renderer::{Camera, ImageBuffer, RenderConfig, Renderer};

mod scenes;

/// Render a procedural scene with the phos stream path tracer
#[derive(Parser, Debug)]
#[command(name = "phos", version, about)]
struct Cli {
    /// Scene to render
    #[arg(short, long, value_enum, default_value_t = Preset::Cornell)]
    scene: Preset,

    /// Output image; `.png` is tone mapped to 8 bits, `.hdr` keeps linear radiance
    #[arg(short, long, default_value = "phos.png")]
    output: PathBuf,

    /// JSON render configuration; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short = 'W', long)]
    width: Option<u32>,

    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Strata per pixel side (samples per pixel is the square)
    #[arg(long)]
    spd: Option<u32>,

    #[arg(long)]
    max_depth: Option<u32>,

    /// Worker threads, 0 for all cores
    #[arg(short, long)]
    threads: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// Closed box with a ceiling light, a mirror block and a glass ball
    Cornell,
    /// Material swatches on a floor under a sky
    Materials,
}

impl Cli {
    fn render_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?
            }
            None => RenderConfig::default(),
        };

        if let Some(v) = self.width {
            config.width = v;
        }
        if let Some(v) = self.height {
            config.height = v;
        }
        if let Some(v) = self.spd {
            config.samples_per_dimension = v;
        }
        if let Some(v) = self.max_depth {
            config.max_depth = v;
        }
        if let Some(v) = self.threads {
            config.threads = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        Ok(config)
    }
}

fn save(frame: &ImageBuffer, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("png") => {
            let buffer = image::RgbaImage::from_raw(frame.width, frame.height, frame.to_rgba())
                .context("frame buffer size does not match the image")?;
            buffer.save(path)?;
        }
        Some("hdr") => {
            let pixels: Vec<image::Rgb<f32>> = frame
                .to_rgb_f32()
                .chunks_exact(3)
                .map(|c| image::Rgb([c[0], c[1], c[2]]))
                .collect();
            let file = File::create(path)?;
            HdrEncoder::new(BufWriter::new(file)).encode(&pixels, frame.width as usize, frame.height as usize)?;
        }
        _ => bail!("unsupported output format {}, use .png or .hdr", path.display()),
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.render_config()?;

    let start = Instant::now();
    let (scene, camera): (_, Camera) = match cli.scene {
        Preset::Cornell => scenes::cornell_box()?,
        Preset::Materials => scenes::material_swatches()?,
    };
    log::info!(
        "Scene '{}': {} triangles, {} materials, {} lights ({:.2?})",
        scene.name,
        scene.triangle_count(),
        scene.materials.len(),
        scene.lights.len(),
        start.elapsed()
    );

    let renderer = Renderer::new(scene, camera, config).context("preparing render")?;
    let image = renderer.render().context("rendering")?;

    save(&image, &cli.output).with_context(|| format!("writing {}", cli.output.display()))?;
    log::info!("Saved {}", cli.output.display());
    Ok(())
}
