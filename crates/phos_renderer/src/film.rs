//! Film: patch scheduling and sample reconstruction.
//!
//! The image is divided into square patches handed out centre-first by an
//! atomic counter, so any number of workers can pull work without further
//! coordination. Finished samples are splatted back with a box filter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use phos_math::Color;

use crate::image::ImageBuffer;

/// A rectangular region of the image rendered as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Patch {
    /// X coordinate of the patch's top-left corner
    pub x: u32,
    /// Y coordinate of the patch's top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Position in the render order
    pub index: usize,
}

impl Patch {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    /// Get the total number of pixels in this patch.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Image coordinates of the pixel at row-major `local` index.
    #[inline]
    pub fn pixel(&self, local: u32) -> (u32, u32) {
        (self.x + local % self.width, self.y + local / self.width)
    }
}

/// One radiance estimate for one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Splat {
    pub x: u32,
    pub y: u32,
    pub radiance: Color,
}

/// Cover the image with patches, sorted by distance from the centre.
///
/// Patches on the right and bottom edges are clipped to the image.
pub fn generate_patches(width: u32, height: u32, patch_size: u32) -> Vec<Patch> {
    let mut patches = Vec::new();
    let size = patch_size.max(1);

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let pw = size.min(width - x);
            let ph = size.min(height - y);
            patches.push(Patch::new(x, y, pw, ph, patches.len()));
            x += size;
        }
        y += size;
    }

    sort_spiral(&mut patches, width, height);
    for (i, patch) in patches.iter_mut().enumerate() {
        patch.index = i;
    }
    patches
}

/// Sort patches by distance from the image centre.
fn sort_spiral(patches: &mut [Patch], width: u32, height: u32) {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let dist = |p: &Patch| {
        let cx = p.x as f32 + p.width as f32 / 2.0;
        let cy = p.y as f32 + p.height as f32 / 2.0;
        (cx - center_x).powi(2) + (cy - center_y).powi(2)
    };

    // Stable sort keeps row-major order among equidistant patches
    patches.sort_by(|a, b| dist(a).total_cmp(&dist(b)));
}

#[derive(Debug)]
struct Accumulator {
    sum: Vec<Color>,
    weight: Vec<f32>,
}

/// Frame buffer shared by all workers for one render.
#[derive(Debug)]
pub struct Film {
    width: u32,
    height: u32,
    patches: Vec<Patch>,
    next: AtomicUsize,
    pixels: Mutex<Accumulator>,
}

impl Film {
    pub fn new(width: u32, height: u32, patch_size: u32) -> Self {
        let n = (width * height) as usize;
        Self {
            width,
            height,
            patches: generate_patches(width, height, patch_size),
            next: AtomicUsize::new(0),
            pixels: Mutex::new(Accumulator {
                sum: vec![Color::ZERO; n],
                weight: vec![0.0; n],
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    /// Claim the next unrendered patch, or `None` once all are handed out.
    pub fn next_patch(&self) -> Option<Patch> {
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        self.patches.get(i).copied()
    }

    /// Accumulate samples with a box filter: every splat counts fully
    /// toward its own pixel only.
    pub fn apply_splats(&self, splats: &[Splat]) {
        let mut acc = match self.pixels.lock() {
            Ok(guard) => guard,
            // A panicking worker cannot leave a half-written splat behind
            Err(poisoned) => poisoned.into_inner(),
        };
        for s in splats {
            if s.x >= self.width || s.y >= self.height {
                continue;
            }
            let i = (s.y * self.width + s.x) as usize;
            acc.sum[i] += s.radiance;
            acc.weight[i] += 1.0;
        }
    }

    /// Resolve the accumulated samples into pixel values.
    pub fn resolve(&self) -> ImageBuffer {
        let acc = match self.pixels.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut image = ImageBuffer::new(self.width, self.height);
        for (i, (sum, w)) in acc.sum.iter().zip(&acc.weight).enumerate() {
            if *w > 0.0 {
                image.pixels[i] = *sum / *w;
            }
        }
        image
    }
}
