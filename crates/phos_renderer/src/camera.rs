//! Thin-lens camera for primary ray generation.

use phos_math::{sampling, Ray, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Camera placement and lens; call [`Camera::initialize`] after the last
/// builder call and before generating rays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    pub image_width: u32,
    pub image_height: u32,

    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,

    // Lens settings
    vfov: f32,          // Vertical field of view in degrees
    defocus_angle: f32, // Variation angle of rays through each pixel
    focus_dist: f32,    // Distance from camera to plane of perfect focus

    // Cached computed values (set by initialize())
    #[serde(skip)]
    pixel00_loc: Vec3,
    #[serde(skip)]
    pixel_delta_u: Vec3,
    #[serde(skip)]
    pixel_delta_v: Vec3,
    #[serde(skip)]
    defocus_disk_u: Vec3,
    #[serde(skip)]
    defocus_disk_v: Vec3,
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self {
            image_width: 800,
            image_height: 450,
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::Y,
            vfov: 90.0,
            defocus_angle: 0.0,
            focus_dist: 1.0,
            pixel00_loc: Vec3::ZERO,
            pixel_delta_u: Vec3::ZERO,
            pixel_delta_v: Vec3::ZERO,
            defocus_disk_u: Vec3::ZERO,
            defocus_disk_v: Vec3::ZERO,
        }
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    /// Set lens settings. A zero `defocus_angle` gives a pinhole.
    pub fn with_lens(mut self, vfov: f32, defocus_angle: f32, focus_dist: f32) -> Self {
        self.vfov = vfov;
        self.defocus_angle = defocus_angle;
        self.focus_dist = focus_dist;
        self
    }

    pub fn position(&self) -> Vec3 {
        self.look_from
    }

    /// Initialize the camera (must be called before generating rays).
    pub fn initialize(&mut self) {
        let theta = self.vfov.to_radians();
        let h = (theta / 2.0).tan();
        let viewport_height = 2.0 * h * self.focus_dist;
        let viewport_width = viewport_height * (self.image_width as f32 / self.image_height.max(1) as f32);

        // Camera basis
        let w = (self.look_from - self.look_at).normalize();
        let u = self.vup.cross(w).normalize();
        let v = w.cross(u);

        // Image rows run down the screen
        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;

        self.pixel_delta_u = viewport_u / self.image_width.max(1) as f32;
        self.pixel_delta_v = viewport_v / self.image_height.max(1) as f32;

        // Corner of pixel (0, 0), not its centre
        self.pixel00_loc = self.look_from - self.focus_dist * w - viewport_u / 2.0 - viewport_v / 2.0;

        let defocus_radius = self.focus_dist * (self.defocus_angle / 2.0).to_radians().tan();
        self.defocus_disk_u = u * defocus_radius;
        self.defocus_disk_v = v * defocus_radius;
    }

    /// Ray through the continuous film position `(px, py)` in pixels.
    ///
    /// `lens` is a uniform sample in `[0, 1)^2`, ignored for a pinhole.
    /// The direction is normalized.
    pub fn get_ray(&self, px: f32, py: f32, lens: Vec2) -> Ray {
        let pixel_sample = self.pixel00_loc + px * self.pixel_delta_u + py * self.pixel_delta_v;

        let origin = if self.defocus_angle <= 0.0 {
            self.look_from
        } else {
            let p = sampling::concentric_disk(lens);
            self.look_from + p.x * self.defocus_disk_u + p.y * self.defocus_disk_v
        };

        Ray::new(origin, (pixel_sample - origin).normalize())
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
