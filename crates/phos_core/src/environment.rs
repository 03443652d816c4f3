//! Radiance arriving from outside the scene.
//!
//! Rays that leave the scene look the environment up by direction. Maps are
//! equirectangular (latitude/longitude) with +Y up: `v = 0` is the zenith,
//! `v = 1` the nadir, and `u` runs from +X (`u = 0`) towards +Z.

use std::f32::consts::{PI, TAU};

use phos_math::{Color, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{SceneError, SceneResult};

/// Environment emitter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Environment {
    /// Same radiance in every direction.
    Constant { radiance: Color },
    /// Radiance looked up in a lat-long map.
    LatLong(LatLongMap),
}

impl Environment {
    /// Radiance arriving along `-direction`, i.e. seen when looking along
    /// `direction`.
    pub fn eval(&self, direction: Vec3) -> Color {
        match self {
            Environment::Constant { radiance } => *radiance,
            Environment::LatLong(map) => map.sample(LatLongMap::direction_to_uv(direction)),
        }
    }
}

impl From<Color> for Environment {
    fn from(radiance: Color) -> Self {
        Environment::Constant { radiance }
    }
}

impl From<LatLongMap> for Environment {
    fn from(map: LatLongMap) -> Self {
        Environment::LatLong(map)
    }
}

/// In-memory equirectangular radiance map, row-major from the zenith down.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLongMap {
    width: u32,
    height: u32,
    texels: Vec<Color>,
}

impl LatLongMap {
    pub fn new(width: u32, height: u32, texels: Vec<Color>) -> SceneResult<Self> {
        if width == 0 || height == 0 || texels.len() != (width * height) as usize {
            return Err(SceneError::EnvironmentSize {
                width,
                height,
                texels: texels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// Fill a map by evaluating `radiance` at every texel centre direction.
    pub fn from_fn(width: u32, height: u32, radiance: impl Fn(Vec3) -> Color) -> SceneResult<Self> {
        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let uv = Vec2::new(
                    (x as f32 + 0.5) / width as f32,
                    (y as f32 + 0.5) / height as f32,
                );
                texels.push(radiance(Self::uv_to_direction(uv)));
            }
        }
        Self::new(width, height, texels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn direction_to_uv(d: Vec3) -> Vec2 {
        let d = d.normalize_or_zero();
        let u = (d.z.atan2(d.x) / TAU).rem_euclid(1.0);
        let v = d.y.clamp(-1.0, 1.0).acos() / PI;
        Vec2::new(u, v)
    }

    pub fn uv_to_direction(uv: Vec2) -> Vec3 {
        let phi = uv.x * TAU;
        let theta = uv.y * PI;
        let (sin_t, cos_t) = theta.sin_cos();
        Vec3::new(sin_t * phi.cos(), cos_t, sin_t * phi.sin())
    }

    /// Bilinear lookup; `u` wraps around, `v` clamps at the poles.
    pub fn sample(&self, uv: Vec2) -> Color {
        let x = uv.x.rem_euclid(1.0) * self.width as f32 - 0.5;
        let y = (uv.y * self.height as f32 - 0.5).clamp(0.0, (self.height - 1) as f32);

        let x0 = x.floor();
        let fx = x - x0;
        let x0 = (x0 as i64).rem_euclid(self.width as i64) as u32;
        let x1 = (x0 + 1) % self.width;

        let y0 = y.floor() as u32;
        let fy = y - y0 as f32;
        let y1 = (y0 + 1).min(self.height - 1);

        let top = self.texel(x0, y0) * (1.0 - fx) + self.texel(x1, y0) * fx;
        let bottom = self.texel(x0, y1) * (1.0 - fx) + self.texel(x1, y1) * fx;
        top * (1.0 - fy) + bottom * fy
    }

    #[inline]
    fn texel(&self, x: u32, y: u32) -> Color {
        self.texels[(y * self.width + x) as usize]
    }
}
