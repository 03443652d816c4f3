use crate::Vec3;

/// Linear RGB radiance or reflectance.
///
/// Colors share glam's `Vec3` so component-wise add/multiply/scale come for
/// free; the renderer-specific reductions live on [`ColorExt`].
pub type Color = Vec3;

/// Extension trait for color reductions.
pub trait ColorExt {
    /// CIE Y of a linear sRGB color. Used for roulette weighting.
    fn luminance(&self) -> f32;

    /// True if every channel is exactly zero.
    fn is_black(&self) -> bool;

    /// Largest channel value.
    fn max_channel(&self) -> f32;
}

impl ColorExt for Color {
    #[inline]
    fn luminance(&self) -> f32 {
        0.212671 * self.x + 0.715160 * self.y + 0.072169 * self.z
    }

    #[inline]
    fn is_black(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    #[inline]
    fn max_channel(&self) -> f32 {
        self.max_element()
    }
}
