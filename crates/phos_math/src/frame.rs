use crate::Vec3;

/// Orthonormal shading frame.
///
/// BSDFs work in a local space where the shading normal is +Z; `to_local`
/// and `to_world` move directions in and out of that space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    pub t: Vec3,
    pub b: Vec3,
    pub n: Vec3,
}

impl Frame {
    /// Build a frame around a unit normal.
    ///
    /// Uses the branchless construction from Duff et al. 2017, which stays
    /// continuous everywhere except at `n.z == -1`.
    pub fn from_normal(n: Vec3) -> Self {
        let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
        let a = -1.0 / (sign + n.z);
        let b = n.x * n.y * a;

        let t = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
        let bt = Vec3::new(b, sign + n.y * n.y * a, -n.y);

        Self { t, b: bt, n }
    }

    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.t), v.dot(self.b), v.dot(self.n))
    }

    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.t * v.x + self.b * v.y + self.n * v.z
    }
}

/// Trigonometry of directions expressed in a [`Frame`]'s local space.
pub mod tangent {
    use crate::Vec3;

    #[inline]
    pub fn cos_theta(w: Vec3) -> f32 {
        w.z
    }

    #[inline]
    pub fn abs_cos_theta(w: Vec3) -> f32 {
        w.z.abs()
    }

    #[inline]
    pub fn sin2_theta(w: Vec3) -> f32 {
        (1.0 - w.z * w.z).max(0.0)
    }

    #[inline]
    pub fn sin_theta(w: Vec3) -> f32 {
        sin2_theta(w).sqrt()
    }

    #[inline]
    pub fn tan2_theta(w: Vec3) -> f32 {
        sin2_theta(w) / (w.z * w.z)
    }

    pub fn cos_phi(w: Vec3) -> f32 {
        let s = sin_theta(w);
        if s == 0.0 {
            1.0
        } else {
            (w.x / s).clamp(-1.0, 1.0)
        }
    }

    pub fn sin_phi(w: Vec3) -> f32 {
        let s = sin_theta(w);
        if s == 0.0 {
            0.0
        } else {
            (w.y / s).clamp(-1.0, 1.0)
        }
    }

    #[inline]
    pub fn same_hemisphere(a: Vec3, b: Vec3) -> bool {
        a.z * b.z > 0.0
    }

    /// Mirror `w` about the +Z axis.
    #[inline]
    pub fn reflect(w: Vec3) -> Vec3 {
        Vec3::new(-w.x, -w.y, w.z)
    }
}
