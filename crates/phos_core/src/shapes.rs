//! Procedural mesh generators.
//!
//! All generators wind faces counter-clockwise around the returned normals.

use std::f32::consts::PI;

use phos_math::Vec3;

use crate::mesh::MeshData;

/// Parallelogram from `corner` spanned by `edge_u` and `edge_v`, facing
/// `edge_u x edge_v`.
pub fn quad(corner: Vec3, edge_u: Vec3, edge_v: Vec3) -> MeshData {
    let n = edge_u.cross(edge_v).normalize_or_zero();
    MeshData::new(
        vec![
            corner,
            corner + edge_u,
            corner + edge_u + edge_v,
            corner + edge_v,
        ],
        vec![0, 1, 2, 0, 2, 3],
    )
    .with_normals(vec![n; 4])
}

/// Axis-aligned box with outward-facing flat-shaded sides.
pub fn cuboid(min: Vec3, max: Vec3) -> MeshData {
    let d = max - min;
    let (dx, dy, dz) = (
        Vec3::new(d.x, 0.0, 0.0),
        Vec3::new(0.0, d.y, 0.0),
        Vec3::new(0.0, 0.0, d.z),
    );

    let sides = [
        quad(min, dz, dy),                                 // -X
        quad(Vec3::new(max.x, min.y, min.z), dy, dz),      // +X
        quad(min, dx, dz),                                 // -Y
        quad(Vec3::new(min.x, max.y, min.z), dz, dx),      // +Y
        quad(min, dy, dx),                                 // -Z
        quad(Vec3::new(min.x, min.y, max.z), dx, dy),      // +Z
    ];
    merge(&sides)
}

/// Latitude/longitude sphere with analytic normals.
///
/// `rings` counts latitude bands, `segments` longitude slices. Both are
/// clamped to a usable minimum.
pub fn uv_sphere(center: Vec3, radius: f32, segments: u32, rings: u32) -> MeshData {
    let segments = segments.max(3);
    let rings = rings.max(2);

    let mut positions = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
    let mut normals = Vec::with_capacity(positions.capacity());

    for i in 0..=rings {
        let v = i as f32 / rings as f32;
        let theta = v * PI;
        for j in 0..=segments {
            let u = j as f32 / segments as f32;
            let phi = u * 2.0 * PI;
            let n = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
            positions.push(center + n * radius);
            normals.push(n);
        }
    }

    let stride = segments + 1;
    let mut indices = Vec::with_capacity((rings * segments * 6) as usize);
    for i in 0..rings {
        for j in 0..segments {
            let v00 = i * stride + j;
            let v01 = v00 + 1;
            let v10 = v00 + stride;
            let v11 = v10 + 1;
            indices.extend_from_slice(&[v00, v01, v10, v01, v11, v10]);
        }
    }

    MeshData::new(positions, indices).with_normals(normals)
}

/// Concatenate mesh data, re-basing indices.
pub fn merge(parts: &[MeshData]) -> MeshData {
    let mut out = MeshData::default();
    let mut normals = Vec::new();
    let all_normals = parts.iter().all(|p| p.normals.is_some());

    for part in parts {
        let base = out.positions.len() as u32;
        out.positions.extend_from_slice(&part.positions);
        out.indices.extend(part.indices.iter().map(|i| i + base));
        if let (true, Some(n)) = (all_normals, &part.normals) {
            normals.extend_from_slice(n);
        }
    }

    if all_normals {
        out.normals = Some(normals);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_normal(data: &MeshData, f: usize) -> Vec3 {
        let [a, b, c] = [0, 1, 2].map(|k| data.positions[data.indices[f * 3 + k] as usize]);
        (b - a).cross(c - a)
    }

    #[test]
    fn test_quad_winding_matches_normal() {
        let q = quad(Vec3::ZERO, Vec3::X, Vec3::Z);
        assert!(q.validate().is_ok());
        assert_eq!(q.triangle_count(), 2);

        let n = q.normals.as_ref().unwrap()[0];
        assert!((n - -Vec3::Y).length() < 1e-6);
        for f in 0..2 {
            assert!(face_normal(&q, f).normalize().dot(n) > 0.999);
        }
    }

    #[test]
    fn test_cuboid_faces_point_outward() {
        let b = cuboid(Vec3::splat(-1.0), Vec3::new(1.0, 2.0, 3.0));
        assert!(b.validate().is_ok());
        assert_eq!(b.triangle_count(), 12);

        let center = Vec3::new(0.0, 0.5, 1.0);
        for f in 0..12 {
            let [i0, i1, i2] = [0, 1, 2].map(|k| b.indices[f * 3 + k] as usize);
            let centroid = (b.positions[i0] + b.positions[i1] + b.positions[i2]) / 3.0;
            assert!(face_normal(&b, f).dot(centroid - center) > 0.0, "face {f}");
        }
    }

    #[test]
    fn test_uv_sphere_faces_point_outward() {
        let s = uv_sphere(Vec3::new(1.0, 0.0, 0.0), 2.0, 16, 8);
        assert!(s.validate().is_ok());
        assert_eq!(s.triangle_count(), 16 * 8 * 2);

        for f in 0..s.triangle_count() {
            let n = face_normal(&s, f);
            if n.length() < 1e-6 {
                continue; // pole triangles are degenerate
            }
            let p = s.positions[s.indices[f * 3] as usize];
            assert!(n.dot(p - Vec3::new(1.0, 0.0, 0.0)) > 0.0, "face {f}");
        }
    }
}
