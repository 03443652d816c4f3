//! Triangle meshes.
//!
//! Geometry is not stored per mesh. [`MeshData`] is what a loader or shape
//! generator hands over; [`Scene::add_mesh`](crate::Scene::add_mesh) appends
//! it to the scene's [`GeometryPool`] and keeps only a [`Mesh`] handle with
//! ranges into the pool.

use std::ops::Range;

use phos_math::{Aabb, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{SceneError, SceneResult};
use crate::material::MaterialId;

/// Identifies a mesh within its scene.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshId(pub u32);

/// Owned triangle soup as produced by a loader or generator.
///
/// Faces wind counter-clockwise when viewed from the side the geometric
/// normal points to.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional - computed on insertion if missing)
    pub normals: Option<Vec<Vec3>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            ..Default::default()
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check index/attribute consistency.
    pub fn validate(&self) -> SceneResult<()> {
        let vertices = self.positions.len();
        if self.indices.len() % 3 != 0 {
            return Err(SceneError::IndexCount(self.indices.len()));
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertices) {
            return Err(SceneError::IndexOutOfRange {
                index,
                vertex_count: vertices,
            });
        }
        if let Some(normals) = &self.normals {
            if normals.len() != vertices {
                return Err(SceneError::NormalCount {
                    normals: normals.len(),
                    vertices,
                });
            }
        }
        Ok(())
    }
}

/// Scene-owned vertex and face storage shared by every mesh.
///
/// Append-only: meshes refer to it through ranges, and faces store absolute
/// vertex indices so a face can be resolved without knowing its mesh.
#[derive(Clone, Debug, Default)]
pub struct GeometryPool {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub faces: Vec<[u32; 3]>,
}

impl GeometryPool {
    /// Append validated mesh data, returning the vertex and face ranges.
    pub(crate) fn append(&mut self, data: MeshData) -> (Range<u32>, Range<u32>) {
        let v_start = self.positions.len() as u32;
        let f_start = self.faces.len() as u32;
        let vertex_count = data.positions.len();

        self.positions.extend_from_slice(&data.positions);
        self.faces.extend(
            data.indices
                .chunks_exact(3)
                .map(|f| [f[0] + v_start, f[1] + v_start, f[2] + v_start]),
        );

        let vertices = v_start..self.positions.len() as u32;
        let faces = f_start..self.faces.len() as u32;

        match data.normals {
            Some(normals) => self.normals.extend(normals.into_iter().map(|n| n.normalize_or_zero())),
            None => {
                self.normals.extend(std::iter::repeat(Vec3::ZERO).take(vertex_count));
                self.compute_normals(vertices.clone(), faces.clone());
            }
        }

        (vertices, faces)
    }

    /// Compute smooth vertex normals by averaging face normals.
    ///
    /// Each vertex normal in `vertices` becomes the normalized sum of the
    /// (area-weighted) normals of the faces in `faces` that use it. Vertices
    /// touched only by degenerate faces fall back to +Y.
    pub fn compute_normals(&mut self, vertices: Range<u32>, faces: Range<u32>) {
        for n in &mut self.normals[vertices.start as usize..vertices.end as usize] {
            *n = Vec3::ZERO;
        }

        for face in &self.faces[faces.start as usize..faces.end as usize] {
            let [i0, i1, i2] = face.map(|i| i as usize);
            let p0 = self.positions[i0];
            let face_normal = (self.positions[i1] - p0).cross(self.positions[i2] - p0);

            self.normals[i0] += face_normal;
            self.normals[i1] += face_normal;
            self.normals[i2] += face_normal;
        }

        let mut degenerate = 0usize;
        for normal in &mut self.normals[vertices.start as usize..vertices.end as usize] {
            let len = normal.length();
            if len > 0.0 {
                *normal /= len;
            } else {
                *normal = Vec3::Y;
                degenerate += 1;
            }
        }
        if degenerate > 0 {
            log::warn!("{} vertices have no usable face normal, defaulting to +Y", degenerate);
        }
    }

    /// Corner positions of a face.
    #[inline]
    pub fn triangle(&self, face: u32) -> [Vec3; 3] {
        self.faces[face as usize].map(|i| self.positions[i as usize])
    }

    /// Shading normal at barycentric `(b1, b2)` inside `face`.
    pub fn shading_normal(&self, face: u32, b1: f32, b2: f32) -> Vec3 {
        let [n0, n1, n2] = self.faces[face as usize].map(|i| self.normals[i as usize]);
        (n0 * (1.0 - b1 - b2) + n1 * b1 + n2 * b2).normalize_or_zero()
    }
}

/// A mesh handle: ranges into the scene's [`GeometryPool`] plus a material.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub id: MeshId,
    pub vertices: Range<u32>,
    pub faces: Range<u32>,
    pub material: MaterialId,
    pub bounds: Aabb,
}

impl Mesh {
    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// One [`TriangleRef`] per face.
    pub fn triangles(&self) -> impl Iterator<Item = TriangleRef> + '_ {
        self.faces.clone().map(move |face| TriangleRef {
            mesh: self.id,
            face,
        })
    }
}

/// Lightweight triangle descriptor consumed by the BVH builder.
///
/// `face` indexes the scene's [`GeometryPool::faces`] directly.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TriangleRef {
    pub mesh: MeshId,
    pub face: u32,
}
