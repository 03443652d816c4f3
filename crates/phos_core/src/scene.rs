//! In-memory scene consumed by the renderer.
//!
//! The scene owns every piece of geometry through its [`GeometryPool`], so
//! independent scenes (for example one per test) never share state.

use phos_math::Aabb;

use crate::environment::Environment;
use crate::error::{SceneError, SceneResult};
use crate::light::Light;
use crate::material::{Material, MaterialId};
use crate::mesh::{GeometryPool, Mesh, MeshData, MeshId, TriangleRef};

#[derive(Clone, Debug, Default)]
pub struct Scene {
    /// Scene name
    pub name: String,

    pub pool: GeometryPool,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub lights: Vec<Light>,

    /// Radiance seen by rays that leave the scene.
    pub environment: Option<Environment>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a material to the scene and return its ID.
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(material);
        id
    }

    /// Get a material by ID.
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.index())
    }

    /// Validate `data`, move it into the geometry pool and return the new
    /// mesh's ID. Missing normals are computed here.
    pub fn add_mesh(&mut self, data: MeshData, material: MaterialId) -> SceneResult<MeshId> {
        if material.index() >= self.materials.len() {
            return Err(SceneError::UnknownMaterial(material.0));
        }
        data.validate()?;

        let bounds = data
            .positions
            .iter()
            .fold(Aabb::EMPTY, |b, p| b.merge_point(*p));
        let id = MeshId(self.meshes.len() as u32);
        let (vertices, faces) = self.pool.append(data);

        log::debug!(
            "Mesh {} added: {} vertices, {} triangles",
            id.0,
            vertices.len(),
            faces.len()
        );

        self.meshes.push(Mesh {
            id,
            vertices,
            faces,
            material,
            bounds,
        });
        Ok(id)
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    /// Set the environment; a plain color gives a constant one.
    pub fn with_environment(mut self, environment: impl Into<Environment>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn mesh(&self, id: MeshId) -> &Mesh {
        &self.meshes[id.0 as usize]
    }

    /// Material of the mesh that owns `tri`.
    pub fn material_of(&self, tri: TriangleRef) -> MaterialId {
        self.mesh(tri.mesh).material
    }

    /// Every triangle of every mesh, in pool order.
    pub fn triangles(&self) -> Vec<TriangleRef> {
        self.meshes.iter().flat_map(|m| m.triangles()).collect()
    }

    /// Get total triangle count across all meshes.
    pub fn triangle_count(&self) -> usize {
        self.pool.faces.len()
    }

    /// Bounding box of all mesh geometry.
    pub fn bounds(&self) -> Aabb {
        self.meshes
            .iter()
            .fold(Aabb::EMPTY, |b, m| b.merge(&m.bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes;
    use phos_math::{Color, Vec3};

    #[test]
    fn test_scene_creation() {
        let mut scene = Scene::new("test");
        let grey = scene.add_material(Material::default());

        let a = scene
            .add_mesh(shapes::quad(Vec3::ZERO, Vec3::X, Vec3::Z), grey)
            .unwrap();
        let b = scene
            .add_mesh(shapes::cuboid(Vec3::splat(2.0), Vec3::splat(3.0)), grey)
            .unwrap();

        assert_eq!(a, MeshId(0));
        assert_eq!(b, MeshId(1));
        assert_eq!(scene.triangle_count(), 14);
        assert_eq!(scene.triangles().len(), 14);
        assert_eq!(scene.mesh(b).faces, 2..14);
        assert_eq!(scene.bounds().max, Vec3::splat(3.0));
    }

    #[test]
    fn test_unknown_material_is_rejected() {
        let mut scene = Scene::new("test");
        let err = scene
            .add_mesh(shapes::quad(Vec3::ZERO, Vec3::X, Vec3::Z), MaterialId(3))
            .unwrap_err();

        assert_eq!(err, SceneError::UnknownMaterial(3));
        assert!(scene.meshes.is_empty());
        assert!(scene.pool.positions.is_empty());
    }

    #[test]
    fn test_triangles_resolve_to_owner_material() {
        let mut scene = Scene::new("test");
        let red = scene.add_material(Material::diffuse("red", Color::X));
        let green = scene.add_material(Material::diffuse("green", Color::Y));
        scene
            .add_mesh(shapes::quad(Vec3::ZERO, Vec3::X, Vec3::Z), red)
            .unwrap();
        scene
            .add_mesh(shapes::quad(Vec3::Y, Vec3::X, Vec3::Z), green)
            .unwrap();

        let tris = scene.triangles();
        assert_eq!(scene.material_of(tris[1]), red);
        assert_eq!(scene.material_of(tris[2]), green);
    }
}
