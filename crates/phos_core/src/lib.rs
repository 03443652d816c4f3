//! Phos Core - scene description for the phos path tracer.
//!
//! This crate provides:
//!
//! - **Geometry**: a scene-owned `GeometryPool` with `Mesh` handles into it
//! - **Materials**: parameter-only surface descriptions (`Material`)
//! - **Lights**: sphere and rectangle area emitters, plus a constant or
//!   lat-long environment
//! - **Shapes**: procedural quad, box and sphere generators
//!
//! # Example
//!
//! ```
//! use phos_core::{shapes, Light, Material, Scene};
//! use phos_math::{Color, Vec3};
//!
//! let mut scene = Scene::new("floor");
//! let grey = scene.add_material(Material::diffuse("grey", Color::splat(0.5)));
//! scene
//!     .add_mesh(shapes::quad(Vec3::new(-5.0, 0.0, 5.0), Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -10.0)), grey)
//!     .unwrap();
//! scene.add_light(Light::sphere(Vec3::new(0.0, 3.0, 0.0), 1.0, Color::splat(10.0)));
//! assert_eq!(scene.triangle_count(), 2);
//! ```

pub mod environment;
pub mod error;
pub mod light;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod shapes;

// Re-export commonly used types
pub use environment::{Environment, LatLongMap};
pub use error::{SceneError, SceneResult};
pub use light::{Light, LightSample, LightShape};
pub use material::{Material, MaterialId, MaterialKind};
pub use mesh::{GeometryPool, Mesh, MeshData, MeshId, TriangleRef};
pub use scene::Scene;
