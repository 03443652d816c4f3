use thiserror::Error;

/// Errors raised while assembling a [`Scene`](crate::Scene).
///
/// These cover malformed geometry handed over by a loader or generator; once
/// a mesh has been accepted the renderer treats the scene as valid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Index count {0} is not a multiple of 3")]
    IndexCount(usize),

    #[error("Vertex index {index} out of range (mesh has {vertex_count} vertices)")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("Unknown material id {0}")]
    UnknownMaterial(u32),

    #[error("Normal count {normals} does not match vertex count {vertices}")]
    NormalCount { normals: usize, vertices: usize },

    #[error("Environment map {width}x{height} needs {} texels, got {texels}", width * height)]
    EnvironmentSize { width: u32, height: u32, texels: usize },
}

/// Result type for scene construction.
pub type SceneResult<T> = Result<T, SceneError>;
