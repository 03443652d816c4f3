use phos_core::SceneError;
use thiserror::Error;

/// Errors that abort a render.
///
/// Numeric degeneracies (grazing rays, total internal reflection, zero
/// pdfs) are not errors; they contribute nothing and the path moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Tile needs {needed} path segments but capacity is {capacity}")]
    Capacity { needed: usize, capacity: usize },

    #[error("Tile arena exhausted (budget {budget} bytes)")]
    ArenaExhausted { budget: usize },

    #[error("BSDF has no sampling strategy")]
    UnsupportedSample,

    #[error("Scene has no geometry")]
    EmptyScene,

    #[error("Invalid render configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(String),

    #[error("Render cancelled")]
    Cancelled,

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;
