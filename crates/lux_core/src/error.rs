//! Errors raised while assembling a scene.

use thiserror::Error;

use crate::world::MeshId;

/// Scene construction errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Transform for mesh '{0}' is singular or not finite")]
    SingularTransform(String),

    #[error("Mesh '{mesh}': {attribute} has {found} entries, expected {expected}")]
    MismatchedAttribute {
        mesh: String,
        attribute: &'static str,
        found: usize,
        expected: usize,
    },

    #[error("Mesh '{mesh}': index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        mesh: String,
        index: u32,
        vertex_count: usize,
    },

    #[error("Mesh '{mesh}': index count {count} is not a multiple of 3")]
    IncompleteTriangle { mesh: String, count: usize },

    #[error("Unknown mesh handle {0:?}")]
    UnknownMesh(MeshId),
}

/// Output format errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("Resolution {width}x{height} has a zero dimension")]
    ZeroResolution { width: u32, height: u32 },

    #[error("Pixel aspect {x}:{y} must be positive and finite")]
    InvalidAspect { x: f32, y: f32 },
}
