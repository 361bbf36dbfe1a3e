use lux_core::{FormatError, SceneError};
use thiserror::Error;

/// Reasons a render cannot start or did not finish.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid image format: {0}")]
    Format(#[from] FormatError),

    #[error("invalid render config: {0}")]
    InvalidConfig(&'static str),

    #[error("emissive triangle list is stale; call World::prepare_direct_light_sampling before rendering")]
    StaleLightList,

    #[error("failed to parse render config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to build render thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("render cancelled")]
    Cancelled,

    #[error(transparent)]
    Scene(#[from] SceneError),
}

pub type RenderResult<T> = Result<T, RenderError>;
