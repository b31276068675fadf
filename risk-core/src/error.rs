use thiserror::Error;

/// Errors produced by the scoring and image-analysis core.
#[derive(Error, Debug)]
pub enum RiskError {
    /// The fitted artifacts are absent; the scoring path is degraded until
    /// the process is restarted with loadable artifacts.
    #[error("{0}")]
    ModelUnavailable(String),

    /// An artifact file could not be read or written.
    #[error("artifact io: {0}")]
    ArtifactIo(#[from] std::io::Error),

    /// An artifact file exists but does not parse as a fitted artifact.
    #[error("artifact format: {0}")]
    ArtifactFormat(#[from] serde_json::Error),

    /// Image decoding or inference failed. The analyzer converts this into
    /// an in-band error record instead of surfacing it to callers.
    #[error("image analysis failed: {0}")]
    ImageAnalysis(String),
}

pub type Result<T> = std::result::Result<T, RiskError>;
