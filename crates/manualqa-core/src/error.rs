use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("Vector index failed: {0}")]
    VectorIndex(#[source] anyhow::Error),

    #[error("Answer generation failed: {0}")]
    Generation(#[source] anyhow::Error),
}

impl Error {
    /// True when the error came from an external collaborator rather than
    /// from this crate's own validation.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(self, Self::Embedding(_) | Self::VectorIndex(_) | Self::Generation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
