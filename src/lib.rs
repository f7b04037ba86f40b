use thiserror::Error;

pub type Result<T, E = QaError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum QaError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Could not decode {filename} as UTF-8 text: {message}")]
    Decode { filename: String, message: String },

    #[error("Failed to extract text from {filename}: {message}")]
    Extraction { filename: String, message: String },

    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Chat model did not respond within {0} seconds")]
    SynthesisTimeout(u64),

    #[error("Chat model error: {0}")]
    Synthesis(String),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl QaError {
    /// Whether the failure came from a remote collaborator and the same
    /// action may succeed if the user tries again.
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingService(_)
                | Self::IndexUnavailable(_)
                | Self::SynthesisTimeout(_)
                | Self::Synthesis(_)
        )
    }
}

pub mod answer;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod events;
pub mod extract;
pub mod index;
pub mod pipeline;
pub mod session;
