// Embeddings module
// Text chunking and the remote embedding provider

pub mod chunking;
pub mod cohere;

pub use chunking::{Chunk, ChunkingConfig, chunk_document, split_text};
pub use cohere::CohereClient;

use crate::Result;

/// Turns text into vectors. Implementations must return exactly one vector
/// per input, in input order, or an error and no vectors at all.
pub trait Embedder: Send + Sync {
    /// Embed passages for storage in the index
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a question for searching the index
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}
