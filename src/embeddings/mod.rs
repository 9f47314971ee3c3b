// Embeddings module
// Query embedding through Ollama, behind a trait so the retriever can run against test doubles

pub mod ollama;

pub use ollama::OllamaClient;

use anyhow::Result;

/// Turns text into a fixed-length vector.
///
/// Queries must be embedded with the same model that produced the index
/// vectors; nothing here can detect a model mismatch beyond the vector length.
pub trait Embedder: Send + Sync {
    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
