//! RESPOND vector crate - embedding services, similarity, and the vector store contract.
//!
//! Provides the text embedding capability trait with mock and keyed
//! implementations for testing (plus an ONNX backend behind the `onnx`
//! feature), cosine similarity, Qdrant-style payload filters, and the
//! `VectorStore` trait with a brute-force in-memory implementation.

pub mod embedding;
pub mod filter;
pub mod similarity;
pub mod store;

pub use embedding::{DynEmbeddingService, EmbeddingService, KeyedEmbedding, MockEmbedding};
pub use filter::{Condition, Filter};
pub use similarity::cosine_similarity;
pub use store::{InMemoryVectorStore, Record, ScoredPoint, VectorStore};

#[cfg(feature = "onnx")]
pub use embedding::OnnxEmbeddingService;
