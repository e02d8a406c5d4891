//! Text embedding capability and its implementations.
//!
//! - `OnnxEmbeddingService` (feature `onnx`) loads a sentence-transformer
//!   ONNX model (all-MiniLM-L6-v2) via ort and tokenizes with the
//!   HuggingFace tokenizers crate. This is the production text embedder.
//! - `MockEmbedding` provides deterministic hash-based vectors for testing.
//! - `KeyedEmbedding` returns preset vectors for known texts, so tests can
//!   pin exact similarities between reports.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use respond_core::error::RespondError;

/// Service for generating text embeddings.
///
/// Implementations convert text into fixed-dimensional vectors that capture
/// semantic meaning. Blank input is rejected with a validation error.
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, RespondError>> + Send;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// A blanket implementation is provided so that every `EmbeddingService`
/// automatically implements `DynEmbeddingService`, which lets the engines
/// hold an `Arc<dyn DynEmbeddingService>` without generics.
pub trait DynEmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text (boxed future).
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, RespondError>> + Send + 'a>>;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, RespondError>> + Send + 'a>> {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }
}

fn reject_blank(text: &str) -> Result<(), RespondError> {
    if text.trim().is_empty() {
        return Err(RespondError::Validation(
            "Text cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn l2_normalize(values: &mut [f32]) {
    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in values {
            *val /= norm;
        }
    }
}

// ---------------------------------------------------------------------------
// OnnxEmbeddingService - real ONNX Runtime inference
// ---------------------------------------------------------------------------

#[cfg(feature = "onnx")]
mod onnx {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use ort::session::Session;
    use ort::value::TensorRef;
    use tokenizers::Tokenizer;
    use tracing::info;

    use respond_core::error::RespondError;

    use super::{l2_normalize, reject_blank, EmbeddingService};

    fn dependency(context: &str, err: impl std::fmt::Display) -> RespondError {
        RespondError::Dependency(format!("{}: {}", context, err))
    }

    /// ONNX Runtime-backed text embedder using a sentence-transformer model.
    ///
    /// Expects a model directory containing `model.onnx` and
    /// `tokenizer.json`. Mean pooling (masked) and L2 normalization are
    /// applied to produce a single unit vector per input.
    pub struct OnnxEmbeddingService {
        session: Arc<Mutex<Session>>,
        tokenizer: Arc<Tokenizer>,
        dimensions: usize,
    }

    impl std::fmt::Debug for OnnxEmbeddingService {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("OnnxEmbeddingService")
                .field("dimensions", &self.dimensions)
                .finish()
        }
    }

    impl OnnxEmbeddingService {
        /// Load a sentence-transformer model from the given directory.
        pub fn from_directory(model_dir: &Path) -> Result<Self, RespondError> {
            Self::from_files(
                &model_dir.join("model.onnx"),
                &model_dir.join("tokenizer.json"),
            )
        }

        /// Load from explicit model and tokenizer file paths.
        pub fn from_files(model_path: &Path, tokenizer_path: &Path) -> Result<Self, RespondError> {
            if !model_path.exists() {
                return Err(RespondError::Config(format!(
                    "ONNX model not found at {}",
                    model_path.display()
                )));
            }
            if !tokenizer_path.exists() {
                return Err(RespondError::Config(format!(
                    "Tokenizer not found at {}",
                    tokenizer_path.display()
                )));
            }

            let session = Session::builder()
                .map_err(|e| dependency("ONNX session builder", e))?
                .with_intra_threads(1)
                .map_err(|e| dependency("ONNX set threads", e))?
                .commit_from_file(model_path)
                .map_err(|e| dependency("ONNX load model", e))?;

            // Sentence-transformer output is [batch, seq_len, hidden_dim].
            let dimensions = session
                .outputs()
                .first()
                .and_then(|out| out.dtype().tensor_shape())
                .and_then(|shape| shape.last().copied())
                .map(|d| if d > 0 { d as usize } else { 384 })
                .unwrap_or(384);

            let tokenizer = Tokenizer::from_file(tokenizer_path)
                .map_err(|e| dependency("Failed to load tokenizer", e))?;

            info!(
                model = %model_path.display(),
                dimensions,
                "Loaded ONNX embedding model"
            );

            Ok(Self {
                session: Arc::new(Mutex::new(session)),
                tokenizer: Arc::new(tokenizer),
                dimensions,
            })
        }

        /// Tokenize, run inference, and mean-pool the output.
        fn embed_sync(&self, text: &str) -> Result<Vec<f32>, RespondError> {
            reject_blank(text)?;

            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| dependency("Tokenization failed", e))?;

            let to_i64 = |xs: &[u32]| xs.iter().map(|&x| x as i64).collect::<Vec<i64>>();
            let input_ids = to_i64(encoding.get_ids());
            let attention_mask = to_i64(encoding.get_attention_mask());
            let token_type_ids = to_i64(encoding.get_type_ids());
            let seq_len = input_ids.len();

            let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), input_ids)
                .map_err(|e| dependency("input_ids array", e))?;
            let mask_array = ndarray::Array2::from_shape_vec((1, seq_len), attention_mask.clone())
                .map_err(|e| dependency("attention_mask array", e))?;
            let type_array = ndarray::Array2::from_shape_vec((1, seq_len), token_type_ids)
                .map_err(|e| dependency("token_type_ids array", e))?;

            let ids_ref = TensorRef::from_array_view(&ids_array)
                .map_err(|e| dependency("TensorRef input_ids", e))?;
            let mask_ref = TensorRef::from_array_view(&mask_array)
                .map_err(|e| dependency("TensorRef attention_mask", e))?;
            let type_ref = TensorRef::from_array_view(&type_array)
                .map_err(|e| dependency("TensorRef token_type_ids", e))?;

            let mut session = self
                .session
                .lock()
                .map_err(|e| dependency("Session lock poisoned", e))?;
            let outputs = session
                .run(ort::inputs![ids_ref, mask_ref, type_ref])
                .map_err(|e| dependency("ONNX inference failed", e))?;

            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| dependency("Extract embeddings", e))?;

            let hidden_dim = match shape.iter().copied().collect::<Vec<i64>>().as_slice() {
                [_, .., last] => *last as usize,
                other => {
                    return Err(RespondError::Dependency(format!(
                        "Unexpected output shape: {:?}",
                        other
                    )))
                }
            };

            let mut pooled = vec![0.0f32; hidden_dim];
            let mut count = 0.0f32;
            for (tok_idx, &mask_val) in attention_mask.iter().enumerate() {
                if mask_val > 0 {
                    let offset = tok_idx * hidden_dim;
                    for (dim, slot) in pooled.iter_mut().enumerate() {
                        *slot += data[offset + dim];
                    }
                    count += 1.0;
                }
            }
            if count > 0.0 {
                for val in &mut pooled {
                    *val /= count;
                }
            }

            l2_normalize(&mut pooled);
            Ok(pooled)
        }
    }

    impl EmbeddingService for OnnxEmbeddingService {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, RespondError> {
            // Inference is CPU-bound; run on a blocking thread.
            let svc = OnnxEmbeddingService {
                session: Arc::clone(&self.session),
                tokenizer: Arc::clone(&self.tokenizer),
                dimensions: self.dimensions,
            };
            let text_owned = text.to_string();

            tokio::task::spawn_blocking(move || svc.embed_sync(&text_owned))
                .await
                .map_err(|e| dependency("Embedding task panicked", e))?
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxEmbeddingService;

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic hash-based vectors for testing
// ---------------------------------------------------------------------------

/// Mock embedding service that returns deterministic unit vectors.
///
/// The output is derived from a hash of the input text, so identical inputs
/// always produce identical outputs while unrelated texts are close to
/// orthogonal.
#[derive(Debug, Clone)]
pub struct MockEmbedding {
    dimensions: usize,
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self::with_dimensions(384)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut result = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }
        l2_normalize(&mut result);
        result
    }
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RespondError> {
        reject_blank(text)?;
        Ok(self.hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// KeyedEmbedding - preset vectors for exact similarities
// ---------------------------------------------------------------------------

/// Embedding service returning preset vectors for registered texts and
/// hash-based vectors for everything else.
#[derive(Debug, Clone)]
pub struct KeyedEmbedding {
    vectors: HashMap<String, Vec<f32>>,
    fallback: MockEmbedding,
}

impl KeyedEmbedding {
    pub fn new(dimensions: usize) -> Self {
        Self {
            vectors: HashMap::new(),
            fallback: MockEmbedding::with_dimensions(dimensions),
        }
    }

    /// Register the vector returned for `text`.
    ///
    /// Panics if the vector length differs from the service dimensions.
    pub fn with(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        assert_eq!(
            vector.len(),
            self.fallback.dimensions,
            "preset vector has the wrong dimensions"
        );
        self.vectors.insert(text.into(), vector);
        self
    }

    /// A unit vector whose cosine similarity to the first basis vector is
    /// `similarity`; the remainder is placed on basis `axis` (must be > 0).
    pub fn vector_with_similarity(dimensions: usize, similarity: f32, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; dimensions];
        v[0] = similarity;
        v[axis] = (1.0 - similarity * similarity).max(0.0).sqrt();
        v
    }

    /// The first basis vector, the anchor for [`Self::vector_with_similarity`].
    pub fn anchor(dimensions: usize) -> Vec<f32> {
        Self::vector_with_similarity(dimensions, 1.0, 1)
    }
}

impl EmbeddingService for KeyedEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RespondError> {
        reject_blank(text)?;
        match self.vectors.get(text) {
            Some(v) => Ok(v.clone()),
            None => Ok(self.fallback.hash_to_vector(text)),
        }
    }

    fn dimensions(&self) -> usize {
        self.fallback.dimensions
    }
}
