//! Sentence encoder seam and the cached, batched `EmbeddingEncoder`.
//!
//! `EncoderBackend` is what a model runtime implements: one forward pass
//! over a batch of texts. `EmbeddingEncoder` sits in front of it, splitting
//! input into batches, deduplicating, serving repeats from the cache and
//! checking that the backend returned one vector of the right width per
//! text.

use std::collections::HashMap;
use std::sync::Arc;

use ndarray::Array1;
use spamshield_core::{Error, Result};
use tracing::debug;

use crate::cache::EmbeddingCache;

/// A sentence-embedding model.
pub trait EncoderBackend: Send + Sync {
    /// Encode one batch. Must return exactly one vector per input text, in
    /// input order.
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>>;

    /// Output vector width.
    fn dimension(&self) -> usize;

    /// Model name for logs and status output.
    fn name(&self) -> &str;
}

/// Order-preserving batched encoder with an embedding cache.
pub struct EmbeddingEncoder {
    backend: Arc<dyn EncoderBackend>,
    cache: EmbeddingCache,
    batch_size: usize,
}

impl EmbeddingEncoder {
    pub fn new(backend: Arc<dyn EncoderBackend>, batch_size: usize) -> Self {
        Self::with_cache(backend, batch_size, EmbeddingCache::default())
    }

    pub fn with_cache(
        backend: Arc<dyn EncoderBackend>,
        batch_size: usize,
        cache: EmbeddingCache,
    ) -> Self {
        Self {
            backend,
            cache,
            batch_size: batch_size.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.backend.dimension()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// Encode texts; vector `i` belongs to text `i`. An empty input never
    /// reaches the backend.
    pub fn encode<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Array1<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut resolved: HashMap<&str, Array1<f32>> = HashMap::new();
        let mut pending: Vec<&str> = Vec::new();
        for text in texts {
            let text = text.as_ref();
            if resolved.contains_key(text) || pending.contains(&text) {
                continue;
            }
            match self.cache.get(text) {
                Some(embedding) => {
                    resolved.insert(text, embedding);
                }
                None => pending.push(text),
            }
        }

        debug!(
            "Encoding {} texts: {} cached, {} to compute in batches of {}",
            texts.len(),
            resolved.len(),
            pending.len(),
            self.batch_size
        );

        let dim = self.backend.dimension();
        for chunk in pending.chunks(self.batch_size) {
            let vectors = self.backend.encode_batch(chunk)?;
            if vectors.len() != chunk.len() {
                return Err(Error::Inference(format!(
                    "Encoder '{}' returned {} vectors for {} texts",
                    self.backend.name(),
                    vectors.len(),
                    chunk.len()
                )));
            }
            for (text, vector) in chunk.iter().zip(vectors) {
                if vector.len() != dim {
                    return Err(Error::Inference(format!(
                        "Encoder '{}' returned a {}-dim vector, expected {}",
                        self.backend.name(),
                        vector.len(),
                        dim
                    )));
                }
                self.cache.put((*text).to_string(), vector.clone());
                resolved.insert(*text, vector);
            }
        }

        texts
            .iter()
            .map(|t| {
                resolved.get(t.as_ref()).cloned().ok_or_else(|| {
                    Error::Internal(format!("No embedding produced for '{}'", t.as_ref()))
                })
            })
            .collect()
    }
}
