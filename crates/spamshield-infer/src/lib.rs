//! SpamShield Infer: sentence encoder, embedding cache and the two trained
//! classifiers.
//!
//! `EncoderBackend` abstracts the sentence-embedding model; with the `onnx`
//! feature `OnnxEncoder` runs an exported model through ONNX Runtime.
//! `Classifier` abstracts the fitted models behind `SpamCodeClassifier` and
//! `SpamTypeClassifier`. A missing or unloadable model is always an error:
//! there is no degraded mode.

pub mod cache;
pub mod classifier;
pub mod encoder;
pub mod onnx_classifier;
pub mod onnx_encoder;
pub mod spam_code;
pub mod spam_type;

pub use cache::EmbeddingCache;
pub use classifier::{load_classifier, Classifier, LinearModel};
pub use encoder::{EmbeddingEncoder, EncoderBackend};
pub use spam_code::{final_flag, SpamCodeClassifier, SpamCodeDecision};
pub use spam_type::{tag_for_code, SpamTypeClassifier};

#[cfg(feature = "onnx")]
pub use onnx_classifier::OnnxClassifier;
#[cfg(feature = "onnx")]
pub use onnx_encoder::OnnxEncoder;

use std::path::Path;
use std::sync::Arc;

use spamshield_core::{EmbeddingSettings, Result};

/// Load the sentence encoder from the embedding directory.
pub fn create_encoder(
    model_dir: &Path,
    settings: &EmbeddingSettings,
) -> Result<Arc<dyn EncoderBackend>> {
    #[cfg(feature = "onnx")]
    {
        let encoder = OnnxEncoder::load(model_dir, settings)?;
        tracing::info!("Using ONNX encoder (dim={})", encoder.dimension());
        Ok(Arc::new(encoder))
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = settings;
        Err(spamshield_core::Error::ModelLoad(format!(
            "Cannot load embedding model from {}: built without the `onnx` feature",
            model_dir.display()
        )))
    }
}
