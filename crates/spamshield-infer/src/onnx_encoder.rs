//! ONNX sentence encoder (e.g. an exported Qwen3-Embedding or MiniLM).
//!
//! Loads `model.onnx` and `tokenizer.json` from the embedding directory,
//! runs whole batches through the graph with right padding and pools token
//! states into L2-normalized sentence vectors. Requires the `onnx` feature.

#[cfg(feature = "onnx")]
mod inner {
    use std::path::Path;

    use ndarray::Array1;
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use spamshield_core::{EmbeddingSettings, Error, Pooling, Result};
    use tokenizers::Tokenizer;
    use tracing::{debug, info};

    use crate::encoder::EncoderBackend;

    pub struct OnnxEncoder {
        session: Mutex<Session>,
        tokenizer: Tokenizer,
        pad_id: u32,
        settings: EmbeddingSettings,
        dimension: usize,
        name: String,
    }

    impl OnnxEncoder {
        /// Load the model and tokenizer, then run one probe sentence to learn
        /// the output width.
        pub fn load(model_dir: &Path, settings: &EmbeddingSettings) -> Result<Self> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            if !model_path.exists() {
                return Err(Error::ModelLoad(format!(
                    "Embedding model not found: {}",
                    model_path.display()
                )));
            }
            if !tokenizer_path.exists() {
                return Err(Error::ModelLoad(format!(
                    "Tokenizer not found: {}",
                    tokenizer_path.display()
                )));
            }

            // With load-dynamic, ORT_DYLIB_PATH must point to libonnxruntime.
            ort::init().commit();

            let session = Session::builder()
                .map_err(|e| Error::ModelLoad(format!("Failed to create session builder: {}", e)))?
                .with_intra_threads(2)
                .map_err(|e| Error::ModelLoad(format!("Failed to set threads: {}", e)))?
                .commit_from_file(&model_path)
                .map_err(|e| Error::ModelLoad(format!("Failed to load ONNX model: {}", e)))?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| Error::ModelLoad(format!("Failed to load tokenizer: {}", e)))?;
            let pad_id = tokenizer
                .get_padding()
                .map(|p| p.pad_id)
                .unwrap_or(0);

            let mut encoder = Self {
                session: Mutex::new(session),
                tokenizer,
                pad_id,
                settings: settings.clone(),
                dimension: 0,
                name: model_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "onnx".to_string()),
            };

            let probe = encoder.run(&["probe"])?;
            encoder.dimension = probe.first().map(Array1::len).unwrap_or(0);
            if encoder.dimension == 0 {
                return Err(Error::ModelLoad("Embedding model produced no output".into()));
            }

            info!(
                "ONNX encoder loaded: dim={}, pooling={:?}, model={}",
                encoder.dimension,
                settings.pooling,
                model_path.display()
            );
            Ok(encoder)
        }

        fn run(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>> {
            let encodings = self
                .tokenizer
                .encode_batch(texts.to_vec(), true)
                .map_err(|e| Error::Inference(format!("Tokenization failed: {}", e)))?;

            let batch = encodings.len();
            let max_len = self.settings.max_seq_len.max(1);
            let seq_len = encodings
                .iter()
                .map(|e| e.get_ids().len().min(max_len))
                .max()
                .unwrap_or(0)
                .max(1);

            // Right-padded [batch, seq_len] inputs.
            let mut ids = vec![i64::from(self.pad_id); batch * seq_len];
            let mut mask = vec![0i64; batch * seq_len];
            for (row, encoding) in encodings.iter().enumerate() {
                let take = encoding.get_ids().len().min(seq_len);
                for i in 0..take {
                    ids[row * seq_len + i] = i64::from(encoding.get_ids()[i]);
                    mask[row * seq_len + i] = i64::from(encoding.get_attention_mask()[i]);
                }
            }

            debug!("Encoder forward pass: batch={}, seq_len={}", batch, seq_len);

            let ids_tensor = Tensor::from_array(([batch, seq_len], ids))
                .map_err(|e| Error::Inference(format!("Failed to create ids tensor: {}", e)))?;
            let mask_tensor = Tensor::from_array(([batch, seq_len], mask.clone()))
                .map_err(|e| Error::Inference(format!("Failed to create mask tensor: {}", e)))?;

            let mut session = self.session.lock();
            let outputs = if self.settings.token_type_ids {
                let type_ids = Tensor::from_array(([batch, seq_len], vec![0i64; batch * seq_len]))
                    .map_err(|e| {
                        Error::Inference(format!("Failed to create type_ids tensor: {}", e))
                    })?;
                session.run(ort::inputs![ids_tensor, mask_tensor, type_ids])
            } else {
                session.run(ort::inputs![ids_tensor, mask_tensor])
            }
            .map_err(|e| Error::Inference(format!("ONNX inference failed: {}", e)))?;

            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| Error::Inference(format!("Failed to extract output tensor: {}", e)))?;
            let dims: Vec<i64> = shape.iter().copied().collect();

            let vectors: Vec<Array1<f32>> = match dims.as_slice() {
                // Token states [batch, seq_len, dim] need pooling.
                &[b, s, d] if b as usize == batch && s as usize == seq_len => {
                    let d = d as usize;
                    (0..batch)
                        .map(|row| {
                            let row_mask = &mask[row * seq_len..(row + 1) * seq_len];
                            let states = &data[row * seq_len * d..(row + 1) * seq_len * d];
                            pool(states, row_mask, d, self.settings.pooling)
                        })
                        .collect()
                }
                // Already pooled [batch, dim].
                &[b, d] if b as usize == batch => {
                    let d = d as usize;
                    (0..batch)
                        .map(|row| Array1::from_vec(data[row * d..(row + 1) * d].to_vec()))
                        .collect()
                }
                other => {
                    return Err(Error::Inference(format!(
                        "Unexpected encoder output shape {:?}",
                        other
                    )))
                }
            };

            Ok(vectors.into_iter().map(l2_normalize).collect())
        }
    }

    /// Reduce `[seq_len, dim]` token states to one vector.
    fn pool(states: &[f32], mask: &[i64], dim: usize, pooling: Pooling) -> Array1<f32> {
        let mut pooled = Array1::zeros(dim);
        match pooling {
            Pooling::Mean => {
                let mut count = 0.0f32;
                for (i, &m) in mask.iter().enumerate() {
                    if m > 0 {
                        let offset = i * dim;
                        for d in 0..dim {
                            pooled[d] += states[offset + d];
                        }
                        count += 1.0;
                    }
                }
                if count > 0.0 {
                    pooled /= count;
                }
            }
            Pooling::LastToken => {
                if let Some(last) = mask.iter().rposition(|&m| m > 0) {
                    let offset = last * dim;
                    pooled.assign(&Array1::from_vec(states[offset..offset + dim].to_vec()));
                }
            }
        }
        pooled
    }

    fn l2_normalize(v: Array1<f32>) -> Array1<f32> {
        let norm = v.dot(&v).sqrt();
        if norm > 1e-12 {
            v / norm
        } else {
            v
        }
    }

    impl EncoderBackend for OnnxEncoder {
        fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            self.run(texts)
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_mean_pool_ignores_padding() {
            let states = [1.0, 2.0, 3.0, 4.0, 100.0, 100.0];
            let pooled = pool(&states, &[1, 1, 0], 2, Pooling::Mean);
            assert_eq!(pooled.to_vec(), vec![2.0, 3.0]);
        }

        #[test]
        fn test_last_token_pool() {
            let states = [1.0, 2.0, 3.0, 4.0, 100.0, 100.0];
            let pooled = pool(&states, &[1, 1, 0], 2, Pooling::LastToken);
            assert_eq!(pooled.to_vec(), vec![3.0, 4.0]);
        }

        #[test]
        fn test_normalize() {
            let v = l2_normalize(Array1::from_vec(vec![3.0, 4.0]));
            assert!((v[0] - 0.6).abs() < 1e-6);
            assert!((v[1] - 0.8).abs() < 1e-6);
            assert_eq!(l2_normalize(Array1::zeros(2)).to_vec(), vec![0.0, 0.0]);
        }
    }
}

#[cfg(feature = "onnx")]
pub use inner::OnnxEncoder;
