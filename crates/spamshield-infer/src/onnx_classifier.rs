//! ONNX classifier artifacts (e.g. exported with skl2onnx).
//!
//! The graph takes one float input `[n, d]`; its first output is the int64
//! label tensor. Requires the `onnx` feature.

#[cfg(feature = "onnx")]
mod inner {
    use std::path::Path;

    use ndarray::ArrayView2;
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use spamshield_core::{Error, Result};
    use tracing::info;

    use crate::classifier::Classifier;

    pub struct OnnxClassifier {
        session: Mutex<Session>,
        name: String,
    }

    impl OnnxClassifier {
        pub fn load(path: &Path) -> Result<Self> {
            ort::init().commit();

            let session = Session::builder()
                .map_err(|e| Error::ModelLoad(format!("Failed to create session builder: {}", e)))?
                .with_intra_threads(2)
                .map_err(|e| Error::ModelLoad(format!("Failed to set threads: {}", e)))?
                .commit_from_file(path)
                .map_err(|e| Error::ModelLoad(format!("Failed to load {}: {}", path.display(), e)))?;

            info!("ONNX classifier loaded: {}", path.display());

            Ok(Self {
                session: Mutex::new(session),
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            })
        }
    }

    impl Classifier for OnnxClassifier {
        fn predict(&self, rows: ArrayView2<'_, f32>) -> Result<Vec<i64>> {
            let (n, d) = rows.dim();
            if n == 0 {
                return Ok(Vec::new());
            }
            let data: Vec<f32> = rows.iter().copied().collect();
            let input = Tensor::from_array(([n, d], data))
                .map_err(|e| Error::Inference(format!("Failed to create input tensor: {}", e)))?;

            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![input])
                .map_err(|e| Error::Inference(format!("ONNX inference failed: {}", e)))?;

            let (_, labels) = outputs[0].try_extract_tensor::<i64>().map_err(|e| {
                Error::ModelMismatch(format!("First output is not an int64 label tensor: {}", e))
            })?;

            if labels.len() != n {
                return Err(Error::ModelMismatch(format!(
                    "Classifier returned {} labels for {} rows",
                    labels.len(),
                    n
                )));
            }
            Ok(labels.to_vec())
        }

        fn classes(&self) -> Option<&[i64]> {
            None
        }

        fn n_features(&self) -> Option<usize> {
            None
        }

        fn describe(&self) -> String {
            format!("onnx({})", self.name)
        }
    }
}

#[cfg(feature = "onnx")]
pub use inner::OnnxClassifier;
