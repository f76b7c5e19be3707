//! Trained classifier seam and the native linear model.
//!
//! Artifacts are chosen by file extension: `.json` is a linear model
//! exported from scikit-learn (`LogisticRegression`, optionally preceded by
//! a `StandardScaler`), `.onnx` needs the `onnx` feature.

use std::path::Path;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::Deserialize;
use spamshield_core::{Error, Result};
use tracing::info;

/// A fitted classifier producing one integer class label per row.
pub trait Classifier: Send + Sync {
    fn predict(&self, rows: ArrayView2<'_, f32>) -> Result<Vec<i64>>;

    /// Class labels the model can emit, when the artifact records them.
    fn classes(&self) -> Option<&[i64]>;

    /// Expected input width, when the artifact records it.
    fn n_features(&self) -> Option<usize>;

    fn describe(&self) -> String;
}

#[derive(Debug, Deserialize)]
struct ScalerArtifact {
    mean: Vec<f32>,
    scale: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct LinearArtifact {
    classes: Vec<i64>,
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
    #[serde(default)]
    scaler: Option<ScalerArtifact>,
}

/// Linear decision function `coef · x + intercept` over optionally
/// standardized input.
///
/// One coefficient row is a binary model: a positive score selects
/// `classes[1]`. `k` rows score `k` classes and the highest wins.
#[derive(Debug, Clone)]
pub struct LinearModel {
    classes: Vec<i64>,
    coef: Array2<f32>,
    intercept: Array1<f32>,
    mean: Option<Array1<f32>>,
    scale: Option<Array1<f32>>,
}

impl LinearModel {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let artifact: LinearArtifact = serde_json::from_str(json)
            .map_err(|e| Error::ModelLoad(format!("Invalid linear model artifact: {}", e)))?;
        Self::from_artifact(artifact)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::ModelLoad(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    fn from_artifact(artifact: LinearArtifact) -> Result<Self> {
        let rows = artifact.coef.len();
        let width = artifact.coef.first().map(Vec::len).unwrap_or(0);
        if rows == 0 || width == 0 {
            return Err(Error::ModelLoad("Linear model has no coefficients".into()));
        }
        if artifact.coef.iter().any(|r| r.len() != width) {
            return Err(Error::ModelLoad("Ragged coefficient matrix".into()));
        }
        if artifact.intercept.len() != rows {
            return Err(Error::ModelLoad(format!(
                "{} intercepts for {} coefficient rows",
                artifact.intercept.len(),
                rows
            )));
        }
        let expected_classes = if rows == 1 { 2 } else { rows };
        if artifact.classes.len() != expected_classes {
            return Err(Error::ModelLoad(format!(
                "{} classes for {} coefficient rows",
                artifact.classes.len(),
                rows
            )));
        }

        let (mean, scale) = match artifact.scaler {
            Some(scaler) => {
                if scaler.mean.len() != width || scaler.scale.len() != width {
                    return Err(Error::ModelLoad(format!(
                        "Scaler width does not match {} features",
                        width
                    )));
                }
                // Zero-variance columns are left unscaled.
                let scale = scaler
                    .scale
                    .into_iter()
                    .map(|s| if s == 0.0 { 1.0 } else { s })
                    .collect::<Vec<_>>();
                (Some(Array1::from_vec(scaler.mean)), Some(Array1::from_vec(scale)))
            }
            None => (None, None),
        };

        let flat: Vec<f32> = artifact.coef.into_iter().flatten().collect();
        let coef = Array2::from_shape_vec((rows, width), flat)
            .map_err(|e| Error::ModelLoad(format!("Bad coefficient shape: {}", e)))?;

        Ok(Self {
            classes: artifact.classes,
            coef,
            intercept: Array1::from_vec(artifact.intercept),
            mean,
            scale,
        })
    }

    /// Raw decision scores, one row per input row.
    pub fn decision_function(&self, rows: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        let width = self.coef.ncols();
        if rows.ncols() != width {
            return Err(Error::ModelMismatch(format!(
                "Model expects {} features, got {}",
                width,
                rows.ncols()
            )));
        }

        let mut x = rows.to_owned();
        if let (Some(mean), Some(scale)) = (&self.mean, &self.scale) {
            x -= mean;
            x /= scale;
        }
        Ok(x.dot(&self.coef.t()) + &self.intercept)
    }
}

impl Classifier for LinearModel {
    fn predict(&self, rows: ArrayView2<'_, f32>) -> Result<Vec<i64>> {
        let scores = self.decision_function(rows)?;
        let labels = if self.coef.nrows() == 1 {
            scores
                .column(0)
                .iter()
                .map(|&s| if s > 0.0 { self.classes[1] } else { self.classes[0] })
                .collect()
        } else {
            scores
                .axis_iter(Axis(0))
                .map(|row| {
                    let mut best = 0;
                    for (i, &s) in row.iter().enumerate() {
                        if s > row[best] {
                            best = i;
                        }
                    }
                    self.classes[best]
                })
                .collect()
        };
        Ok(labels)
    }

    fn classes(&self) -> Option<&[i64]> {
        Some(&self.classes)
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.coef.ncols())
    }

    fn describe(&self) -> String {
        format!(
            "linear(classes={:?}, features={}, scaled={})",
            self.classes,
            self.coef.ncols(),
            self.mean.is_some()
        )
    }
}

/// Load a classifier artifact, dispatching on file extension.
pub fn load_classifier(path: &Path) -> Result<Box<dyn Classifier>> {
    if !path.exists() {
        return Err(Error::ModelLoad(format!(
            "Model artifact not found: {}",
            path.display()
        )));
    }

    let model: Box<dyn Classifier> = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Box::new(LinearModel::load(path)?),
        #[cfg(feature = "onnx")]
        Some("onnx") => Box::new(crate::onnx_classifier::OnnxClassifier::load(path)?),
        #[cfg(not(feature = "onnx"))]
        Some("onnx") => {
            return Err(Error::ModelLoad(format!(
                "{} needs the `onnx` feature",
                path.display()
            )))
        }
        _ => {
            return Err(Error::ModelLoad(format!(
                "Unsupported model artifact: {}",
                path.display()
            )))
        }
    };

    info!("Loaded {} from {}", model.describe(), path.display());
    Ok(model)
}

/// Stack equal-width rows into a matrix.
pub fn stack_rows(rows: &[Vec<f32>]) -> Result<Array2<f32>> {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if rows.iter().any(|r| r.len() != width) {
        return Err(Error::Inference("Input rows have different widths".into()));
    }
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), width), flat)
        .map_err(|e| Error::Inference(format!("Cannot build input matrix: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;

    #[test]
    fn test_binary_linear() {
        let model = LinearModel::from_json_str(
            r#"{"classes":[0,1],"coef":[[1.0,-1.0]],"intercept":[0.0]}"#,
        )
        .unwrap();
        let rows = array![[2.0f32, 1.0], [0.0, 3.0], [1.0, 1.0]];
        assert_eq!(model.predict(rows.view()).unwrap(), vec![1, 0, 0]);
        assert_eq!(model.n_features(), Some(2));
    }

    #[test]
    fn test_multiclass_argmax() {
        let model = LinearModel::from_json_str(
            r#"{"classes":[0,1,2],
                "coef":[[1.0,0.0],[0.0,1.0],[-1.0,-1.0]],
                "intercept":[0.0,0.0,0.5]}"#,
        )
        .unwrap();
        let rows = array![[3.0f32, 1.0], [0.0, 2.0], [-1.0, -1.0]];
        assert_eq!(model.predict(rows.view()).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_scaler_applied() {
        let model = LinearModel::from_json_str(
            r#"{"classes":[0,1],"coef":[[1.0]],"intercept":[0.0],
                "scaler":{"mean":[10.0],"scale":[2.0]}}"#,
        )
        .unwrap();
        let rows = array![[12.0f32], [8.0]];
        let scores = model.decision_function(rows.view()).unwrap();
        assert_eq!(scores.column(0).to_vec(), vec![1.0, -1.0]);
        assert_eq!(model.predict(rows.view()).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_width_mismatch() {
        let model = LinearModel::from_json_str(
            r#"{"classes":[0,1],"coef":[[1.0,1.0]],"intercept":[0.0]}"#,
        )
        .unwrap();
        let rows = array![[1.0f32, 2.0, 3.0]];
        assert!(matches!(
            model.predict(rows.view()),
            Err(Error::ModelMismatch(_))
        ));
    }

    #[test]
    fn test_invalid_artifacts() {
        for json in [
            r#"{"classes":[0,1],"coef":[],"intercept":[]}"#,
            r#"{"classes":[0,1],"coef":[[1.0],[1.0,2.0]],"intercept":[0.0,0.0]}"#,
            r#"{"classes":[0,1,2],"coef":[[1.0]],"intercept":[0.0]}"#,
            r#"{"classes":[0,1],"coef":[[1.0]],"intercept":[0.0,1.0]}"#,
            r#"{"classes":[0,1],"coef":[[1.0]],"intercept":[0.0],"scaler":{"mean":[],"scale":[]}}"#,
            "not json",
        ] {
            assert!(
                matches!(LinearModel::from_json_str(json), Err(Error::ModelLoad(_))),
                "{json}"
            );
        }
    }

    #[test]
    fn test_load_classifier_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clf.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(br#"{"classes":[0,1],"coef":[[1.0]],"intercept":[0.0]}"#)
            .unwrap();

        let model = load_classifier(&path).unwrap();
        assert_eq!(model.classes(), Some(&[0i64, 1][..]));

        assert!(matches!(
            load_classifier(&dir.path().join("missing.json")),
            Err(Error::ModelLoad(_))
        ));

        let other = dir.path().join("clf.pkl");
        std::fs::write(&other, b"").unwrap();
        assert!(matches!(load_classifier(&other), Err(Error::ModelLoad(_))));
    }

    #[test]
    fn test_stack_rows() {
        let m = stack_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.dim(), (2, 2));
        assert!(stack_rows(&[vec![1.0], vec![1.0, 2.0]]).is_err());
        assert_eq!(stack_rows(&[]).unwrap().dim(), (0, 0));
    }
}
