//! Spam-type classifier over sentence embeddings.

use std::path::Path;

use ndarray::{Array1, Array2};
use spamshield_core::{Error, Result, SpamTag};
use tracing::debug;

use crate::classifier::{load_classifier, Classifier};

/// Model output code → tag. Fixed; never inferred from the artifact.
const SPAM_TYPE_TAGS: [(i64, SpamTag); 3] = [
    (0, SpamTag::Commercial),
    (1, SpamTag::LoanScamSpam),
    (2, SpamTag::P2p),
];

/// Map a model output code to its tag.
pub fn tag_for_code(code: i64) -> Result<SpamTag> {
    SPAM_TYPE_TAGS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, tag)| *tag)
        .ok_or_else(|| {
            Error::ModelMismatch(format!(
                "Spam-type model emitted class {}, expected 0, 1 or 2",
                code
            ))
        })
}

pub struct SpamTypeClassifier {
    model: Box<dyn Classifier>,
}

impl SpamTypeClassifier {
    pub fn new(model: Box<dyn Classifier>) -> Result<Self> {
        if let Some(classes) = model.classes() {
            let mut sorted = classes.to_vec();
            sorted.sort_unstable();
            let expected: Vec<i64> = SPAM_TYPE_TAGS.iter().map(|(c, _)| *c).collect();
            if sorted != expected {
                return Err(Error::ModelMismatch(format!(
                    "Spam-type model classes {:?}, expected {:?}",
                    classes, expected
                )));
            }
        }
        Ok(Self { model })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::new(load_classifier(path)?)
    }

    pub fn describe(&self) -> String {
        self.model.describe()
    }

    /// Input width the model was trained on, when known.
    pub fn n_features(&self) -> Option<usize> {
        self.model.n_features()
    }

    /// One tag per embedding, in order.
    pub fn predict(&self, embeddings: &[Array1<f32>]) -> Result<Vec<SpamTag>> {
        if embeddings.is_empty() {
            return Ok(Vec::new());
        }

        let dim = embeddings[0].len();
        if embeddings.iter().any(|e| e.len() != dim) {
            return Err(Error::Inference("Embeddings have different widths".into()));
        }
        let mut matrix = Array2::<f32>::zeros((embeddings.len(), dim));
        for (mut row, embedding) in matrix.rows_mut().into_iter().zip(embeddings) {
            row.assign(embedding);
        }

        let codes = self.model.predict(matrix.view())?;
        if codes.len() != embeddings.len() {
            return Err(Error::ModelMismatch(format!(
                "Spam-type model returned {} labels for {} rows",
                codes.len(),
                embeddings.len()
            )));
        }

        let tags = codes
            .into_iter()
            .map(tag_for_code)
            .collect::<Result<Vec<_>>>()?;
        debug!("Spam-type: classified {} embeddings", tags.len());
        Ok(tags)
    }
}
