//! Spam-code classifier: regex rule OR trained model, with an IMSI/CJK/URL
//! guard.

use std::path::Path;

use ndarray::Array2;
use serde::Serialize;
use spamshield_core::{Error, Result};
use spamshield_features::{Feature, FeatureVector, MODEL_INPUT_ORDER};
use tracing::debug;

use crate::classifier::{load_classifier, stack_rows, Classifier};

const SPAM_CODE_CLASSES: [i64; 2] = [0, 1];

/// Per-record outcome of both stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpamCodeDecision {
    pub regex_spam: bool,
    /// `IS_SPAM_CODE_PRED` from the trained model.
    pub predicted: bool,
    /// Final flag after the guard.
    pub is_spam_code: bool,
}

/// Combine the rule and the model prediction.
///
/// Spam-shaped text is confirmed unless it carries an IMSI string, CJK text
/// and a URL all at once.
pub fn final_flag(
    regex_spam: bool,
    predicted: bool,
    has_imsi: bool,
    has_cjk: bool,
    has_url: bool,
) -> bool {
    (regex_spam || predicted) && (!has_imsi || !has_cjk || !has_url)
}

pub struct SpamCodeClassifier {
    model: Box<dyn Classifier>,
}

impl SpamCodeClassifier {
    /// Wrap a fitted binary model. Fails if the model's recorded classes or
    /// input width disagree with the feature schema.
    pub fn new(model: Box<dyn Classifier>) -> Result<Self> {
        if let Some(classes) = model.classes() {
            if sorted(classes) != SPAM_CODE_CLASSES {
                return Err(Error::ModelMismatch(format!(
                    "Spam-code model classes {:?}, expected {:?}",
                    classes, SPAM_CODE_CLASSES
                )));
            }
        }
        if let Some(width) = model.n_features() {
            if width != MODEL_INPUT_ORDER.len() {
                return Err(Error::ModelMismatch(format!(
                    "Spam-code model takes {} features, expected {}",
                    width,
                    MODEL_INPUT_ORDER.len()
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

    /// Stage A: model predictions, one per feature vector.
    pub fn predict(&self, features: &[FeatureVector]) -> Result<Vec<bool>> {
        if features.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<Vec<f32>> = features.iter().map(FeatureVector::model_input).collect();
        let matrix: Array2<f32> = stack_rows(&rows)?;
        let labels = self.model.predict(matrix.view())?;
        if labels.len() != features.len() {
            return Err(Error::ModelMismatch(format!(
                "Spam-code model returned {} labels for {} rows",
                labels.len(),
                features.len()
            )));
        }

        labels
            .into_iter()
            .map(|label| match label {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(Error::ModelMismatch(format!(
                    "Spam-code model emitted label {}, expected 0 or 1",
                    other
                ))),
            })
            .collect()
    }

    /// Both stages.
    pub fn classify(&self, features: &[FeatureVector]) -> Result<Vec<SpamCodeDecision>> {
        let predictions = self.predict(features)?;
        let decisions: Vec<SpamCodeDecision> = features
            .iter()
            .zip(predictions)
            .map(|(fv, predicted)| {
                let regex_spam = fv.flag(Feature::RegexSpam);
                SpamCodeDecision {
                    regex_spam,
                    predicted,
                    is_spam_code: final_flag(
                        regex_spam,
                        predicted,
                        fv.flag(Feature::HasImsiStr),
                        fv.flag(Feature::HasCjk),
                        fv.flag(Feature::HasUrl),
                    ),
                }
            })
            .collect();

        debug!(
            "Spam-code: {} rows, {} by rule, {} by model, {} flagged",
            decisions.len(),
            decisions.iter().filter(|d| d.regex_spam).count(),
            decisions.iter().filter(|d| d.predicted).count(),
            decisions.iter().filter(|d| d.is_spam_code).count()
        );
        Ok(decisions)
    }
}

fn sorted(classes: &[i64]) -> Vec<i64> {
    let mut v = classes.to_vec();
    v.sort_unstable();
    v
}
