//! TaggingOrchestrator: runs the staged pipeline over a record set.
//!
//! Each stage works on the complement of every index removed so far. An
//! empty working set is legal at any point and flows through the remaining
//! stages without calling a model.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use spamshield_core::{Error, RecordSet, Result, RowIndex, SpamShieldConfig};
use spamshield_features::{Feature, FeatureExtractor, FeatureVector, URL_PLACEHOLDER};
use spamshield_infer::{
    create_encoder, EmbeddingEncoder, EncoderBackend, SpamCodeClassifier, SpamTypeClassifier,
};
use spamshield_text::{create_translator, TextPreprocessor, Translator};
use tracing::{debug, info};

use crate::types::*;

/// Content that marks a placeholder record.
const NO_RECORD_TEXT: &str = "no record";

/// Whether a record's content is the "no record" placeholder.
pub fn is_no_record(content: &str) -> bool {
    content.trim().to_lowercase() == NO_RECORD_TEXT
}

/// Whether the URL-normalized text is nothing but one URL.
pub fn is_url_only(cleaned_url_str: &str) -> bool {
    cleaned_url_str.trim() == URL_PLACEHOLDER
}

pub struct TaggingOrchestrator {
    extractor: FeatureExtractor,
    spam_code: SpamCodeClassifier,
    preprocessor: TextPreprocessor,
    encoder: EmbeddingEncoder,
    spam_type: SpamTypeClassifier,
}

impl TaggingOrchestrator {
    pub fn new(
        spam_code: SpamCodeClassifier,
        spam_type: SpamTypeClassifier,
        encoder: Arc<dyn EncoderBackend>,
        translator: Arc<dyn Translator>,
        batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::Config("Embedding batch size must be at least 1".into()));
        }
        if let Some(width) = spam_type.n_features() {
            if width != encoder.dimension() {
                return Err(Error::ModelMismatch(format!(
                    "Spam-type model takes {}-dim input, encoder '{}' produces {}",
                    width,
                    encoder.name(),
                    encoder.dimension()
                )));
            }
        }

        Ok(Self {
            extractor: FeatureExtractor::new(),
            spam_code,
            preprocessor: TextPreprocessor::new(translator),
            encoder: EmbeddingEncoder::new(encoder, batch_size),
            spam_type,
        })
    }

    /// Load every model named by the configuration. Any missing artifact
    /// fails here, before a record is touched.
    pub fn from_config(config: &SpamShieldConfig) -> Result<Self> {
        let paths = &config.model_paths;
        info!("Loading models from {}", paths.root.display());

        let spam_code = SpamCodeClassifier::load(&paths.spam_code_clf)?;
        let spam_type = SpamTypeClassifier::load(&paths.spam_type_clf)?;
        let encoder = create_encoder(&paths.embedding_dir, &config.embedding)?;
        let translator = create_translator(&config.translation)?;

        Self::new(
            spam_code,
            spam_type,
            encoder,
            translator,
            config.embedding.batch_size,
        )
    }

    pub fn info(&self) -> PipelineInfo {
        PipelineInfo {
            encoder: self.encoder.backend_name().to_string(),
            embedding_dim: self.encoder.dimension(),
            spam_code_model: self.spam_code.describe(),
            spam_type_model: self.spam_type.describe(),
            translator: self.preprocessor.translator_name().to_string(),
            cached_embeddings: self.encoder.cache().len(),
        }
    }

    /// Tag every record. Returns a labeled copy; the input is untouched. On
    /// any error nothing is returned.
    pub fn tag(&self, records: &RecordSet) -> Result<(RecordSet, TaggingReport)> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let (cache_hits_before, _) = self.encoder.cache().stats();
        let mut parts = Partitions::default();

        // LOADED
        let mut working: BTreeSet<RowIndex> = records.indices().collect();
        log_stage(PipelineStage::Loaded, working.len(), &parts);

        // FILTERED_NO_RECORD
        parts.no_record = working
            .iter()
            .copied()
            .filter(|i| records.get(*i).is_some_and(|r| is_no_record(&r.content)))
            .collect();
        remove_all(&mut working, &parts.no_record);
        log_stage(PipelineStage::FilteredNoRecord, working.len(), &parts);

        // SPAM_CODE_SCORED
        let order: Vec<RowIndex> = working.iter().copied().collect();
        let contents = contents_of(records, &order);
        let features: Vec<FeatureVector> = self.extractor.extract_batch(&contents);
        let decisions = self.spam_code.classify(&features)?;
        log_stage(PipelineStage::SpamCodeScored, working.len(), &parts);

        // SPAM_CODE_REMOVED
        parts.spam_code = order
            .iter()
            .zip(&decisions)
            .filter(|(_, d)| d.is_spam_code)
            .map(|(i, _)| *i)
            .collect();
        remove_all(&mut working, &parts.spam_code);
        let features_by_index: BTreeMap<RowIndex, FeatureVector> =
            order.into_iter().zip(features).collect();
        log_stage(PipelineStage::SpamCodeRemoved, working.len(), &parts);

        // TEXT_CLEANED
        let order: Vec<RowIndex> = working.iter().copied().collect();
        let cleaned = self.preprocessor.preprocess_batch(&contents_of(records, &order));
        let translated = cleaned.iter().filter(|c| c.has_cjk).count();
        log_stage(PipelineStage::TextCleaned, working.len(), &parts);

        // URL_IMSI_REMOVED. IMSI goes first, so a URL-only message that
        // carries an IMSI string ends up IMSI_ONLY.
        for index in &order {
            let fv = features_by_index.get(index).ok_or_else(|| {
                Error::Internal(format!("No features computed for record {}", index))
            })?;
            if fv.flag(Feature::HasImsiStr) {
                parts.imsi_only.insert(*index);
            } else if is_url_only(&fv.cleaned_url_str) {
                parts.url_only.insert(*index);
            }
        }
        remove_all(&mut working, &parts.imsi_only);
        remove_all(&mut working, &parts.url_only);
        log_stage(PipelineStage::UrlImsiRemoved, working.len(), &parts);

        // EMBEDDED
        let (to_embed, texts): (Vec<RowIndex>, Vec<&str>) = order
            .iter()
            .zip(&cleaned)
            .filter(|(i, _)| working.contains(*i))
            .map(|(i, c)| (*i, c.text_final.as_str()))
            .unzip();
        let embeddings = self.encoder.encode(&texts)?;
        log_stage(PipelineStage::Embedded, working.len(), &parts);

        // CLASSIFIED
        let tags = self.spam_type.predict(&embeddings)?;
        parts.predicted = to_embed.into_iter().zip(tags).collect();
        log_stage(PipelineStage::Classified, working.len(), &parts);

        // LABELED
        let labeled = parts.apply(records)?;
        let (cache_hits_after, _) = self.encoder.cache().stats();
        let report = TaggingReport {
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            stage: PipelineStage::Labeled,
            total: records.len(),
            counts: parts.counts(),
            translated,
            embedding_cache_hits: cache_hits_after.saturating_sub(cache_hits_before),
        };

        info!(
            "Tagged {} records in {}ms: {:?}",
            report.total, report.duration_ms, report.counts
        );
        Ok((labeled, report))
    }
}

fn contents_of<'a>(records: &'a RecordSet, order: &[RowIndex]) -> Vec<&'a str> {
    order
        .iter()
        .map(|i| records.get(*i).map(|r| r.content.as_str()).unwrap_or(""))
        .collect()
}

fn remove_all(working: &mut BTreeSet<RowIndex>, removed: &BTreeSet<RowIndex>) {
    working.retain(|i| !removed.contains(i));
}

fn log_stage(stage: PipelineStage, remaining: usize, parts: &Partitions) {
    debug!(
        "{:?}: working={} no_record={} spam_code={} url_only={} imsi_only={} predicted={}",
        stage,
        remaining,
        parts.no_record.len(),
        parts.spam_code.len(),
        parts.url_only.len(),
        parts.imsi_only.len(),
        parts.predicted.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_record_detection() {
        assert!(is_no_record("no record"));
        assert!(is_no_record("  No Record \n"));
        assert!(is_no_record("NO RECORD"));
        assert!(!is_no_record("no records"));
        assert!(!is_no_record("no  record"));
        assert!(!is_no_record(""));
    }

    #[test]
    fn test_url_only_detection() {
        assert!(is_url_only("url"));
        assert!(is_url_only(" url "));
        assert!(!is_url_only("url url"));
        assert!(!is_url_only("visit url"));
        assert!(!is_url_only("URL"));
    }
}
