//! Pipeline stages, partition bookkeeping and the run report.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use spamshield_core::{Error, RecordSet, Result, RowIndex, SpamTag};

/// Orchestrator states, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Loaded,
    FilteredNoRecord,
    SpamCodeScored,
    SpamCodeRemoved,
    TextCleaned,
    UrlImsiRemoved,
    Embedded,
    Classified,
    Labeled,
}

/// The five disjoint index sets a run produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Partitions {
    #[serde(rename = "noRecord")]
    pub no_record: BTreeSet<RowIndex>,
    #[serde(rename = "spamCode")]
    pub spam_code: BTreeSet<RowIndex>,
    #[serde(rename = "urlOnly")]
    pub url_only: BTreeSet<RowIndex>,
    #[serde(rename = "imsiOnly")]
    pub imsi_only: BTreeSet<RowIndex>,
    /// Records that went through embedding, with their predicted type.
    pub predicted: BTreeMap<RowIndex, SpamTag>,
}

impl Partitions {
    /// (name, indices) for the four rule-based partitions.
    fn rule_sets(&self) -> [(&'static str, &BTreeSet<RowIndex>); 4] {
        [
            ("NO_RECORD", &self.no_record),
            ("SPAM_CODE", &self.spam_code),
            ("URL_ONLY", &self.url_only),
            ("IMSI_ONLY", &self.imsi_only),
        ]
    }

    /// Check that every index in `0..total` is in exactly one partition.
    pub fn verify(&self, total: usize) -> Result<()> {
        let mut owner: BTreeMap<RowIndex, &'static str> = BTreeMap::new();
        let predicted = self.predicted.keys().map(|i| ("PREDICTED", i));
        let all = self
            .rule_sets()
            .into_iter()
            .flat_map(|(name, set)| set.iter().map(move |i| (name, i)))
            .chain(predicted);

        for (name, index) in all {
            if index.0 >= total {
                return Err(Error::PartitionInvariant(format!(
                    "{} holds {} but the input has {} records",
                    name, index, total
                )));
            }
            if let Some(previous) = owner.insert(*index, name) {
                return Err(Error::PartitionInvariant(format!(
                    "record {} is in both {} and {}",
                    index, previous, name
                )));
            }
        }

        if owner.len() != total {
            let missing: Vec<String> = (0..total)
                .map(RowIndex)
                .filter(|i| !owner.contains_key(i))
                .take(5)
                .map(|i| i.to_string())
                .collect();
            return Err(Error::PartitionInvariant(format!(
                "{} records have no tag (first: {})",
                total - owner.len(),
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Write tags onto a copy of `records` in the fixed order SPAM_CODE,
    /// URL_ONLY, IMSI_ONLY, NO_RECORD, predicted types, then verify that
    /// the partitions cover every record exactly once.
    pub fn apply(&self, records: &RecordSet) -> Result<RecordSet> {
        let mut labeled = records.clone();
        let order: [(&BTreeSet<RowIndex>, SpamTag); 4] = [
            (&self.spam_code, SpamTag::SpamCode),
            (&self.url_only, SpamTag::UrlOnly),
            (&self.imsi_only, SpamTag::ImsiOnly),
            (&self.no_record, SpamTag::NoRecord),
        ];
        for (set, tag) in order {
            for index in set {
                write_tag(&mut labeled, *index, tag)?;
            }
        }
        for (index, tag) in &self.predicted {
            write_tag(&mut labeled, *index, *tag)?;
        }

        self.verify(records.len())?;
        Ok(labeled)
    }

    pub fn counts(&self) -> TagCounts {
        let predicted = |tag: SpamTag| self.predicted.values().filter(|t| **t == tag).count();
        TagCounts {
            no_record: self.no_record.len(),
            spam_code: self.spam_code.len(),
            url_only: self.url_only.len(),
            imsi_only: self.imsi_only.len(),
            commercial: predicted(SpamTag::Commercial),
            loan_scam_spam: predicted(SpamTag::LoanScamSpam),
            p2p: predicted(SpamTag::P2p),
        }
    }
}

fn write_tag(records: &mut RecordSet, index: RowIndex, tag: SpamTag) -> Result<()> {
    if records.set_tag(index, tag) {
        Ok(())
    } else {
        Err(Error::PartitionInvariant(format!(
            "{} assigned to unknown record {}",
            tag, index
        )))
    }
}

/// Number of records per final tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagCounts {
    #[serde(rename = "NO_RECORD")]
    pub no_record: usize,
    #[serde(rename = "SPAM_CODE")]
    pub spam_code: usize,
    #[serde(rename = "URL_ONLY")]
    pub url_only: usize,
    #[serde(rename = "IMSI_ONLY")]
    pub imsi_only: usize,
    #[serde(rename = "COMMERCIAL")]
    pub commercial: usize,
    #[serde(rename = "LOAN/SCAM/SPAM")]
    pub loan_scam_spam: usize,
    #[serde(rename = "P2P")]
    pub p2p: usize,
}

impl TagCounts {
    pub fn total(&self) -> usize {
        self.no_record
            + self.spam_code
            + self.url_only
            + self.imsi_only
            + self.commercial
            + self.loan_scam_spam
            + self.p2p
    }
}

/// Summary of one tagging run.
#[derive(Debug, Clone, Serialize)]
pub struct TaggingReport {
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub stage: PipelineStage,
    pub total: usize,
    pub counts: TagCounts,
    /// CJK messages sent through the translator.
    pub translated: usize,
    /// Texts served from the embedding cache during this run.
    #[serde(rename = "embeddingCacheHits")]
    pub embedding_cache_hits: u64,
}

/// What the orchestrator has loaded, for status output.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineInfo {
    pub encoder: String,
    #[serde(rename = "embeddingDim")]
    pub embedding_dim: usize,
    #[serde(rename = "spamCodeModel")]
    pub spam_code_model: String,
    #[serde(rename = "spamTypeModel")]
    pub spam_type_model: String,
    pub translator: String,
    #[serde(rename = "cachedEmbeddings")]
    pub cached_embeddings: usize,
}
