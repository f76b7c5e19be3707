//! SpamShield Core: record model, spam tags, configuration, error type.

pub mod config;
pub mod error;
pub mod record;
pub mod unicode;

pub use config::{EmbeddingSettings, ModelPaths, Pooling, SpamShieldConfig, TranslationSettings};
pub use error::{Error, Result};
pub use record::{Record, RecordId, RecordSet, RowIndex, SpamTag};
