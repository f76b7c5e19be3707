//! SpamShield Runtime: the tagging orchestrator.
//!
//! Runs a `RecordSet` through the staged pipeline (no-record filter,
//! spam-code scoring, text cleaning, URL/IMSI filter, embedding, spam-type
//! classification) and reconciles the five disjoint partitions into one
//! tag per record.

pub mod orchestrator;
pub mod types;

pub use orchestrator::{is_no_record, is_url_only, TaggingOrchestrator};
pub use types::*;
