//! SpamShield Features: lexical/statistical signals and URL normalization.
//!
//! Every feature is a pure, total function of the raw message text; empty or
//! degenerate input yields a neutral value instead of an error.

pub mod features;
pub mod url;

pub use features::{Feature, FeatureExtractor, FeatureVector, FEATURE_TABLE, MODEL_INPUT_ORDER};
pub use url::{clean_urls, defragment, find_urls, URL_PLACEHOLDER};
