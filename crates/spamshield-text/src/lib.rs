//! SpamShield Text: prepares message text for the sentence encoder.
//!
//! `TextPreprocessor` runs the cleaning steps in order: CJK detection,
//! optional translation, character cleaning, tokenizing, stopword and
//! short-token removal, lemmatizing and re-joining.

pub mod lemmatizer;
pub mod preprocess;
pub mod stopwords;
pub mod translate;

pub use lemmatizer::lemmatize_noun;
pub use preprocess::{clean_text, CleanedText, TextPreprocessor};
pub use stopwords::is_stopword;
pub use translate::{create_translator, HttpTranslator, IdentityTranslator, Translator};
