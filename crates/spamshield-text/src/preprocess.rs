//! Cleaning pipeline that turns raw message text into encoder input.

use std::sync::Arc;

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use spamshield_core::unicode::{contains_cjk, is_emoji_part};
use tracing::{debug, warn};

use crate::lemmatizer::lemmatize_noun;
use crate::stopwords::is_stopword;
use crate::translate::{IdentityTranslator, Translator};

static NON_LETTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z\s]").unwrap());
static MULTI_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Tokens this short or shorter are dropped.
const MIN_TOKEN_CHARS: usize = 2;

/// Every intermediate form of one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanedText {
    pub has_cjk: bool,
    /// Translated text, or the raw text when no translation happened.
    pub translated: String,
    /// Lowercase letters and single spaces only.
    pub cleaned: String,
    /// Tokens left after stopword/short-token removal, lemmatized.
    pub tokens: Vec<String>,
    /// Encoder input. Never empty unless the raw text was empty.
    pub text_final: String,
}

/// Strip newlines, emoji, digits and symbols; collapse whitespace;
/// lowercase; trim.
pub fn clean_text(text: &str) -> String {
    let no_newlines = text.replace('\n', " ");
    let no_emoji: String = no_newlines.chars().filter(|c| !is_emoji_part(*c)).collect();
    let letters_only = NON_LETTER_RE.replace_all(&no_emoji, " ");
    let collapsed = MULTI_SPACE_RE.replace_all(&letters_only, " ");
    collapsed.to_lowercase().trim().to_string()
}

fn tokenize(cleaned: &str) -> Vec<String> {
    cleaned
        .split_whitespace()
        .filter(|token| !is_stopword(token))
        .filter(|token| token.chars().count() > MIN_TOKEN_CHARS)
        .map(lemmatize_noun)
        .collect()
}

pub struct TextPreprocessor {
    translator: Arc<dyn Translator>,
}

impl Default for TextPreprocessor {
    fn default() -> Self {
        Self::new(Arc::new(IdentityTranslator))
    }
}

impl TextPreprocessor {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self { translator }
    }

    pub fn translator_name(&self) -> &str {
        self.translator.name()
    }

    /// Translate CJK text. Blank text and translation failures return the
    /// input unchanged.
    fn translate_if_needed(&self, text: &str, has_cjk: bool) -> String {
        if !has_cjk || text.trim().is_empty() {
            return text.to_string();
        }
        match self.translator.translate(text) {
            Ok(translated) => translated,
            Err(e) => {
                warn!("Translation failed, keeping original text: {}", e);
                text.to_string()
            }
        }
    }

    /// Run every cleaning step over one message.
    pub fn preprocess(&self, raw: &str) -> CleanedText {
        let has_cjk = contains_cjk(raw);
        let translated = self.translate_if_needed(raw, has_cjk);
        let cleaned = clean_text(&translated);
        let tokens = tokenize(&cleaned);

        let joined = tokens.join(" ");
        let text_final = if joined.trim().is_empty() {
            raw.to_string()
        } else {
            joined
        };

        CleanedText {
            has_cjk,
            translated,
            cleaned,
            tokens,
            text_final,
        }
    }

    /// Clean many messages in parallel; output order matches input order.
    pub fn preprocess_batch<S>(&self, texts: &[S]) -> Vec<CleanedText>
    where
        S: AsRef<str> + Sync,
    {
        debug!(
            "Cleaning {} messages (translator={})",
            texts.len(),
            self.translator.name()
        );
        texts.par_iter().map(|t| self.preprocess(t.as_ref())).collect()
    }
}
