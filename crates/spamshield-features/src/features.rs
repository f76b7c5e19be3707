//! Feature table and extractor.
//!
//! `FEATURE_TABLE` is the ordered list of base features; each entry pairs a
//! name with a pure `fn(&str) -> f64`. `AVG_CAPS_PER_WORD` is derived after
//! the table has run, and `CLEANED_URL_STR` rides along as text.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use spamshield_core::unicode::{contains_cjk, is_cjk, is_decimal_digit, is_digit, is_emoji};
use tracing::debug;

use crate::url::{clean_urls, find_urls};

/// Named numeric/boolean feature. Boolean features are 0.0 or 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Feature {
    HasCjk,
    LetterToSymbolRatio,
    SpecialCharRatio,
    MaxConsecConsonants,
    HasImsiStr,
    HasUrl,
    DigitRatio,
    CapitalLetterToWordRatio,
    CharLength,
    CapitalLetterCount,
    WordCount,
    NonSpaceCharLength,
    HasUnicodeOddities,
    CharEntropy,
    RegexSpam,
    AvgCapsPerWord,
}

impl Feature {
    pub fn name(&self) -> &'static str {
        match self {
            Self::HasCjk => "HAS_CJK",
            Self::LetterToSymbolRatio => "LETTER_TO_SYMBOL_RATIO",
            Self::SpecialCharRatio => "SPECIAL_CHAR_RATIO",
            Self::MaxConsecConsonants => "MAX_CONSEC_CONSONANTS",
            Self::HasImsiStr => "HAS_IMSI_STR",
            Self::HasUrl => "HAS_URL",
            Self::DigitRatio => "DIGIT_RATIO",
            Self::CapitalLetterToWordRatio => "CAPITAL_LETTER_TO_WORD_RATIO",
            Self::CharLength => "CHAR_LENGTH",
            Self::CapitalLetterCount => "CAPITAL_LETTER_COUNT",
            Self::WordCount => "WORD_COUNT",
            Self::NonSpaceCharLength => "NON_SPACE_CHAR_LENGTH",
            Self::HasUnicodeOddities => "HAS_UNICODE_ODDITIES",
            Self::CharEntropy => "CHAR_ENTROPY",
            Self::RegexSpam => "REGEX_SPAM",
            Self::AvgCapsPerWord => "AVG_CAPS_PER_WORD",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub type FeatureFn = fn(&str) -> f64;

/// Base features in evaluation order.
pub const FEATURE_TABLE: [(Feature, FeatureFn); 15] = [
    (Feature::HasCjk, has_cjk),
    (Feature::LetterToSymbolRatio, letter_to_symbol_ratio),
    (Feature::SpecialCharRatio, special_char_ratio),
    (Feature::MaxConsecConsonants, max_consec_consonants),
    (Feature::HasImsiStr, has_imsi_str),
    (Feature::HasUrl, has_url),
    (Feature::DigitRatio, digit_ratio),
    (Feature::CapitalLetterToWordRatio, capital_letter_to_word_ratio),
    (Feature::CharLength, char_length),
    (Feature::CapitalLetterCount, capital_letter_count),
    (Feature::WordCount, word_count),
    (Feature::NonSpaceCharLength, non_space_char_length),
    (Feature::HasUnicodeOddities, has_unicode_oddities),
    (Feature::CharEntropy, char_entropy),
    (Feature::RegexSpam, regex_spam),
];

/// Column order the spam-code model was trained on.
pub const MODEL_INPUT_ORDER: [Feature; 16] = [
    Feature::LetterToSymbolRatio,
    Feature::SpecialCharRatio,
    Feature::MaxConsecConsonants,
    Feature::HasImsiStr,
    Feature::HasCjk,
    Feature::HasUrl,
    Feature::DigitRatio,
    Feature::CapitalLetterToWordRatio,
    Feature::CharLength,
    Feature::CapitalLetterCount,
    Feature::WordCount,
    Feature::AvgCapsPerWord,
    Feature::NonSpaceCharLength,
    Feature::HasUnicodeOddities,
    Feature::CharEntropy,
    Feature::RegexSpam,
];

/// Features of one message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureVector {
    /// Feature values. `AVG_CAPS_PER_WORD` is absent when there are no words.
    pub values: BTreeMap<Feature, f64>,
    /// Message text with URLs replaced by the placeholder.
    #[serde(rename = "CLEANED_URL_STR")]
    pub cleaned_url_str: String,
}

impl FeatureVector {
    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.values.get(&feature).copied()
    }

    /// Boolean view of a 0/1 feature. Missing counts as false.
    pub fn flag(&self, feature: Feature) -> bool {
        self.get(feature) == Some(1.0)
    }

    /// Model input row in `MODEL_INPUT_ORDER`; undefined values become 0.0.
    pub fn model_input(&self) -> Vec<f32> {
        MODEL_INPUT_ORDER
            .iter()
            .map(|f| self.get(*f).unwrap_or(0.0) as f32)
            .collect()
    }
}

/// Computes `FeatureVector`s from raw text.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Run the full feature table over one message.
    pub fn extract(&self, text: &str) -> FeatureVector {
        let mut values: BTreeMap<Feature, f64> = FEATURE_TABLE
            .iter()
            .map(|(feature, func)| (*feature, func(text)))
            .collect();

        let caps = values[&Feature::CapitalLetterCount];
        let words = values[&Feature::WordCount];
        if words > 0.0 {
            values.insert(Feature::AvgCapsPerWord, caps / words);
        }

        FeatureVector {
            values,
            cleaned_url_str: clean_urls(text),
        }
    }

    /// Extract features for many messages in parallel; output order matches
    /// input order.
    pub fn extract_batch<S>(&self, texts: &[S]) -> Vec<FeatureVector>
    where
        S: AsRef<str> + Sync,
    {
        debug!("Extracting {} features for {} messages", FEATURE_TABLE.len() + 1, texts.len());
        texts.par_iter().map(|t| self.extract(t.as_ref())).collect()
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

static IMSI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"imsi=\d+&uid=[A-Za-z0-9]+&t=\d+").unwrap());

static CODE_CHARSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N}\p{S}\p{P}]{6,}$").unwrap());

// Digit-like tail: Unicode digits and the mathematical digit blocks
// (U+1D7CE-U+1D7FF).
static CODE_TAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}\p{N}\p{S}\p{P}]*[\d\x{1D7CE}-\x{1D7FF}]{3,7}$")
        .unwrap()
});

pub fn has_cjk(text: &str) -> f64 {
    flag(contains_cjk(text))
}

pub fn letter_to_symbol_ratio(text: &str) -> f64 {
    let (letters, non_space) = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .fold((0, 0), |(l, n), c| (l + usize::from(c.is_alphabetic()), n + 1));
    ratio(letters, non_space)
}

pub fn special_char_ratio(text: &str) -> f64 {
    if text.trim().is_empty() {
        return 0.0;
    }
    let (special, non_space) = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .fold((0, 0), |(s, n), c| (s + usize::from(c.is_ascii_punctuation()), n + 1));
    ratio(special, non_space)
}

fn is_consonant(c: char) -> bool {
    c.is_alphanumeric() && !is_decimal_digit(c) && !"aeiouAEIOU".contains(c)
}

pub fn max_consec_consonants(text: &str) -> f64 {
    let mut best = 0usize;
    let mut run = 0usize;
    for c in text.chars() {
        if is_consonant(c) {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best as f64
}

pub fn has_imsi_str(text: &str) -> f64 {
    flag(IMSI_RE.is_match(text))
}

pub fn has_url(text: &str) -> f64 {
    flag(!find_urls(text).is_empty())
}

pub fn digit_ratio(text: &str) -> f64 {
    let (digits, total) = text
        .chars()
        .filter(|c| *c != ' ')
        .fold((0, 0), |(d, n), c| (d + usize::from(is_digit(c)), n + 1));
    ratio(digits, total)
}

pub fn capital_letter_to_word_ratio(text: &str) -> f64 {
    let words = text.split_whitespace().count();
    let capitals = text.chars().filter(|c| c.is_uppercase()).count();
    ratio(capitals, words)
}

pub fn char_length(text: &str) -> f64 {
    text.chars().count() as f64
}

pub fn capital_letter_count(text: &str) -> f64 {
    text.chars().filter(|c| c.is_uppercase()).count() as f64
}

pub fn word_count(text: &str) -> f64 {
    text.split_whitespace().count() as f64
}

pub fn non_space_char_length(text: &str) -> f64 {
    text.chars().filter(|c| *c != ' ').count() as f64
}

/// Non-ASCII characters that are neither emoji nor CJK: homoglyphs, styled
/// letters, stray symbols.
pub fn has_unicode_oddities(text: &str) -> f64 {
    flag(
        text.chars()
            .any(|c| (c as u32) > 127 && !is_emoji(c) && !is_cjk(c)),
    )
}

/// Shannon entropy (bits) of the character distribution of the trimmed text.
pub fn char_entropy(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for c in trimmed.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }

    counts
        .values()
        .map(|&count| {
            let p = count as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

/// Spam-code shape: at least 6 letter/number/symbol/punctuation characters
/// and nothing else, ending in 3-7 digit-like characters.
pub fn regex_spam(text: &str) -> f64 {
    flag(CODE_CHARSET_RE.is_match(text) && CODE_TAIL_RE.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_text_is_neutral() {
        for (feature, func) in FEATURE_TABLE.iter() {
            assert_eq!(func(""), 0.0, "{feature} should be 0 for empty text");
            assert!(func("   ").is_finite(), "{feature} on blank text");
        }
        assert_eq!(char_length(""), 0.0);
        assert_eq!(word_count(""), 0.0);
        assert_eq!(digit_ratio(""), 0.0);
        assert_eq!(char_entropy(""), 0.0);
    }

    #[test]
    fn test_ratios() {
        assert!(approx(letter_to_symbol_ratio("ab 1!"), 0.5));
        assert!(approx(special_char_ratio("a!b?"), 0.5));
        assert_eq!(special_char_ratio("   "), 0.0);
        assert!(approx(digit_ratio("ab 12"), 0.5));
        assert!(approx(digit_ratio("a²"), 0.5));
        assert!(approx(digit_ratio("①② ab"), 0.5));
        assert!(approx(capital_letter_to_word_ratio("HELLO there"), 2.5));
    }

    #[test]
    fn test_max_consec_consonants() {
        assert_eq!(max_consec_consonants("strength"), 4.0);
        assert_eq!(max_consec_consonants("xKcd9qwrtz"), 5.0);
        assert_eq!(max_consec_consonants("aeiou 123"), 0.0);
        assert_eq!(max_consec_consonants("b_c"), 1.0);
    }

    #[test]
    fn test_imsi() {
        assert_eq!(
            has_imsi_str("http://x.co/p?imsi=515021234567890&uid=Ab12&t=1699999999"),
            1.0
        );
        assert_eq!(has_imsi_str("imsi=abc&uid=1&t=2"), 0.0);
    }

    #[test]
    fn test_cjk_and_oddities() {
        assert_eq!(has_cjk("日本語"), 1.0);
        assert_eq!(has_cjk("hello world"), 0.0);
        assert_eq!(has_unicode_oddities("hello 😀"), 0.0);
        assert_eq!(has_unicode_oddities("日本語"), 0.0);
        assert_eq!(has_unicode_oddities("𝐅𝐑𝐄𝐄 prize"), 1.0);
        assert_eq!(has_unicode_oddities("café"), 1.0);
    }

    #[test]
    fn test_plain_emoji_are_not_oddities() {
        assert_eq!(has_unicode_oddities("🈁 promo"), 0.0);
        assert_eq!(has_unicode_oddities("🉐"), 0.0);
        assert_eq!(has_unicode_oddities("⤴ up"), 0.0);
        assert_eq!(has_unicode_oddities("📱"), 0.0);
        assert_eq!(has_unicode_oddities("→ next"), 1.0);
    }

    #[test]
    fn test_entropy() {
        assert_eq!(char_entropy("aaaa"), 0.0);
        assert!(approx(char_entropy("  ab  "), 1.0));
        assert!(approx(char_entropy("abcd"), 2.0));
    }

    #[test]
    fn test_regex_spam() {
        assert_eq!(regex_spam("AB12345"), 1.0);
        assert_eq!(regex_spam("AB"), 0.0);
        assert_eq!(regex_spam("PROMO-8842"), 1.0);
        assert_eq!(regex_spam("XY123456789"), 1.0);
        assert_eq!(regex_spam("AB 12345"), 0.0);
        assert_eq!(regex_spam("ABCDEF12"), 0.0);
        assert_eq!(regex_spam("WIN𝟏𝟐𝟑"), 1.0);
        assert_eq!(regex_spam("CODE𝟎𝟗𝟕"), 1.0);
    }

    #[test]
    fn test_regex_spam_ignores_enclosed_digits() {
        // Digit-with-comma forms are numbers but not digits.
        assert_eq!(regex_spam("ABC🄁🄂🄃"), 0.0);
        assert_eq!(regex_spam("ABC①②③"), 0.0);
    }

    #[test]
    fn test_extract_derives_avg_caps() {
        let extractor = FeatureExtractor::new();
        let fv = extractor.extract("FREE Load NOW");
        assert_eq!(fv.get(Feature::CapitalLetterCount), Some(8.0));
        assert_eq!(fv.get(Feature::WordCount), Some(3.0));
        assert!(approx(fv.get(Feature::AvgCapsPerWord).unwrap(), 8.0 / 3.0));

        let empty = extractor.extract("");
        assert_eq!(empty.get(Feature::AvgCapsPerWord), None);
        assert_eq!(empty.model_input().len(), MODEL_INPUT_ORDER.len());
        assert!(empty.model_input().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_extract_cleaned_url_and_flags() {
        let fv = FeatureExtractor::new().extract("Claim now: bit.ly/abc");
        assert!(fv.flag(Feature::HasUrl));
        assert!(!fv.flag(Feature::HasCjk));
        assert_eq!(fv.cleaned_url_str, "Claim now:url");
    }

    #[test]
    fn test_batch_preserves_order() {
        let texts = vec!["AB12345", "hello world", "日本語"];
        let out = FeatureExtractor::new().extract_batch(&texts);
        assert_eq!(out.len(), 3);
        assert!(out[0].flag(Feature::RegexSpam));
        assert!(!out[1].flag(Feature::RegexSpam));
        assert!(out[2].flag(Feature::HasCjk));
    }
}
