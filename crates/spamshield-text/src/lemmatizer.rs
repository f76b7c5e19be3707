//! English noun lemmatizer: plural forms back to the singular.
//!
//! Irregular plurals come from a lookup table; regular plurals go through
//! an ordered suffix table. Words that only look plural (`news`, `bonus`)
//! are left alone.

use std::collections::HashMap;

use once_cell::sync::Lazy;

static IRREGULAR: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("men", "man"),
        ("women", "woman"),
        ("children", "child"),
        ("feet", "foot"),
        ("teeth", "tooth"),
        ("geese", "goose"),
        ("mice", "mouse"),
        ("lice", "louse"),
        ("oxen", "ox"),
        ("dice", "die"),
        ("wives", "wife"),
        ("lives", "life"),
        ("knives", "knife"),
        ("leaves", "leaf"),
        ("halves", "half"),
        ("selves", "self"),
        ("thieves", "thief"),
        ("shelves", "shelf"),
        ("loaves", "loaf"),
        ("wolves", "wolf"),
        ("calves", "calf"),
        ("data", "datum"),
        ("criteria", "criterion"),
        ("phenomena", "phenomenon"),
        ("analyses", "analysis"),
        ("crises", "crisis"),
        ("bases", "basis"),
        ("theses", "thesis"),
        ("indices", "index"),
        ("matrices", "matrix"),
        ("vertices", "vertex"),
        ("cacti", "cactus"),
        ("fungi", "fungus"),
        ("stimuli", "stimulus"),
    ]
    .into_iter()
    .collect()
});

/// Words that look plural but are already singular.
const INVARIANT: &[&str] = &[
    "news", "series", "species", "means", "always", "perhaps", "yes", "gas", "bias", "alias",
    "atlas", "canvas", "christmas", "lens", "plus", "thus", "was", "has", "does", "goes", "sms",
    "mms", "gps", "jesus", "specimen",
];

/// Plural suffix rules: (suffix, replacement). Longer suffixes first.
const SUFFIXES: &[(&str, &str)] = &[
    ("sses", "ss"),
    ("shes", "sh"),
    ("ches", "ch"),
    ("xes", "x"),
    ("zzes", "zz"),
    ("ies", "y"),
    ("men", "man"),
    // Already singular.
    ("ss", "ss"),
    ("us", "us"),
    ("is", "is"),
    ("s", ""),
];

/// Reduce a lowercase token to its singular noun form.
pub fn lemmatize_noun(word: &str) -> String {
    if let Some(lemma) = IRREGULAR.get(word) {
        return (*lemma).to_string();
    }
    if word.len() <= 3 || INVARIANT.contains(&word) {
        return word.to_string();
    }
    for &(suffix, replacement) in SUFFIXES {
        if word.len() > suffix.len() + 1 && word.ends_with(suffix) {
            let stem = &word[..word.len() - suffix.len()];
            return format!("{}{}", stem, replacement);
        }
    }

    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_plurals() {
        assert_eq!(lemmatize_noun("loans"), "loan");
        assert_eq!(lemmatize_noun("offers"), "offer");
        assert_eq!(lemmatize_noun("houses"), "house");
        assert_eq!(lemmatize_noun("boxes"), "box");
        assert_eq!(lemmatize_noun("classes"), "class");
        assert_eq!(lemmatize_noun("matches"), "match");
        assert_eq!(lemmatize_noun("parties"), "party");
        assert_eq!(lemmatize_noun("salesmen"), "salesman");
    }

    #[test]
    fn test_irregular_and_invariant() {
        assert_eq!(lemmatize_noun("children"), "child");
        assert_eq!(lemmatize_noun("women"), "woman");
        assert_eq!(lemmatize_noun("news"), "news");
        assert_eq!(lemmatize_noun("bonus"), "bonus");
        assert_eq!(lemmatize_noun("access"), "access");
        assert_eq!(lemmatize_noun("gcash"), "gcash");
    }

    #[test]
    fn test_short_words_untouched() {
        assert_eq!(lemmatize_noun("bus"), "bus");
        assert_eq!(lemmatize_noun("its"), "its");
        assert_eq!(lemmatize_noun(""), "");
    }

    #[test]
    fn test_idempotent() {
        for word in ["promos", "rewards", "winners", "parties", "children"] {
            let once = lemmatize_noun(word);
            assert_eq!(lemmatize_noun(&once), once, "{word}");
        }
    }
}
