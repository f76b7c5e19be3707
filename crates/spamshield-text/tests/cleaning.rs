use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use spamshield_core::Result;
use spamshield_text::{TextPreprocessor, Translator};

/// Counts calls and marks its output so translated text is visible.
#[derive(Default)]
struct CountingTranslator {
    calls: AtomicUsize,
}

impl Translator for CountingTranslator {
    fn translate(&self, text: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("translated {}", text))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[test]
fn test_only_cjk_messages_are_translated() {
    let translator = Arc::new(CountingTranslator::default());
    let pre = TextPreprocessor::new(translator.clone());

    let texts = vec![
        "Send money via padala center",
        "안녕하세요 friend",
        "   ",
        "特价优惠",
        "Claim your rewards now",
    ];
    let out = pre.preprocess_batch(&texts);

    assert_eq!(translator.calls.load(Ordering::SeqCst), 2);
    assert!(out[1].translated.starts_with("translated "));
    assert!(out[3].translated.starts_with("translated "));
    assert_eq!(out[0].translated, texts[0]);
    assert_eq!(out[4].text_final, "claim reward");
}

#[test]
fn test_final_text_only_letters_or_raw_fallback() {
    let pre = TextPreprocessor::default();
    for raw in ["", "123 456", "!!!", "LOAN 5000 PHP", "P2P transfer ka na"] {
        let out = pre.preprocess(raw);
        let letters_only = out
            .text_final
            .chars()
            .all(|c| c.is_ascii_lowercase() || c == ' ');
        assert!(
            letters_only || out.text_final == raw,
            "unexpected final text {:?} for {:?}",
            out.text_final,
            raw
        );
    }
}
