//! Feature-level properties the tagging pipeline relies on.

use spamshield_features::{Feature, FeatureExtractor, URL_PLACEHOLDER};

#[test]
fn test_degenerate_inputs_never_panic() {
    let extractor = FeatureExtractor::new();
    let inputs = [
        "",
        " ",
        "\n\t",
        "\u{0}",
        "\u{FFFD}\u{FFFD}",
        "👨\u{200D}👩\u{200D}👧",
        "ｈｔｔｐ：／／",
        "a . : / b",
    ];
    for input in inputs {
        let fv = extractor.extract(input);
        for value in fv.values.values() {
            assert!(value.is_finite(), "non-finite feature for {input:?}");
        }
    }
}

#[test]
fn test_url_only_message_normalizes_to_placeholder() {
    let extractor = FeatureExtractor::new();
    for text in [
        "https://promo.example.com/claim?id=7",
        "  bit . ly / 3xYz  ",
        "www.gcash-rewards.com",
    ] {
        let fv = extractor.extract(text);
        assert_eq!(fv.cleaned_url_str, URL_PLACEHOLDER, "for {text:?}");
    }
}

#[test]
fn test_message_with_text_and_url_is_not_url_only() {
    let fv = FeatureExtractor::new().extract("Your loan is approved, see https://loans.example.com");
    assert!(fv.flag(Feature::HasUrl));
    assert_eq!(fv.cleaned_url_str, "Your loan is approved, see url");
}

#[test]
fn test_feature_vector_serializes_by_name() {
    let fv = FeatureExtractor::new().extract("AB12345");
    let json = serde_json::to_value(&fv).unwrap();
    assert_eq!(json["values"]["REGEX_SPAM"], 1.0);
    assert_eq!(json["values"]["CHAR_LENGTH"], 7.0);
    assert_eq!(json["CLEANED_URL_STR"], "AB12345");
}
