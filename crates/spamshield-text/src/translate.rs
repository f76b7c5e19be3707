//! Translation of non-working-language messages.
//!
//! Only messages with CJK characters are sent for translation. Callers
//! treat every error as "keep the original text".

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use spamshield_core::{Error, Result, TranslationSettings};
use tracing::{debug, info};

/// Translates text into the working language.
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str) -> Result<String>;

    /// Short name for logs and status output.
    fn name(&self) -> &str;
}

/// Returns text unchanged. Used when no translation endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn translate(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        "identity"
    }
}

/// Client for a LibreTranslate-compatible `/translate` endpoint.
pub struct HttpTranslator {
    client: reqwest::blocking::Client,
    endpoint: String,
    target_lang: String,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl HttpTranslator {
    pub fn new(endpoint: &str, target_lang: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Http(format!("Failed to build translation client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            target_lang: target_lang.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Translator for HttpTranslator {
    fn translate(&self, text: &str) -> Result<String> {
        let body = json!({
            "q": text,
            "source": "auto",
            "target": self.target_lang,
            "format": "text",
        });

        debug!("Translating {} chars via {}", text.chars().count(), self.endpoint);

        let response = self
            .client
            .post(format!("{}/translate", self.endpoint))
            .json(&body)
            .send()
            .map_err(|e| Error::Translation(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Translation(format!("API error {}: {}", status, body)));
        }

        let parsed: TranslateResponse = response
            .json()
            .map_err(|e| Error::Translation(format!("Bad response body: {}", e)))?;
        Ok(parsed.translated_text)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Build the translator the settings ask for.
///
/// Must not be called from inside an async context: the HTTP client owns a
/// blocking runtime.
pub fn create_translator(settings: &TranslationSettings) -> Result<Arc<dyn Translator>> {
    match settings.endpoint.as_deref() {
        Some(endpoint) if !endpoint.trim().is_empty() => {
            info!(
                "Translating CJK messages to '{}' via {}",
                settings.target_lang, endpoint
            );
            Ok(Arc::new(HttpTranslator::new(endpoint, &settings.target_lang)?))
        }
        _ => {
            info!("No translation endpoint configured. CJK messages are kept as-is.");
            Ok(Arc::new(IdentityTranslator))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let t = IdentityTranslator;
        assert_eq!(t.translate("日本語").unwrap(), "日本語");
        assert_eq!(t.name(), "identity");
    }

    #[test]
    fn test_create_without_endpoint_is_identity() {
        let settings = TranslationSettings::default();
        let t = create_translator(&settings).unwrap();
        assert_eq!(t.name(), "identity");

        let blank = TranslationSettings {
            endpoint: Some("  ".into()),
            target_lang: "en".into(),
        };
        assert_eq!(create_translator(&blank).unwrap().name(), "identity");
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let t = HttpTranslator::new("http://localhost:5000/", "en").unwrap();
        assert_eq!(t.endpoint(), "http://localhost:5000");
    }

    #[test]
    fn test_unreachable_endpoint_is_translation_error() {
        // Port 9 (discard) on localhost is not expected to run an HTTP server.
        let t = HttpTranslator::new("http://127.0.0.1:9", "en").unwrap();
        match t.translate("你好") {
            Err(Error::Translation(_)) => {}
            other => panic!("expected translation error, got {:?}", other.map(|_| ())),
        }
    }
}
