//! Configuration and model artifact locations.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Paths to the three model artifacts the pipeline needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPaths {
    /// Artifact root directory (e.g., `models/`).
    pub root: PathBuf,
    /// Spam-code binary classifier (`spam_code_clf.json` or `.onnx`).
    pub spam_code_clf: PathBuf,
    /// Spam-type multi-class classifier (`sms_spam_type_clf.json` or `.onnx`).
    pub spam_type_clf: PathBuf,
    /// Sentence-embedding model directory (`embedding/`).
    pub embedding_dir: PathBuf,
}

impl ModelPaths {
    /// Resolve artifact paths under a root directory. Does not touch the
    /// filesystem beyond checking which classifier format is present.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            spam_code_clf: resolve_artifact(&root, "spam_code_clf"),
            spam_type_clf: resolve_artifact(&root, "sms_spam_type_clf"),
            embedding_dir: root.join("embedding"),
            root,
        }
    }
}

/// JSON artifacts win over ONNX when both exist; a missing artifact resolves
/// to the JSON path so the load error names a concrete file.
fn resolve_artifact(root: &Path, stem: &str) -> PathBuf {
    let json = root.join(format!("{stem}.json"));
    let onnx = root.join(format!("{stem}.onnx"));
    if !json.exists() && onnx.exists() {
        onnx
    } else {
        json
    }
}

/// How token embeddings are reduced to one sentence vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pooling {
    /// Attention-masked mean over tokens (SentenceTransformers default).
    Mean,
    /// Hidden state of the last non-padding token (Qwen3-Embedding style).
    LastToken,
}

impl std::str::FromStr for Pooling {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "last_token" | "last" => Ok(Self::LastToken),
            other => Err(Error::Config(format!("unknown pooling '{other}'"))),
        }
    }
}

/// Embedding encoder tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Texts per model invocation. No effect on output.
    pub batch_size: usize,
    /// Token truncation length.
    pub max_seq_len: usize,
    pub pooling: Pooling,
    /// Whether the graph takes a third `token_type_ids` input.
    pub token_type_ids: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            batch_size: 32,
            max_seq_len: 512,
            pooling: Pooling::Mean,
            token_type_ids: true,
        }
    }
}

/// Translation of CJK messages into the working language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationSettings {
    /// LibreTranslate-compatible endpoint. `None` disables translation.
    pub endpoint: Option<String>,
    /// Working language code.
    pub target_lang: String,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            target_lang: "en".to_string(),
        }
    }
}

/// Top-level SpamShield configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpamShieldConfig {
    /// HTTP server port.
    pub port: u16,
    pub model_paths: ModelPaths,
    pub embedding: EmbeddingSettings,
    pub translation: TranslationSettings,
}

impl SpamShieldConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(model_dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_vars(model_dir, |key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(model_dir: impl AsRef<Path>, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_var(&var, "PORT")?.unwrap_or(3010);

        let defaults = EmbeddingSettings::default();
        let batch_size = parse_var(&var, "SPAMSHIELD_EMBED_BATCH_SIZE")?
            .unwrap_or(defaults.batch_size);
        if batch_size == 0 {
            return Err(Error::Config(
                "SPAMSHIELD_EMBED_BATCH_SIZE must be at least 1".into(),
            ));
        }
        let max_seq_len = parse_var(&var, "SPAMSHIELD_EMBED_MAX_SEQ_LEN")?
            .unwrap_or(defaults.max_seq_len);
        let pooling = parse_var(&var, "SPAMSHIELD_EMBED_POOLING")?.unwrap_or(defaults.pooling);
        let token_type_ids = parse_var(&var, "SPAMSHIELD_EMBED_TOKEN_TYPE_IDS")?
            .unwrap_or(defaults.token_type_ids);

        let endpoint = var("SPAMSHIELD_TRANSLATE_URL").filter(|u| !u.trim().is_empty());
        let target_lang = var("SPAMSHIELD_TRANSLATE_TARGET")
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| "en".to_string());

        Ok(Self {
            port,
            model_paths: ModelPaths::new(model_dir),
            embedding: EmbeddingSettings {
                batch_size,
                max_seq_len,
                pooling,
                token_type_ids,
            },
            translation: TranslationSettings {
                endpoint,
                target_lang,
            },
        })
    }
}

fn parse_var<F, T>(var: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{key}={raw}: {e}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SpamShieldConfig::from_vars("models", lookup(&[])).unwrap();
        assert_eq!(config.port, 3010);
        assert_eq!(config.embedding.batch_size, 32);
        assert_eq!(config.embedding.pooling, Pooling::Mean);
        assert!(config.translation.endpoint.is_none());
        assert_eq!(config.translation.target_lang, "en");
        assert_eq!(
            config.model_paths.embedding_dir,
            PathBuf::from("models").join("embedding")
        );
    }

    #[test]
    fn test_overrides() {
        let config = SpamShieldConfig::from_vars(
            "models",
            lookup(&[
                ("PORT", "8080"),
                ("SPAMSHIELD_EMBED_BATCH_SIZE", "8"),
                ("SPAMSHIELD_EMBED_POOLING", "last_token"),
                ("SPAMSHIELD_EMBED_TOKEN_TYPE_IDS", "false"),
                ("SPAMSHIELD_TRANSLATE_URL", "http://localhost:5000/translate"),
            ]),
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.embedding.batch_size, 8);
        assert_eq!(config.embedding.pooling, Pooling::LastToken);
        assert!(!config.embedding.token_type_ids);
        assert_eq!(
            config.translation.endpoint.as_deref(),
            Some("http://localhost:5000/translate")
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let zero = SpamShieldConfig::from_vars(
            "models",
            lookup(&[("SPAMSHIELD_EMBED_BATCH_SIZE", "0")]),
        );
        assert!(matches!(zero, Err(Error::Config(_))));

        let port = SpamShieldConfig::from_vars("models", lookup(&[("PORT", "http")]));
        assert!(matches!(port, Err(Error::Config(_))));
    }

    #[test]
    fn test_onnx_artifact_resolution() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("spam_code_clf.onnx"), b"").unwrap();
        std::fs::write(dir.path().join("sms_spam_type_clf.onnx"), b"").unwrap();
        std::fs::write(dir.path().join("sms_spam_type_clf.json"), b"{}").unwrap();

        let paths = ModelPaths::new(dir.path());
        assert_eq!(paths.spam_code_clf, dir.path().join("spam_code_clf.onnx"));
        assert_eq!(paths.spam_type_clf, dir.path().join("sms_spam_type_clf.json"));
    }
}
