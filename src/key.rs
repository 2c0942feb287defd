//! Deterministic cache key derivation.
//!
//! Keys have the shape
//!
//! ```text
//! ai_cache:op:<operation>|<text segment>|opts:<hash>|q:<hash>
//! ```
//!
//! with the `opts` and `q` segments omitted when absent. Short texts are
//! embedded directly (with the reserved `|` and `:` delimiters replaced by
//! `_`); texts longer than the hash threshold collapse to `hash:<16 hex>`,
//! so keys stay bounded regardless of input size. Options are sorted by
//! key name before hashing, making keys independent of option order, and
//! are never embedded in clear text since they may carry credentials.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256, Sha512};

/// Prefix shared by every key the engine writes.
pub const KEY_PREFIX: &str = "ai_cache:";

/// Hex characters kept from each digest.
const DIGEST_HEX_LEN: usize = 16;

/// Default character count above which text is hashed rather than embedded.
pub const DEFAULT_HASH_THRESHOLD: usize = 1_000;

/// Caller-supplied operation options, e.g. model name or temperature.
pub type Options = Map<String, Value>;

/// Digest used for long texts, options and questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyHashAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl KeyHashAlgorithm {
    /// Hex digest of `parts`, truncated to the key segment width.
    fn digest_hex(&self, parts: &[&[u8]]) -> String {
        let bytes: Vec<u8> = match self {
            KeyHashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                for p in parts {
                    hasher.update(p);
                }
                hasher.finalize().to_vec()
            }
            KeyHashAlgorithm::Sha512 => {
                let mut hasher = Sha512::new();
                for p in parts {
                    hasher.update(p);
                }
                hasher.finalize().to_vec()
            }
        };
        bytes
            .iter()
            .take(DIGEST_HEX_LEN / 2)
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

/// An opaque cache key string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Stateless key generator.
///
/// ```rust
/// # use mimir::key::{KeyGenerator, Options};
/// let keys = KeyGenerator::new();
/// let key = keys.generate("I loved it", "sentiment", &Options::new(), None);
/// assert_eq!(key.as_str(), "ai_cache:op:sentiment|I loved it");
/// ```
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    hash_threshold: usize,
    algorithm: KeyHashAlgorithm,
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyGenerator {
    /// Generator with the default threshold (1,000 chars) and SHA-256.
    pub fn new() -> Self {
        Self {
            hash_threshold: DEFAULT_HASH_THRESHOLD,
            algorithm: KeyHashAlgorithm::default(),
        }
    }

    /// Set the character count above which texts are hashed.
    pub fn hash_threshold(mut self, chars: usize) -> Self {
        self.hash_threshold = chars;
        self
    }

    /// Set the digest algorithm.
    pub fn algorithm(mut self, algorithm: KeyHashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Derive the key for `(text, operation, options, question)`.
    pub fn generate(
        &self,
        text: &str,
        operation: &str,
        options: &Options,
        question: Option<&str>,
    ) -> CacheKey {
        let mut segments = Vec::with_capacity(4);
        segments.push(format!("op:{operation}"));
        segments.push(self.text_segment(text));
        if !options.is_empty() {
            segments.push(format!("opts:{}", self.options_hash(options)));
        }
        if let Some(q) = question {
            segments.push(format!(
                "q:{}",
                self.algorithm.digest_hex(&[q.as_bytes()])
            ));
        }
        CacheKey(format!("{KEY_PREFIX}{}", segments.join("|")))
    }

    fn text_segment(&self, text: &str) -> String {
        let char_count = text.chars().count();
        if char_count <= self.hash_threshold {
            return text.replace(['|', ':'], "_");
        }
        let word_count = text.split_whitespace().count();
        let length = char_count.to_string();
        let words = word_count.to_string();
        let digest = self.algorithm.digest_hex(&[
            text.as_bytes(),
            b"|len:",
            length.as_bytes(),
            b"|words:",
            words.as_bytes(),
        ]);
        format!("hash:{digest}")
    }

    fn options_hash(&self, options: &Options) -> String {
        let sorted: BTreeMap<&String, &Value> = options.iter().collect();
        // BTreeMap of plain strings and JSON values always serializes.
        let canonical = serde_json::to_vec(&sorted).unwrap_or_default();
        self.algorithm.digest_hex(&[&canonical])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opts(v: Value) -> Options {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn short_text_embedded_with_delimiters_replaced() {
        let key = KeyGenerator::new().generate("a|b:c", "op", &Options::new(), None);
        assert_eq!(key.as_str(), "ai_cache:op:op|a_b_c");
    }

    #[test]
    fn empty_text_yields_empty_segment() {
        let key = KeyGenerator::new().generate("", "op", &Options::new(), None);
        assert_eq!(key.as_str(), "ai_cache:op:op|");
    }

    #[test]
    fn long_text_is_hashed() {
        let text = "word ".repeat(500);
        let key = KeyGenerator::new().generate(&text, "op", &Options::new(), None);
        let segment = key.as_str().rsplit('|').next().unwrap();
        assert!(segment.starts_with("hash:"));
        assert_eq!(segment.len(), "hash:".len() + DIGEST_HEX_LEN);
    }

    #[test]
    fn threshold_is_inclusive_for_embedding() {
        let keys = KeyGenerator::new().hash_threshold(5);
        assert!(
            !keys
                .generate("abcde", "op", &Options::new(), None)
                .as_str()
                .contains("hash:")
        );
        assert!(
            keys.generate("abcdef", "op", &Options::new(), None)
                .as_str()
                .contains("hash:")
        );
    }

    #[test]
    fn options_hashed_not_embedded() {
        let key = KeyGenerator::new().generate(
            "t",
            "op",
            &opts(json!({"api_key": "secret-token"})),
            None,
        );
        assert!(!key.as_str().contains("secret-token"));
        assert!(key.as_str().contains("|opts:"));
    }

    #[test]
    fn algorithms_produce_different_digests() {
        let text = "x".repeat(2_000);
        let a = KeyGenerator::new().generate(&text, "op", &Options::new(), None);
        let b = KeyGenerator::new()
            .algorithm(KeyHashAlgorithm::Sha512)
            .generate(&text, "op", &Options::new(), None);
        assert_ne!(a, b);
    }

    #[test]
    fn question_segment_only_when_present() {
        let keys = KeyGenerator::new();
        let none = keys.generate("t", "qa", &Options::new(), None);
        let empty = keys.generate("t", "qa", &Options::new(), Some(""));
        assert!(!none.as_str().contains("|q:"));
        assert!(empty.as_str().contains("|q:"));
        assert_ne!(none, empty);
    }
}
