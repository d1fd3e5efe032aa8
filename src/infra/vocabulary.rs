// ============================================================
// Layer 6 — Vocabulary
// ============================================================
// Loads a vocabulary file and exposes token <-> id lookups.
//
// File format: one token per line; the 0-based line number is
// the token's id. The first lines are the reserved tokens:
//
//   _PAD   0
//   _GO    1
//   _EOS   2
//   _UNK   3
//   ...
//
// Forward lookups (sentence → ids) run through a HuggingFace
// word-level tokenizer built in memory: we write the tokenizer
// JSON directly and parse it back, the same trick used to avoid
// the trainer API entirely. Reverse lookups (id → token) index
// the token list so an out-of-range id is reported, not clamped.

use std::path::Path;
use std::str::FromStr;

use tokenizers::Tokenizer;

use crate::domain::error::{TranslateError, TranslateResult};
use crate::domain::tokens::UNK_TOKEN;

pub struct Vocabulary {
    tokenizer:        Tokenizer,
    tokens:           Vec<String>,
    normalize_digits: bool,
}

impl Vocabulary {
    /// Read a vocabulary file, one token per line.
    pub fn load(path: &Path, normalize_digits: bool) -> TranslateResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TranslateError::vocabulary(format!("cannot read '{}': {e}", path.display()))
        })?;
        let tokens: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
        let vocab = Self::from_tokens(tokens, normalize_digits)?;
        tracing::info!("Loaded {} tokens from '{}'", vocab.len(), path.display());
        Ok(vocab)
    }

    /// Build from an in-memory token list (index = id).
    pub fn from_tokens(tokens: Vec<String>, normalize_digits: bool) -> TranslateResult<Self> {
        let mut vocab = serde_json::Map::with_capacity(tokens.len());
        for (id, token) in tokens.iter().enumerate() {
            if vocab.insert(token.clone(), serde_json::json!(id)).is_some() {
                return Err(TranslateError::vocabulary(format!(
                    "token '{token}' appears twice (second time at id {id})"
                )));
            }
        }
        if !vocab.contains_key(UNK_TOKEN) {
            return Err(TranslateError::vocabulary(format!(
                "vocabulary has no '{UNK_TOKEN}' token"
            )));
        }

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": { "type": "WhitespaceSplit" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": UNK_TOKEN
            }
        });

        let tokenizer = Tokenizer::from_str(&tokenizer_json.to_string())
            .map_err(|e| TranslateError::vocabulary(format!("cannot build tokenizer: {e}")))?;

        Ok(Self { tokenizer, tokens, normalize_digits })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        self.tokenizer.token_to_id(token)
    }

    /// Reverse lookup; an id past the end of the file is fatal.
    pub fn id_to_token(&self, id: u32) -> TranslateResult<&str> {
        self.tokens
            .get(id as usize)
            .map(String::as_str)
            .ok_or(TranslateError::VocabularyLookup { id, size: self.tokens.len() })
    }

    /// Whitespace-split `sentence` and map every word to its id.
    /// Unknown words map to the `_UNK` id; digits become `0` first
    /// when digit normalisation is on.
    pub fn sentence_to_token_ids(&self, sentence: &str) -> TranslateResult<Vec<u32>> {
        let normalized;
        let text = if self.normalize_digits {
            normalized = sentence
                .chars()
                .map(|c| if c.is_ascii_digit() { '0' } else { c })
                .collect::<String>();
            normalized.as_str()
        } else {
            sentence
        };

        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| TranslateError::vocabulary(format!("tokenise '{sentence}': {e}")))?;
        Ok(encoding.get_ids().to_vec())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tokens::UNK_ID;

    fn vocab(words: &[&str]) -> Vocabulary {
        let mut tokens: Vec<String> = ["_PAD", "_GO", "_EOS", "_UNK"].iter().map(|s| s.to_string()).collect();
        tokens.extend(words.iter().map(|s| s.to_string()));
        Vocabulary::from_tokens(tokens, true).unwrap()
    }

    #[test]
    fn test_round_trip_every_id() {
        let v = vocab(&["_BOS", "hello", "world", "0"]);
        for id in 0..v.len() as u32 {
            let token = v.id_to_token(id).unwrap();
            assert_eq!(v.token_to_id(token), Some(id));
        }
    }

    #[test]
    fn test_unknown_words_map_to_unk() {
        let v = vocab(&["_BOS", "hello"]);
        let ids = v.sentence_to_token_ids("_BOS hello nowhere").unwrap();
        assert_eq!(ids, vec![4, 5, UNK_ID]);
    }

    #[test]
    fn test_digits_are_normalised() {
        let v = vocab(&["000"]);
        assert_eq!(v.sentence_to_token_ids("123").unwrap(), vec![4]);
    }

    #[test]
    fn test_out_of_range_id_is_an_error() {
        let v = vocab(&["a"]);
        assert!(matches!(
            v.id_to_token(99),
            Err(TranslateError::VocabularyLookup { id: 99, size: 5 })
        ));
    }

    #[test]
    fn test_rejects_missing_unk_and_duplicates() {
        assert!(Vocabulary::from_tokens(vec!["a".into(), "b".into()], false).is_err());
        assert!(Vocabulary::from_tokens(vec!["_UNK".into(), "a".into(), "a".into()], false).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("vocab6.tgt");
        std::fs::write(&path, "_PAD\n_GO\n_EOS\n_UNK\nle\nchat\n").unwrap();
        let v = Vocabulary::load(&path, false).unwrap();
        assert_eq!(v.len(), 6);
        assert_eq!(v.id_to_token(5).unwrap(), "chat");
    }
}
