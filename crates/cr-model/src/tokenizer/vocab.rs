use std::collections::HashMap;

use crate::error::{ModelError, Result};

/// Token vocabulary: token strings indexed by id plus the special ids.
pub struct Vocab {
    /// Token strings, indexed by token ID.
    pub tokens: Vec<String>,
    /// Merge priority scores, indexed by token ID.
    pub scores: Vec<f32>,
    /// Reverse mapping from token string to token ID.
    pub token_to_id: HashMap<String, u32>,
    /// Beginning-of-sequence token ID.
    pub bos_id: u32,
    /// End-of-sequence token ID.
    pub eos_id: u32,
    /// Substituted for text that no token or byte token can represent.
    pub unk_id: u32,
}

impl Vocab {
    /// Build a vocabulary from its parts.
    ///
    /// `scores` may be empty, in which case every token scores 0. The unknown
    /// token is `<unk>` when present, otherwise id 0.
    pub fn new(tokens: Vec<String>, scores: Vec<f32>, bos_id: u32, eos_id: u32) -> Result<Vocab> {
        if tokens.is_empty() {
            return Err(ModelError::TokenizerError("vocabulary is empty".to_string()));
        }

        let scores = if scores.is_empty() {
            vec![0.0; tokens.len()]
        } else {
            scores
        };
        if tokens.len() != scores.len() {
            return Err(ModelError::TokenizerError(format!(
                "tokens length ({}) does not match scores length ({})",
                tokens.len(),
                scores.len()
            )));
        }

        for (name, id) in [("bos", bos_id), ("eos", eos_id)] {
            if id as usize >= tokens.len() {
                return Err(ModelError::TokenizerError(format!(
                    "{} id {} is outside the vocabulary (size {})",
                    name,
                    id,
                    tokens.len()
                )));
            }
        }

        let mut token_to_id = HashMap::with_capacity(tokens.len());
        for (id, tok) in tokens.iter().enumerate() {
            // First occurrence wins for duplicated strings.
            token_to_id.entry(tok.clone()).or_insert(id as u32);
        }
        let unk_id = token_to_id.get("<unk>").copied().unwrap_or(0);

        Ok(Vocab {
            tokens,
            scores,
            token_to_id,
            bos_id,
            eos_id,
            unk_id,
        })
    }

    /// Number of tokens in the vocabulary.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Look up a token string.
    pub fn id(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    /// Whether `id` is BOS or EOS.
    pub fn is_control(&self, id: u32) -> bool {
        id == self.bos_id || id == self.eos_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_new_vocab() {
        let vocab = Vocab::new(strings(&["<unk>", "<s>", "</s>", "a"]), vec![], 1, 2).unwrap();
        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.id("a"), Some(3));
        assert_eq!(vocab.unk_id, 0);
        assert_eq!(vocab.scores, vec![0.0; 4]);
        assert!(vocab.is_control(1));
        assert!(vocab.is_control(2));
        assert!(!vocab.is_control(3));
    }

    #[test]
    fn test_scores_length_mismatch() {
        let err = Vocab::new(strings(&["<s>", "</s>"]), vec![0.0], 0, 1);
        assert!(err.is_err());
    }

    #[test]
    fn test_special_id_out_of_range() {
        assert!(Vocab::new(strings(&["<s>", "</s>"]), vec![], 0, 2).is_err());
        assert!(Vocab::new(vec![], vec![], 0, 0).is_err());
    }

    #[test]
    fn test_duplicate_token_keeps_first_id() {
        let vocab = Vocab::new(strings(&["<s>", "</s>", "x", "x"]), vec![], 0, 1).unwrap();
        assert_eq!(vocab.id("x"), Some(2));
    }
}
