use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::vocab::Vocab;
use super::Tokenizer;
use crate::error::{ModelError, Result};

/// On-disk tokenizer description (JSON).
#[derive(Deserialize, Debug)]
struct TokenizerFile {
    tokens: Vec<String>,
    #[serde(default)]
    scores: Vec<f32>,
    /// Each entry is "left right", split on the first space.
    #[serde(default)]
    merges: Vec<String>,
    bos_id: u32,
    eos_id: u32,
}

/// Byte-Pair Encoding tokenizer.
pub struct BpeTokenizer {
    /// The token vocabulary (strings, scores, special token IDs).
    pub vocab: Vocab,
    /// Map from merge pair to priority rank (lower rank = higher priority).
    merge_ranks: HashMap<(String, String), usize>,
}

impl BpeTokenizer {
    /// Build a tokenizer from a vocabulary and ordered merge rules.
    pub fn new(vocab: Vocab, merges: Vec<(String, String)>) -> BpeTokenizer {
        let merge_ranks = merges
            .into_iter()
            .enumerate()
            .map(|(rank, pair)| (pair, rank))
            .collect();
        BpeTokenizer { vocab, merge_ranks }
    }

    /// Load a tokenizer from a JSON file with `tokens`, `scores`, `merges`,
    /// `bos_id` and `eos_id` fields.
    pub fn from_file(path: &Path) -> Result<BpeTokenizer> {
        let text = std::fs::read_to_string(path)?;
        let file: TokenizerFile = serde_json::from_str(&text)?;

        let mut merges = Vec::with_capacity(file.merges.len());
        for entry in &file.merges {
            let (left, right) = entry.split_once(' ').ok_or_else(|| {
                ModelError::TokenizerError(format!("invalid merge entry: {:?}", entry))
            })?;
            merges.push((left.to_string(), right.to_string()));
        }

        let vocab = Vocab::new(file.tokens, file.scores, file.bos_id, file.eos_id)?;
        log::debug!(
            "loaded tokenizer from {}: {} tokens, {} merges",
            path.display(),
            vocab.len(),
            merges.len()
        );
        Ok(BpeTokenizer::new(vocab, merges))
    }

    /// Split text into initial pieces: whole characters when the vocabulary
    /// has them, `<0xHH>` byte tokens for the UTF-8 bytes otherwise.
    fn initial_pieces(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::with_capacity(text.len());
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            let ch_str: &str = ch.encode_utf8(&mut buf);
            if self.vocab.token_to_id.contains_key(ch_str) {
                pieces.push(ch_str.to_string());
            } else {
                pieces.extend(ch_str.bytes().map(|b| format!("<0x{:02X}>", b)));
            }
        }
        pieces
    }
}

impl Tokenizer for BpeTokenizer {
    /// Encode text by applying the highest-priority merge until none applies.
    fn encode(&self, text: &str) -> Vec<u32> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut pieces = self.initial_pieces(text);

        while pieces.len() >= 2 {
            let mut best_rank = usize::MAX;
            let mut best_idx = usize::MAX;

            for i in 0..pieces.len() - 1 {
                let pair = (pieces[i].clone(), pieces[i + 1].clone());
                if let Some(&rank) = self.merge_ranks.get(&pair) {
                    if rank < best_rank {
                        best_rank = rank;
                        best_idx = i;
                    }
                }
            }

            if best_idx == usize::MAX {
                break;
            }

            let right = pieces.remove(best_idx + 1);
            pieces[best_idx].push_str(&right);
        }

        pieces
            .iter()
            .map(|piece| self.vocab.id(piece).unwrap_or(self.vocab.unk_id))
            .collect()
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        let mut bytes: Vec<u8> = Vec::new();

        for &id in ids {
            let tok = self
                .vocab
                .tokens
                .get(id as usize)
                .ok_or(ModelError::InvalidTokenId {
                    id,
                    vocab_size: self.vocab.len(),
                })?;
            if self.vocab.is_control(id) {
                continue;
            }

            match byte_token(tok) {
                Some(byte) => bytes.push(byte),
                None => bytes.extend_from_slice(tok.as_bytes()),
            }
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn bos_id(&self) -> u32 {
        self.vocab.bos_id
    }

    fn eos_id(&self) -> u32 {
        self.vocab.eos_id
    }

    fn vocab_size(&self) -> usize {
        self.vocab.len()
    }
}

/// Parse a `<0xHH>` byte token.
fn byte_token(tok: &str) -> Option<u8> {
    let hex = tok.strip_prefix("<0x")?.strip_suffix('>')?;
    if hex.len() != 2 {
        return None;
    }
    u8::from_str_radix(hex, 16).ok()
}
