pub mod bpe;
pub mod vocab;

pub use bpe::BpeTokenizer;
pub use vocab::Vocab;

/// Text <-> token id conversion used by the chat engine.
///
/// Implementations are shared read-only across concurrent completion calls.
pub trait Tokenizer: Send + Sync {
    /// Encode text into token ids. Never inserts BOS/EOS.
    fn encode(&self, text: &str) -> Vec<u32>;

    /// Decode token ids back into text. BOS and EOS decode to nothing.
    ///
    /// # Errors
    /// Returns `ModelError::InvalidTokenId` for ids outside the vocabulary.
    fn decode(&self, ids: &[u32]) -> crate::Result<String>;

    /// Beginning-of-sequence token id.
    fn bos_id(&self) -> u32;

    /// End-of-sequence token id.
    fn eos_id(&self) -> u32;

    /// Number of tokens in the vocabulary.
    fn vocab_size(&self) -> usize;
}
