use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid checkpoint: {0}")]
    InvalidCheckpoint(String),
    #[error("tokenizer error: {0}")]
    TokenizerError(String),
    #[error("token id {id} is outside the vocabulary (size {vocab_size})")]
    InvalidTokenId { id: u32, vocab_size: usize },
    #[error("inference failed: {0}")]
    Inference(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
