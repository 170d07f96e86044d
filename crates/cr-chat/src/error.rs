use cr_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("malformed dialog {dialog} at turn {position}: {reason}")]
    MalformedDialog {
        dialog: usize,
        position: usize,
        reason: String,
    },
    #[error("prompt {dialog} is {len} tokens long, limit is {max}")]
    PromptTooLong { dialog: usize, len: usize, max: usize },
    #[error("batch of {got} exceeds max_batch_size {max}")]
    BatchSizeExceeded { got: usize, max: usize },
    #[error("token id {id} is outside the vocabulary (size {vocab_size})")]
    InvalidTokenId { id: u32, vocab_size: usize },
    #[error("model inference failed: {0}")]
    ModelInference(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("model error: {0}")]
    Model(#[source] ModelError),
}

impl From<ModelError> for ChatError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidTokenId { id, vocab_size } => {
                ChatError::InvalidTokenId { id, vocab_size }
            }
            ModelError::Inference(msg) => ChatError::ModelInference(msg),
            other => ChatError::Model(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
