pub mod architecture;
pub mod bigram;
pub mod checkpoint;
pub mod error;
pub mod tokenizer;

pub use architecture::{ModelArchitecture, StepBatch};
pub use bigram::BigramModel;
pub use checkpoint::{Checkpoint, CheckpointParams, WeightDType};
pub use error::{ModelError, Result};
pub use tokenizer::{BpeTokenizer, Tokenizer, Vocab};
