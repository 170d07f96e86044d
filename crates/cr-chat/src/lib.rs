//! `cr-chat` - batched multi-turn chat generation.
//!
//! Dialogs flow through the crate in this order:
//! - `dialog::validate` checks turn alternation
//! - `DialogFormatter` renders each dialog into one prompt (see `template`)
//! - `BatchState::schedule` lays prompts out in a padded token grid
//! - `Decoder` runs the lock-step sampling loop against a `ModelArchitecture`
//! - `ResultAssembler` decodes each row back into an assistant turn
//!
//! `Generator` ties these together behind `chat_completion` and
//! `text_completion`.

pub mod assemble;
pub mod batch;
pub mod config;
pub mod decode;
pub mod dialog;
pub mod error;
pub mod format;
pub mod generator;
pub mod template;

pub use assemble::{ChatPrediction, CompletionPrediction, ResultAssembler, TokenLogprobs};
pub use batch::{BatchLimits, BatchState, RowOutput, RowState, PAD_ID};
pub use config::{GenerationParams, GeneratorConfig};
pub use decode::Decoder;
pub use dialog::{Dialog, Role, Turn};
pub use error::{ChatError, Result};
pub use format::DialogFormatter;
pub use generator::Generator;
