use cr_model::Tokenizer;

use crate::batch::RowOutput;
use crate::dialog::Turn;
use crate::error::Result;
use crate::template::UNSAFE_ERROR;

/// Decoded token pieces with their log-probabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenLogprobs {
    pub tokens: Vec<String>,
    pub logprobs: Vec<f32>,
}

/// The reply to one dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrediction {
    /// Always an assistant turn.
    pub generation: Turn,
    pub logprobs: Option<TokenLogprobs>,
}

impl ChatPrediction {
    /// Fixed reply for dialogs that contain template delimiters.
    pub fn rejected() -> Self {
        ChatPrediction {
            generation: Turn::assistant(UNSAFE_ERROR),
            logprobs: None,
        }
    }
}

/// The continuation of one text prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionPrediction {
    pub generation: String,
    pub logprobs: Option<TokenLogprobs>,
}

/// Turns decoded rows back into text results.
pub struct ResultAssembler<'a, T: Tokenizer + ?Sized> {
    tokenizer: &'a T,
}

impl<'a, T: Tokenizer + ?Sized> ResultAssembler<'a, T> {
    pub fn new(tokenizer: &'a T) -> Self {
        Self { tokenizer }
    }

    pub fn chat(&self, output: &RowOutput) -> Result<ChatPrediction> {
        Ok(ChatPrediction {
            generation: Turn::assistant(self.tokenizer.decode(&output.tokens)?),
            logprobs: self.logprobs(output)?,
        })
    }

    /// `echo` carries the prompt tokens to prepend to the text.
    pub fn completion(&self, echo: Option<&[u32]>, output: &RowOutput) -> Result<CompletionPrediction> {
        let generation = match echo {
            Some(prompt) => {
                let mut ids = prompt.to_vec();
                ids.extend_from_slice(&output.tokens);
                self.tokenizer.decode(&ids)?
            }
            None => self.tokenizer.decode(&output.tokens)?,
        };
        Ok(CompletionPrediction {
            generation,
            logprobs: self.logprobs(output)?,
        })
    }

    fn logprobs(&self, output: &RowOutput) -> Result<Option<TokenLogprobs>> {
        let Some(logprobs) = &output.logprobs else {
            return Ok(None);
        };
        let tokens = output
            .tokens
            .iter()
            .map(|&t| self.tokenizer.decode(&[t]))
            .collect::<cr_model::Result<Vec<_>>>()?;
        Ok(Some(TokenLogprobs {
            tokens,
            logprobs: logprobs.clone(),
        }))
    }
}
