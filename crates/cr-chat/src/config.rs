use crate::error::{ChatError, Result};

/// Settings fixed when a generator is built.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Token budget per row: prompt plus generation.
    pub max_seq_len: usize,
    /// Rows per completion call.
    pub max_batch_size: usize,
    /// Seed for nucleus sampling. Call `n` of a generator samples with `seed + n`.
    pub seed: u64,
    /// Extra ids that end a reply, in addition to EOS.
    pub stop_tokens: Vec<u32>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_seq_len: 512,
            max_batch_size: 8,
            seed: 1,
            stop_tokens: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_seq_len == 0 {
            return Err(ChatError::InvalidConfig("max_seq_len must be positive".to_string()));
        }
        if self.max_batch_size == 0 {
            return Err(ChatError::InvalidConfig(
                "max_batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-call generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Generated tokens per row. `None` fills the remaining context.
    pub max_gen_len: Option<usize>,
    /// 0 selects greedy decoding.
    pub temperature: f32,
    /// Nucleus mass threshold, in `(0, 1]`.
    pub top_p: f32,
    /// Return per-token log-probabilities with each result.
    pub logprobs: bool,
    /// Text completion only: prepend the prompt to the returned text.
    pub echo: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_gen_len: None,
            temperature: 0.6,
            top_p: 0.9,
            logprobs: false,
            echo: false,
        }
    }
}

impl GenerationParams {
    /// Greedy decoding of at most `max_gen_len` tokens.
    pub fn greedy(max_gen_len: usize) -> Self {
        Self {
            max_gen_len: Some(max_gen_len),
            temperature: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(ChatError::InvalidConfig(format!(
                "temperature must be finite and >= 0, got {}",
                self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(ChatError::InvalidConfig(format!(
                "top_p must be in (0, 1], got {}",
                self.top_p
            )));
        }
        Ok(())
    }
}
