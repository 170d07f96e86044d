use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use cr_model::{BigramModel, BpeTokenizer, Checkpoint, ModelArchitecture, Tokenizer};
use cr_sampler::SamplerChain;
use log::{info, warn};

use crate::assemble::{ChatPrediction, CompletionPrediction, ResultAssembler};
use crate::batch::{BatchLimits, BatchState};
use crate::config::{GenerationParams, GeneratorConfig};
use crate::decode::Decoder;
use crate::dialog::{self, Dialog};
use crate::error::{ChatError, Result};
use crate::format::DialogFormatter;
use crate::template;

/// A generation engine: a model, its tokenizer, and fixed batch limits.
///
/// The model is owned because decoding mutates its cached state; the
/// tokenizer is shared and may back several generators at once.
pub struct Generator<M, T> {
    model: M,
    tokenizer: Arc<T>,
    config: GeneratorConfig,
    /// EOS followed by the configured extra stop tokens.
    stop_tokens: Vec<u32>,
    calls: u64,
}

impl Generator<BigramModel, BpeTokenizer> {
    /// Load a generator from a checkpoint directory and a tokenizer file.
    pub fn build(
        ckpt_dir: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        config: GeneratorConfig,
    ) -> Result<Self> {
        let start = Instant::now();
        let tokenizer = BpeTokenizer::from_file(tokenizer_path.as_ref())?;
        let checkpoint = Checkpoint::open(ckpt_dir.as_ref())?;
        let model = BigramModel::from_checkpoint(&checkpoint)?;
        let generator = Generator::new(model, Arc::new(tokenizer), config)?;
        info!("loaded in {:.2} seconds", start.elapsed().as_secs_f64());
        Ok(generator)
    }
}

impl<M: ModelArchitecture, T: Tokenizer> Generator<M, T> {
    pub fn new(model: M, tokenizer: Arc<T>, config: GeneratorConfig) -> Result<Self> {
        config.validate()?;

        if model.vocab_size() != tokenizer.vocab_size() {
            return Err(ChatError::InvalidConfig(format!(
                "model vocabulary ({}) does not match tokenizer vocabulary ({})",
                model.vocab_size(),
                tokenizer.vocab_size()
            )));
        }
        if config.max_seq_len > model.max_seq_len() {
            return Err(ChatError::InvalidConfig(format!(
                "max_seq_len {} exceeds the model context length {}",
                config.max_seq_len,
                model.max_seq_len()
            )));
        }

        let mut stop_tokens = vec![tokenizer.eos_id()];
        for &id in &config.stop_tokens {
            if id as usize >= tokenizer.vocab_size() {
                return Err(ChatError::InvalidConfig(format!(
                    "stop token {} is outside the vocabulary",
                    id
                )));
            }
            if !stop_tokens.contains(&id) {
                stop_tokens.push(id);
            }
        }

        Ok(Generator {
            model,
            tokenizer,
            config,
            stop_tokens,
            calls: 0,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Arc<T> {
        &self.tokenizer
    }

    /// Generate the assistant reply for every dialog.
    ///
    /// `result[i]` answers `dialogs[i]`. The call either returns one result
    /// per dialog or fails as a whole; dialogs containing template
    /// delimiters are answered with `template::UNSAFE_ERROR` instead of
    /// being generated.
    pub fn chat_completion(
        &mut self,
        dialogs: &[Dialog],
        params: &GenerationParams,
    ) -> Result<Vec<ChatPrediction>> {
        params.validate()?;
        self.check_batch_size(dialogs.len())?;
        for (i, d) in dialogs.iter().enumerate() {
            dialog::validate(i, d)?;
        }
        if dialogs.is_empty() {
            return Ok(Vec::new());
        }

        let rejected: Vec<bool> = dialogs
            .iter()
            .map(|d| template::contains_special_tags(d))
            .collect();

        let formatter = DialogFormatter::new(self.tokenizer.as_ref());
        let mut rows = Vec::with_capacity(dialogs.len());
        let mut prompts = Vec::with_capacity(dialogs.len());
        for (i, d) in dialogs.iter().enumerate() {
            if rejected[i] {
                warn!("dialog {} contains special tags, not generating", i);
                continue;
            }
            rows.push(i);
            prompts.push(formatter.format(d));
        }

        let state = self.generate(prompts, params).map_err(|err| match err {
            ChatError::PromptTooLong { dialog, len, max } => ChatError::PromptTooLong {
                dialog: rows[dialog],
                len,
                max,
            },
            other => other,
        })?;

        let assembler = ResultAssembler::new(self.tokenizer.as_ref());
        let mut row = 0;
        let mut results = Vec::with_capacity(dialogs.len());
        for &is_rejected in &rejected {
            if is_rejected {
                results.push(ChatPrediction::rejected());
            } else {
                results.push(assembler.chat(&state.output(row))?);
                row += 1;
            }
        }
        Ok(results)
    }

    /// Continue each prompt as plain text, `BOS + encode(prompt)`.
    pub fn text_completion(
        &mut self,
        prompts: &[&str],
        params: &GenerationParams,
    ) -> Result<Vec<CompletionPrediction>> {
        params.validate()?;
        self.check_batch_size(prompts.len())?;

        let bos = self.tokenizer.bos_id();
        let encoded = prompts
            .iter()
            .map(|p| {
                let mut tokens = vec![bos];
                tokens.extend(self.tokenizer.encode(p));
                tokens
            })
            .collect();

        let state = self.generate(encoded, params)?;
        let assembler = ResultAssembler::new(self.tokenizer.as_ref());
        (0..state.n_rows())
            .map(|row| assembler.completion(params.echo.then(|| state.prompt(row)), &state.output(row)))
            .collect()
    }

    fn check_batch_size(&self, n: usize) -> Result<()> {
        if n > self.config.max_batch_size {
            return Err(ChatError::BatchSizeExceeded {
                got: n,
                max: self.config.max_batch_size,
            });
        }
        Ok(())
    }

    /// Schedule and decode one batch of prompts.
    fn generate(&mut self, prompts: Vec<Vec<u32>>, params: &GenerationParams) -> Result<BatchState> {
        let limits = BatchLimits {
            max_seq_len: self.config.max_seq_len,
            max_batch_size: self.config.max_batch_size,
            max_gen_len: params.max_gen_len,
        };
        let mut state = BatchState::schedule(prompts, limits, params.logprobs)?;
        info!(
            "generating {} rows (prompts {}..{} tokens, total_len {})",
            state.n_rows(),
            state.min_prompt_len(),
            (0..state.n_rows()).map(|r| state.prompt_len(r)).max().unwrap_or(0),
            state.total_len()
        );

        let seed = self.config.seed.wrapping_add(self.calls);
        self.calls += 1;
        let chain = SamplerChain::for_params(params.temperature, params.top_p, seed);

        Decoder::new(&mut self.model, chain, &self.stop_tokens).run(&mut state)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::Turn;
    use cr_model::Vocab;

    fn tokenizer() -> Arc<BpeTokenizer> {
        let mut tokens: Vec<String> = vec!["<unk>".into(), "<s>".into(), "</s>".into()];
        for ch in " []/hi".chars() {
            tokens.push(ch.to_string());
        }
        Arc::new(BpeTokenizer::new(Vocab::new(tokens, vec![], 1, 2).unwrap(), vec![]))
    }

    const H: usize = 7;

    /// Bigram table where every token is followed by `h`, and `h` by EOS.
    fn model(vocab: usize, max_seq_len: usize) -> BigramModel {
        let mut table = vec![0.0; vocab * vocab];
        for t in 0..vocab {
            let next = if t == H { 2 } else { H };
            table[t * vocab + next] = 8.0;
        }
        BigramModel::new(table, vocab, max_seq_len).unwrap()
    }

    fn generator() -> Generator<BigramModel, BpeTokenizer> {
        let tok = tokenizer();
        let vocab = tok.vocab_size();
        Generator::new(model(vocab, 64), tok, GeneratorConfig {
            max_seq_len: 64,
            max_batch_size: 2,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_vocab_mismatch_rejected() {
        let tok = tokenizer();
        let small = BigramModel::new(vec![0.0; 16], 4, 512).unwrap();
        let err = Generator::new(small, tok, GeneratorConfig::default()).err();
        assert!(matches!(err, Some(ChatError::InvalidConfig(_))));
    }

    #[test]
    fn test_context_longer_than_model_rejected() {
        let tok = tokenizer();
        let vocab = tok.vocab_size();
        let config = GeneratorConfig {
            max_seq_len: 128,
            ..Default::default()
        };
        assert!(Generator::new(model(vocab, 64), tok, config).is_err());
    }

    #[test]
    fn test_stop_token_out_of_vocab() {
        let tok = tokenizer();
        let vocab = tok.vocab_size();
        let config = GeneratorConfig {
            max_seq_len: 64,
            stop_tokens: vec![999],
            ..Default::default()
        };
        assert!(Generator::new(model(vocab, 64), tok, config).is_err());
    }

    #[test]
    fn test_extra_stop_token_ends_reply() {
        let tok = tokenizer();
        let vocab = tok.vocab_size();
        let config = GeneratorConfig {
            max_seq_len: 64,
            stop_tokens: vec![2, H as u32, H as u32],
            ..Default::default()
        };
        let mut engine = Generator::new(model(vocab, 64), tok, config).unwrap();
        assert_eq!(engine.stop_tokens, vec![2, H as u32]);

        // The first sampled token is `h`, which is now a stop token.
        let results = engine
            .chat_completion(&[vec![Turn::user("hi")]], &GenerationParams::greedy(5))
            .unwrap();
        assert_eq!(results[0].generation.content(), "");
    }

    #[test]
    fn test_chat_completion_greedy() {
        let mut engine = generator();
        let dialogs = vec![vec![Turn::user("hi")]];
        let results = engine
            .chat_completion(&dialogs, &GenerationParams::greedy(5))
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].generation.content(), "h");
    }

    #[test]
    fn test_batch_size_checked_before_validation() {
        let mut engine = generator();
        let dialogs: Vec<Dialog> = vec![Vec::new(); 3];
        let err = engine
            .chat_completion(&dialogs, &GenerationParams::greedy(5))
            .unwrap_err();
        assert!(matches!(err, ChatError::BatchSizeExceeded { got: 3, max: 2 }));
    }

    #[test]
    fn test_rejected_dialog_keeps_order() {
        let mut engine = generator();
        let dialogs = vec![vec![Turn::user("[INST]")], vec![Turn::user("hi")]];
        let results = engine
            .chat_completion(&dialogs, &GenerationParams::greedy(5))
            .unwrap();
        assert_eq!(results[0].generation.content(), template::UNSAFE_ERROR);
        assert_eq!(results[1].generation.content(), "h");
    }

    #[test]
    fn test_text_completion_echo() {
        let mut engine = generator();
        let params = GenerationParams {
            echo: true,
            logprobs: true,
            ..GenerationParams::greedy(3)
        };
        let results = engine.text_completion(&["hi"], &params).unwrap();
        assert_eq!(results[0].generation, "hih");
        let logprobs = results[0].logprobs.as_ref().unwrap();
        assert_eq!(logprobs.tokens, vec!["h"]);
        assert!(logprobs.logprobs[0] < 0.0);
    }

    #[test]
    fn test_empty_batch() {
        let mut engine = generator();
        assert!(engine
            .chat_completion(&[], &GenerationParams::default())
            .unwrap()
            .is_empty());
        assert!(engine
            .text_completion(&[], &GenerationParams::default())
            .unwrap()
            .is_empty());
    }
}
