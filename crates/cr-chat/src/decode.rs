use cr_model::{ModelArchitecture, StepBatch};
use cr_sampler::{log_softmax_at, SamplerChain};
use log::{debug, trace};

use crate::batch::{BatchState, RowState};
use crate::error::{ChatError, Result};

/// Runs the lock-step generation loop over a scheduled batch.
pub struct Decoder<'a, M: ModelArchitecture + ?Sized> {
    model: &'a mut M,
    chain: SamplerChain,
    /// Tokens that finish a row when generated. Always contains EOS.
    stop_tokens: &'a [u32],
}

impl<'a, M: ModelArchitecture + ?Sized> Decoder<'a, M> {
    pub fn new(model: &'a mut M, chain: SamplerChain, stop_tokens: &'a [u32]) -> Self {
        Self {
            model,
            chain,
            stop_tokens,
        }
    }

    /// Decode until every row finished or the grid is full.
    ///
    /// Every step feeds the model the columns written since the previous
    /// step, so the first step covers the shortest prompt and later steps
    /// one column each. Rows whose prompt still covers the current column
    /// keep their prompt token; other pending rows get a sampled token.
    ///
    /// # Errors
    /// `ModelInference` when the model fails or returns malformed or
    /// non-finite logits for a pending row. The batch is abandoned.
    pub fn run(&mut self, state: &mut BatchState) -> Result<()> {
        self.model.reset_cache();

        let vocab_size = self.model.vocab_size();
        let record_logprobs = state.records_logprobs();
        let mut prev_pos = 0;
        let mut steps = 0usize;

        for cur in state.min_prompt_len()..state.total_len() {
            if state.all_finished() {
                break;
            }

            let active = state.active_mask();
            let window = state.window(prev_pos, cur);
            let batch = StepBatch {
                tokens: &window,
                n_rows: state.n_rows(),
                n_cols: cur - prev_pos,
                start_pos: prev_pos,
                active: &active,
            };
            let logits = self.model.forward(&batch)?;
            if logits.len() != state.n_rows() * vocab_size {
                return Err(ChatError::ModelInference(format!(
                    "expected {} logits for {} rows, got {}",
                    state.n_rows() * vocab_size,
                    state.n_rows(),
                    logits.len()
                )));
            }

            for (row, row_logits) in logits.chunks_exact(vocab_size).enumerate() {
                if state.state(row) == RowState::Finished {
                    continue;
                }
                if row_logits.iter().any(|l| !l.is_finite()) {
                    return Err(ChatError::ModelInference(format!(
                        "non-finite logits for row {} at position {}",
                        row, cur
                    )));
                }

                if state.is_prompt(row, cur) {
                    if record_logprobs {
                        let token = state.token(row, cur);
                        state.record_logprob(row, cur, log_softmax_at(row_logits, token as usize));
                    }
                    state.keep(row, cur);
                    continue;
                }

                let token = self.chain.sample(row_logits).ok_or_else(|| {
                    ChatError::ModelInference("model returned an empty vocabulary".to_string())
                })?;
                if record_logprobs {
                    state.record_logprob(row, cur, log_softmax_at(row_logits, token as usize));
                }
                state.write(row, cur, token, self.stop_tokens.contains(&token));
            }

            trace!("decode step at position {} done", cur);
            prev_pos = cur;
            steps += 1;
        }

        debug!(
            "decoded {} rows in {} steps (total_len {})",
            state.n_rows(),
            steps,
            state.total_len()
        );
        Ok(())
    }
}
