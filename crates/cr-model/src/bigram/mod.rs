use crate::architecture::{ModelArchitecture, StepBatch};
use crate::checkpoint::Checkpoint;
use crate::error::{ModelError, Result};

/// A bigram language model: the logits for the next token depend only on
/// the token at the previous position.
///
/// The weight table is `[vocab_size, vocab_size]` row-major; row `t` holds
/// the next-token logits after token `t`.
pub struct BigramModel {
    table: Vec<f32>,
    vocab_size: usize,
    max_seq_len: usize,
    /// Number of positions consumed since the last reset.
    pos: usize,
}

impl BigramModel {
    /// Build a model from an in-memory logit table.
    pub fn new(table: Vec<f32>, vocab_size: usize, max_seq_len: usize) -> Result<BigramModel> {
        if vocab_size == 0 || table.len() != vocab_size * vocab_size {
            return Err(ModelError::InvalidCheckpoint(format!(
                "table of {} values is not a {}x{} matrix",
                table.len(),
                vocab_size,
                vocab_size
            )));
        }
        Ok(BigramModel {
            table,
            vocab_size,
            max_seq_len,
            pos: 0,
        })
    }

    /// Load the model from an opened checkpoint.
    pub fn from_checkpoint(ckpt: &Checkpoint) -> Result<BigramModel> {
        BigramModel::new(
            ckpt.weights_f32(),
            ckpt.params.vocab_size,
            ckpt.params.max_seq_len,
        )
    }

    fn next_logits(&self, token: u32) -> Result<&[f32]> {
        let t = token as usize;
        if t >= self.vocab_size {
            return Err(ModelError::Inference(format!(
                "token id {} exceeds vocab size {}",
                token, self.vocab_size
            )));
        }
        Ok(&self.table[t * self.vocab_size..(t + 1) * self.vocab_size])
    }
}

impl ModelArchitecture for BigramModel {
    fn forward(&mut self, batch: &StepBatch<'_>) -> Result<Vec<f32>> {
        if batch.n_cols == 0 {
            return Err(ModelError::Inference("no tokens to process".to_string()));
        }
        if batch.start_pos != self.pos {
            return Err(ModelError::Inference(format!(
                "window starts at position {} but {} positions were consumed",
                batch.start_pos, self.pos
            )));
        }
        if batch.end_pos() > self.max_seq_len {
            return Err(ModelError::Inference(format!(
                "position {} exceeds context length {}",
                batch.end_pos(),
                self.max_seq_len
            )));
        }

        let mut logits = vec![0.0f32; batch.n_rows * self.vocab_size];
        for (i, out) in logits.chunks_exact_mut(self.vocab_size).enumerate() {
            if !batch.active[i] {
                continue;
            }
            let last = batch.row(i)[batch.n_cols - 1];
            out.copy_from_slice(self.next_logits(last)?);
        }

        self.pos = batch.end_pos();
        Ok(logits)
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    fn reset_cache(&mut self) {
        self.pos = 0;
    }
}
