/// The slice of the token workspace handed to the model for one decoding step.
///
/// `tokens` is a row-major `[n_rows, n_cols]` window holding positions
/// `start_pos..start_pos + n_cols` of every row in the batch. The first step
/// of a call covers the shared prompt prefix; every later step is one column.
#[derive(Debug, Clone, Copy)]
pub struct StepBatch<'a> {
    pub tokens: &'a [u32],
    pub n_rows: usize,
    pub n_cols: usize,
    pub start_pos: usize,
    /// `false` for rows that already finished. Their window may contain
    /// padding and the logits returned for them are ignored.
    pub active: &'a [bool],
}

impl<'a> StepBatch<'a> {
    /// Token ids of row `i` within the window.
    pub fn row(&self, i: usize) -> &'a [u32] {
        &self.tokens[i * self.n_cols..(i + 1) * self.n_cols]
    }

    /// Position one past the last column of the window.
    pub fn end_pos(&self) -> usize {
        self.start_pos + self.n_cols
    }
}

/// Trait for models that can perform batched autoregressive inference.
///
/// Implementations may keep per-row state (e.g. attention caches) between
/// calls; the caller always feeds windows in increasing, contiguous order
/// and calls `reset_cache` before starting a new batch.
pub trait ModelArchitecture: Send + Sync {
    /// Run the forward pass over `batch` and return next-token logits for
    /// the last position of every row, as a row-major `[n_rows, vocab_size]`
    /// vector.
    fn forward(&mut self, batch: &StepBatch<'_>) -> crate::Result<Vec<f32>>;

    /// Returns the vocabulary size (number of output logits per row).
    fn vocab_size(&self) -> usize;

    /// Longest sequence the model accepts.
    fn max_seq_len(&self) -> usize;

    /// Reset all cached context.
    fn reset_cache(&mut self);
}
