use crate::error::{ChatError, Result};

/// Padding sentinel for unwritten grid cells. Never a valid token id.
pub const PAD_ID: u32 = u32::MAX;

/// Decoding state of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Pending,
    Finished,
}

/// Limits the scheduler enforces for one completion call.
#[derive(Debug, Clone, Copy)]
pub struct BatchLimits {
    pub max_seq_len: usize,
    pub max_batch_size: usize,
    /// `None` lets each batch generate up to `max_seq_len`.
    pub max_gen_len: Option<usize>,
}

/// Workspace for one completion call.
///
/// Holds a row-major `[n_rows, total_len]` token grid, initialised with
/// `PAD_ID` and with each prompt copied left-aligned into its row, plus the
/// per-row cursors and states the decoder advances in lock-step.
#[derive(Debug)]
pub struct BatchState {
    grid: Vec<u32>,
    n_rows: usize,
    total_len: usize,
    prompt_lens: Vec<usize>,
    /// One past the last position a row may write.
    row_limits: Vec<usize>,
    cursors: Vec<usize>,
    states: Vec<RowState>,
    /// Position of the first stop token a row generated.
    stops: Vec<Option<usize>>,
    /// Log-probability of the token at each position, when recorded.
    logprobs: Option<Vec<f32>>,
}

impl BatchState {
    /// Lay out `prompts` for decoding.
    ///
    /// # Errors
    /// - `BatchSizeExceeded` when there are more prompts than `max_batch_size`.
    /// - `PromptTooLong` when a prompt leaves no room to generate; a prompt
    ///   of exactly `max_seq_len` tokens is accepted only with `max_gen_len == Some(0)`.
    pub fn schedule(prompts: Vec<Vec<u32>>, limits: BatchLimits, record_logprobs: bool) -> Result<Self> {
        let n_rows = prompts.len();
        if n_rows > limits.max_batch_size {
            return Err(ChatError::BatchSizeExceeded {
                got: n_rows,
                max: limits.max_batch_size,
            });
        }

        let reserve = usize::from(limits.max_gen_len != Some(0));
        let max_len = limits.max_seq_len.saturating_sub(reserve);
        for (i, prompt) in prompts.iter().enumerate() {
            if prompt.is_empty() {
                return Err(ChatError::InvalidConfig(format!("prompt {} is empty", i)));
            }
            if prompt.len() > max_len {
                return Err(ChatError::PromptTooLong {
                    dialog: i,
                    len: prompt.len(),
                    max: max_len,
                });
            }
        }

        let prompt_lens: Vec<usize> = prompts.iter().map(Vec::len).collect();
        let max_prompt_len = prompt_lens.iter().copied().max().unwrap_or(0);
        let max_gen_len = limits
            .max_gen_len
            .unwrap_or(limits.max_seq_len - max_prompt_len.min(limits.max_seq_len));
        let total_len = limits.max_seq_len.min(max_prompt_len.saturating_add(max_gen_len));

        let mut grid = vec![PAD_ID; n_rows * total_len];
        for (row, prompt) in grid.chunks_exact_mut(total_len.max(1)).zip(&prompts) {
            row[..prompt.len()].copy_from_slice(prompt);
        }

        let row_limits: Vec<usize> = prompt_lens
            .iter()
            .map(|&len| total_len.min(len.saturating_add(max_gen_len)))
            .collect();
        let states = prompt_lens
            .iter()
            .zip(&row_limits)
            .map(|(&len, &limit)| {
                if len < limit {
                    RowState::Pending
                } else {
                    RowState::Finished
                }
            })
            .collect();

        Ok(BatchState {
            grid,
            n_rows,
            total_len,
            cursors: prompt_lens.clone(),
            prompt_lens,
            row_limits,
            states,
            stops: vec![None; n_rows],
            logprobs: record_logprobs.then(|| vec![f32::NAN; n_rows * total_len]),
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn total_len(&self) -> usize {
        self.total_len
    }

    pub fn min_prompt_len(&self) -> usize {
        self.prompt_lens.iter().copied().min().unwrap_or(0)
    }

    pub fn prompt_len(&self, row: usize) -> usize {
        self.prompt_lens[row]
    }

    pub fn cursor(&self, row: usize) -> usize {
        self.cursors[row]
    }

    pub fn state(&self, row: usize) -> RowState {
        self.states[row]
    }

    pub fn stop_position(&self, row: usize) -> Option<usize> {
        self.stops[row]
    }

    pub fn all_finished(&self) -> bool {
        self.states.iter().all(|&s| s == RowState::Finished)
    }

    /// `true` for every row still pending.
    pub fn active_mask(&self) -> Vec<bool> {
        self.states.iter().map(|&s| s == RowState::Pending).collect()
    }

    /// Full row of the grid, padding included.
    pub fn row(&self, row: usize) -> &[u32] {
        &self.grid[row * self.total_len..(row + 1) * self.total_len]
    }

    pub fn token(&self, row: usize, pos: usize) -> u32 {
        self.grid[row * self.total_len + pos]
    }

    /// Copy columns `start..end` of every row into a row-major window.
    pub fn window(&self, start: usize, end: usize) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.n_rows * (end - start));
        for row in 0..self.n_rows {
            out.extend_from_slice(&self.row(row)[start..end]);
        }
        out
    }

    /// Whether `pos` of `row` belongs to the caller's prompt.
    pub fn is_prompt(&self, row: usize, pos: usize) -> bool {
        pos < self.prompt_lens[row]
    }

    /// Write a generated token at `pos` and finish the row when `stop`
    /// is set or the row reached its length limit.
    pub fn write(&mut self, row: usize, pos: usize, token: u32, stop: bool) {
        debug_assert!(!self.is_prompt(row, pos));
        self.grid[row * self.total_len + pos] = token;
        self.advance(row, pos, stop);
    }

    /// Step over a prompt position without touching its token.
    pub fn keep(&mut self, row: usize, pos: usize) {
        self.advance(row, pos, false);
    }

    fn advance(&mut self, row: usize, pos: usize, stop: bool) {
        self.cursors[row] = self.cursors[row].max(pos + 1);
        if stop && self.stops[row].is_none() {
            self.stops[row] = Some(pos);
        }
        if stop || pos + 1 >= self.row_limits[row] {
            self.states[row] = RowState::Finished;
        }
    }

    /// Whether `schedule` was asked to keep per-token log-probabilities.
    pub fn records_logprobs(&self) -> bool {
        self.logprobs.is_some()
    }

    pub fn record_logprob(&mut self, row: usize, pos: usize, logprob: f32) {
        if let Some(logprobs) = self.logprobs.as_mut() {
            logprobs[row * self.total_len + pos] = logprob;
        }
    }

    /// The prompt a row was scheduled with.
    pub fn prompt(&self, row: usize) -> &[u32] {
        &self.row(row)[..self.prompt_lens[row]]
    }

    /// Tokens a row generated: from its prompt end up to the first stop
    /// token (exclusive) or the cursor.
    pub fn output(&self, row: usize) -> RowOutput {
        let start = self.prompt_lens[row];
        let end = self.stops[row].unwrap_or(self.cursors[row]);

        let tokens = self.row(row)[start..end].to_vec();
        let logprobs = self.logprobs.as_ref().map(|lp| {
            let base = row * self.total_len;
            lp[base + start..base + end].to_vec()
        });
        RowOutput { tokens, logprobs }
    }
}

/// What the decoder produced for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowOutput {
    pub tokens: Vec<u32>,
    /// One entry per generated token, when recorded.
    pub logprobs: Option<Vec<f32>>,
}
