use crate::sampler::{sort_descending, softmax, Sampler, TokenLogit};

/// Nucleus sampling: keeps the smallest prefix of tokens, most likely first,
/// whose cumulative probability reaches the threshold `p`.
///
/// Tokens with equal probability are ordered by ascending token id, so the
/// lower id is kept when the boundary falls between them.
pub struct TopPSampler {
    p: f32,
}

impl TopPSampler {
    /// Create a new top-p (nucleus) sampler with the given probability threshold.
    pub fn new(p: f32) -> Self {
        Self { p }
    }
}

impl Sampler for TopPSampler {
    fn name(&self) -> &str {
        "top_p"
    }

    fn apply(&mut self, logits: &mut Vec<TokenLogit>) {
        if logits.is_empty() {
            return;
        }

        sort_descending(logits);
        let values: Vec<f32> = logits.iter().map(|t| t.logit).collect();
        let probs = softmax(&values);

        // Rounding may leave the total just under p = 1.0; keep everything then.
        let mut cumulative = 0.0f32;
        let mut cutoff = logits.len();
        for (i, &prob) in probs.iter().enumerate() {
            cumulative += prob;
            if cumulative >= self.p {
                cutoff = i + 1;
                break;
            }
        }

        logits.truncate(cutoff.max(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_probs(probs: &[f32]) -> Vec<TokenLogit> {
        probs
            .iter()
            .enumerate()
            .map(|(i, p)| TokenLogit {
                token_id: i as u32,
                logit: p.ln(),
            })
            .collect()
    }

    fn ids(logits: &[TokenLogit]) -> Vec<u32> {
        logits.iter().map(|t| t.token_id).collect()
    }

    #[test]
    fn test_keeps_smallest_prefix_reaching_p() {
        let mut logits = from_probs(&[0.1, 0.5, 0.3, 0.1]);
        TopPSampler::new(0.7).apply(&mut logits);
        assert_eq!(ids(&logits), vec![1, 2]);
    }

    #[test]
    fn test_single_token_when_first_exceeds_p() {
        let mut logits = from_probs(&[0.05, 0.9, 0.05]);
        TopPSampler::new(0.5).apply(&mut logits);
        assert_eq!(ids(&logits), vec![1]);
    }

    #[test]
    fn test_p_one_keeps_everything() {
        let mut logits = from_probs(&[0.25, 0.25, 0.25, 0.25]);
        TopPSampler::new(1.0).apply(&mut logits);
        assert_eq!(logits.len(), 4);
    }

    #[test]
    fn test_ties_prefer_lower_id() {
        let mut logits = from_probs(&[0.2, 0.4, 0.4]);
        TopPSampler::new(0.3).apply(&mut logits);
        assert_eq!(ids(&logits), vec![1]);
    }

    #[test]
    fn test_kept_mass_bound() {
        // The mass strictly above the last kept token stays below p.
        let probs = [0.3, 0.25, 0.2, 0.15, 0.1];
        for &p in &[0.1f32, 0.3, 0.55, 0.6, 0.9] {
            let mut logits = from_probs(&probs);
            TopPSampler::new(p).apply(&mut logits);
            let kept: f32 = logits.iter().map(|t| probs[t.token_id as usize]).sum();
            let last = probs[logits.last().unwrap().token_id as usize];
            assert!(kept >= p - 1e-6);
            assert!(kept - last < p + 1e-6);
        }
    }
}
