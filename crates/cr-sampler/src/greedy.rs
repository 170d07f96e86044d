use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::sampler::{sort_descending, softmax, Sampler, TokenLogit};

/// Greedy sampler: selects the single token with the highest logit.
/// Ties go to the lowest token id.
pub struct GreedySampler;

impl GreedySampler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GreedySampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for GreedySampler {
    fn name(&self) -> &str {
        "greedy"
    }

    fn apply(&mut self, logits: &mut Vec<TokenLogit>) {
        if logits.is_empty() {
            return;
        }
        sort_descending(logits);
        logits.truncate(1);
    }
}

/// Distribution-based sampler: renormalizes the remaining logits with
/// softmax and draws one token from a seeded RNG.
///
/// The RNG advances with every draw, so a sampler replays the same sequence
/// of choices only when rebuilt with the same seed.
pub struct DistSampler {
    rng: StdRng,
}

impl DistSampler {
    /// Create a new distribution sampler with the given seed for reproducibility.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Sampler for DistSampler {
    fn name(&self) -> &str {
        "dist"
    }

    fn apply(&mut self, logits: &mut Vec<TokenLogit>) {
        if logits.is_empty() {
            return;
        }

        let values: Vec<f32> = logits.iter().map(|t| t.logit).collect();
        let probs = softmax(&values);

        let dist = match WeightedIndex::new(&probs) {
            Ok(d) => d,
            Err(_) => {
                // Invalid weights: fall back to the most likely token.
                sort_descending(logits);
                logits.truncate(1);
                return;
            }
        };

        let selected = logits.swap_remove(dist.sample(&mut self.rng));
        logits.clear();
        logits.push(selected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logits(values: &[f32]) -> Vec<TokenLogit> {
        values
            .iter()
            .enumerate()
            .map(|(i, &logit)| TokenLogit {
                token_id: i as u32,
                logit,
            })
            .collect()
    }

    #[test]
    fn test_greedy() {
        let mut l = logits(&[0.0, 2.0, 1.0]);
        GreedySampler::new().apply(&mut l);
        assert_eq!(l.len(), 1);
        assert_eq!(l[0].token_id, 1);
    }

    #[test]
    fn test_dist_same_seed_same_draws() {
        let mut a = DistSampler::new(42);
        let mut b = DistSampler::new(42);
        for _ in 0..32 {
            let mut la = logits(&[0.0, 0.1, 0.2, 0.3]);
            let mut lb = logits(&[0.0, 0.1, 0.2, 0.3]);
            a.apply(&mut la);
            b.apply(&mut lb);
            assert_eq!(la, lb);
            assert_eq!(la.len(), 1);
        }
    }

    #[test]
    fn test_dist_only_draws_remaining_tokens() {
        let mut s = DistSampler::new(3);
        for _ in 0..32 {
            let mut l = logits(&[1.0, 1.0, 1.0, 1.0]);
            l.truncate(2);
            s.apply(&mut l);
            assert!(l[0].token_id < 2);
        }
    }

    #[test]
    fn test_dist_rng_advances() {
        let mut s = DistSampler::new(9);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            let mut l = logits(&[0.0; 8]);
            s.apply(&mut l);
            seen.insert(l[0].token_id);
        }
        assert!(seen.len() > 1);
    }
}
