use std::cmp::Ordering;

use crate::greedy::{DistSampler, GreedySampler};
use crate::temperature::TemperatureSampler;
use crate::top_p::TopPSampler;

/// A token ID paired with its logit value.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenLogit {
    pub token_id: u32,
    pub logit: f32,
}

/// Trait for samplers that modify or select from a set of token logits.
pub trait Sampler: Send {
    /// Returns the name of this sampler.
    fn name(&self) -> &str;

    /// Modify logits in-place (filtering, scaling, selection).
    fn apply(&mut self, logits: &mut Vec<TokenLogit>);
}

/// Composes multiple samplers into a pipeline.
/// The last sampler in the chain should be a selector (greedy or random).
pub struct SamplerChain {
    samplers: Vec<Box<dyn Sampler>>,
}

impl SamplerChain {
    /// Create a new empty sampler chain.
    pub fn new() -> Self {
        Self {
            samplers: Vec::new(),
        }
    }

    /// The chain used for chat generation: argmax when `temperature == 0`,
    /// otherwise temperature scaling, nucleus filtering and a seeded draw.
    pub fn for_params(temperature: f32, top_p: f32, seed: u64) -> Self {
        if temperature == 0.0 {
            return Self::new().with(Box::new(GreedySampler::new()));
        }
        Self::new()
            .with(Box::new(TemperatureSampler::new(temperature)))
            .with(Box::new(TopPSampler::new(top_p)))
            .with(Box::new(DistSampler::new(seed)))
    }

    /// Add a sampler to the end of the chain. Returns self for builder-style usage.
    pub fn with(mut self, sampler: Box<dyn Sampler>) -> Self {
        self.samplers.push(sampler);
        self
    }

    /// Names of the samplers in order.
    pub fn names(&self) -> Vec<&str> {
        self.samplers.iter().map(|s| s.name()).collect()
    }

    /// Run all samplers in order on raw logits and return the selected token.
    ///
    /// Returns `None` only when `logits` is empty.
    pub fn sample(&mut self, logits: &[f32]) -> Option<u32> {
        let mut token_logits: Vec<TokenLogit> = logits
            .iter()
            .enumerate()
            .map(|(i, &logit)| TokenLogit {
                token_id: i as u32,
                logit,
            })
            .collect();

        for sampler in &mut self.samplers {
            sampler.apply(&mut token_logits);
        }

        token_logits.first().map(|t| t.token_id)
    }
}

impl Default for SamplerChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable descending sort by logit; equal logits keep ascending token order.
pub(crate) fn sort_descending(logits: &mut [TokenLogit]) {
    logits.sort_by(|a, b| b.logit.partial_cmp(&a.logit).unwrap_or(Ordering::Equal));
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max_logit).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// Natural-log probability of `logits[index]` under softmax(logits).
pub fn log_softmax_at(logits: &[f32], index: usize) -> f32 {
    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let log_sum = logits
        .iter()
        .map(|l| (l - max_logit).exp())
        .sum::<f32>()
        .ln();
    logits[index] - max_logit - log_sum
}
