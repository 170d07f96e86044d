use crate::sampler::{Sampler, TokenLogit};

/// Divides every logit by `t` before nucleus filtering.
///
/// `SamplerChain::for_params` routes `t == 0` to greedy decoding, so this
/// stage only ever sees positive temperatures. A non-positive value is
/// treated as "nearly greedy" rather than dividing by zero.
pub struct TemperatureSampler {
    inv_temperature: f32,
}

impl TemperatureSampler {
    const MIN_TEMPERATURE: f32 = 1e-7;

    pub fn new(temperature: f32) -> Self {
        Self {
            inv_temperature: 1.0 / temperature.max(Self::MIN_TEMPERATURE),
        }
    }
}

impl Sampler for TemperatureSampler {
    fn name(&self) -> &str {
        "temperature"
    }

    fn apply(&mut self, logits: &mut Vec<TokenLogit>) {
        if self.inv_temperature == 1.0 {
            return;
        }
        logits
            .iter_mut()
            .for_each(|token| token.logit *= self.inv_temperature);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn logits() -> Vec<TokenLogit> {
        vec![
            TokenLogit { token_id: 0, logit: 1.0 },
            TokenLogit { token_id: 1, logit: -3.0 },
        ]
    }

    #[test]
    fn test_scales_logits() {
        let mut logits = logits();
        TemperatureSampler::new(0.5).apply(&mut logits);
        assert_relative_eq!(logits[0].logit, 2.0);
        assert_relative_eq!(logits[1].logit, -6.0);
    }

    #[test]
    fn test_unit_temperature_is_identity() {
        let mut scaled = logits();
        TemperatureSampler::new(1.0).apply(&mut scaled);
        assert_eq!(scaled, logits());
    }

    #[test]
    fn test_non_positive_temperature_sharpens() {
        let mut logits = logits();
        TemperatureSampler::new(0.0).apply(&mut logits);
        assert!(logits[0].logit > 1e6);
        assert!(logits[1].logit < -1e6);
    }
}
