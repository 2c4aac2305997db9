// ============================================================================
// Sampler Module
// Stochastic top-of-book generators
// ============================================================================

mod semi_markov;
mod white_noise;

pub use semi_markov::{
    estimate_alphas, Direction, SemiMarkovParams, SemiMarkovPath, SemiMarkovSampler,
};
pub use white_noise::WhiteNoiseSampler;

use crate::domain::{SamplerConfig, TopOfBook};
use crate::error::MarketResult;
use crate::interfaces::PriceSampler;
use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;

/// Closed set of quote models the market can run
#[derive(Debug)]
pub enum Sampler {
    WhiteNoise(WhiteNoiseSampler),
    SemiMarkov(SemiMarkovSampler),
}

impl Sampler {
    /// Build the sampler described by `config`.
    ///
    /// A seed of 0 draws a random seed.
    pub fn from_config(config: &SamplerConfig, seed: u64) -> MarketResult<Self> {
        config.validate()?;
        let seed = resolve_seed(seed);

        match config {
            SamplerConfig::WhiteNoise { sigma } => {
                Ok(Sampler::WhiteNoise(WhiteNoiseSampler::new(*sigma, seed)))
            },
            SamplerConfig::SemiMarkov {
                alpha_plus,
                alpha_neg,
                tick_probs,
                tick_size,
                step_interval_ms,
            } => {
                let params = SemiMarkovParams {
                    alpha_plus: *alpha_plus,
                    alpha_neg: *alpha_neg,
                    tick_probs: tick_probs.clone(),
                    tick_size: *tick_size,
                    step_interval: TimeDelta::milliseconds(*step_interval_ms),
                };
                Ok(Sampler::SemiMarkov(SemiMarkovSampler::new(params, seed)?))
            },
        }
    }
}

fn resolve_seed(seed: u64) -> u64 {
    if seed == 0 {
        rand::thread_rng().gen()
    } else {
        seed
    }
}

impl PriceSampler for Sampler {
    fn sample(&mut self, current: &TopOfBook, t1: DateTime<Utc>) -> TopOfBook {
        match self {
            Sampler::WhiteNoise(sampler) => sampler.sample(current, t1),
            Sampler::SemiMarkov(sampler) => sampler.sample(current, t1),
        }
    }

    fn mid(&self) -> f64 {
        match self {
            Sampler::WhiteNoise(sampler) => sampler.mid(),
            Sampler::SemiMarkov(sampler) => sampler.mid(),
        }
    }

    fn spread(&self) -> f64 {
        match self {
            Sampler::WhiteNoise(sampler) => sampler.spread(),
            Sampler::SemiMarkov(sampler) => sampler.spread(),
        }
    }

    fn volumes(&self) -> (f64, f64) {
        match self {
            Sampler::WhiteNoise(sampler) => sampler.volumes(),
            Sampler::SemiMarkov(sampler) => sampler.volumes(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Sampler::WhiteNoise(sampler) => sampler.name(),
            Sampler::SemiMarkov(sampler) => sampler.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let white = Sampler::from_config(&SamplerConfig::WhiteNoise { sigma: 1.0 }, 1).unwrap();
        assert_eq!(white.name(), "WhiteNoise");

        let semi = Sampler::from_config(
            &SamplerConfig::SemiMarkov {
                alpha_plus: 0.1,
                alpha_neg: -0.1,
                tick_probs: vec![0.5, 0.5],
                tick_size: 0.01,
                step_interval_ms: 500,
            },
            1,
        )
        .unwrap();
        assert_eq!(semi.name(), "SemiMarkov");
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Sampler::from_config(&SamplerConfig::WhiteNoise { sigma: -1.0 }, 1).is_err());
    }
}
