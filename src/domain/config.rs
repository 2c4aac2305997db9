// ============================================================================
// Market Configuration
// Construction-time parameters for the simulated market
// ============================================================================

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::{MarketError, MarketResult};

// ============================================================================
// Sampler Configuration
// ============================================================================

/// Stochastic quote model and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum SamplerConfig {
    /// Gaussian random walk of the mid price
    /// - `sigma`: daily standard deviation of the mid, in price units
    WhiteNoise { sigma: f64 },

    /// Fodra-Pham semi-Markov tick model
    /// - `alpha_plus` / `alpha_neg`: direction persistence in [-1, 1]
    /// - `tick_probs`: jump size weights, index 0 is the zero jump
    /// - `tick_size`: price of one tick
    /// - `step_interval_ms`: elapsed time per chain step
    SemiMarkov {
        alpha_plus: f64,
        alpha_neg: f64,
        tick_probs: Vec<f64>,
        tick_size: f64,
        step_interval_ms: i64,
    },
}

impl SamplerConfig {
    pub fn validate(&self) -> MarketResult<()> {
        match self {
            SamplerConfig::WhiteNoise { sigma } => {
                if !sigma.is_finite() || *sigma < 0.0 {
                    return Err(MarketError::InvalidConfig(
                        "sigma must be finite and non-negative".to_string(),
                    ));
                }
            },
            SamplerConfig::SemiMarkov {
                alpha_plus,
                alpha_neg,
                tick_probs,
                tick_size,
                step_interval_ms,
            } => {
                if !(-1.0..=1.0).contains(alpha_plus) || !(-1.0..=1.0).contains(alpha_neg) {
                    return Err(MarketError::InvalidConfig(
                        "alpha_plus and alpha_neg must lie in [-1, 1]".to_string(),
                    ));
                }
                if tick_probs.is_empty()
                    || tick_probs.iter().any(|p| !p.is_finite() || *p < 0.0)
                    || tick_probs.iter().sum::<f64>() <= 0.0
                {
                    return Err(MarketError::InvalidConfig(
                        "tick_probs must be non-negative weights with a positive sum".to_string(),
                    ));
                }
                if !tick_size.is_finite() || *tick_size <= 0.0 {
                    return Err(MarketError::InvalidConfig(
                        "tick_size must be positive".to_string(),
                    ));
                }
                if *step_interval_ms <= 0 {
                    return Err(MarketError::InvalidConfig(
                        "step_interval_ms must be positive".to_string(),
                    ));
                }
            },
        }
        Ok(())
    }
}

// ============================================================================
// Complete Market Configuration
// ============================================================================

/// Comprehensive configuration for creating a market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// The simulated instrument (e.g., "EURUSD", "ES-202503")
    pub symbol: String,

    /// Bar period in milliseconds
    pub bar_period_ms: i64,

    /// Retention of the top-of-book history (and of bars, if pruned)
    pub history_age_ms: i64,

    /// Step between samples when backfilling bar history
    pub history_sample_period_ms: i64,

    /// Drop bars older than the history age on every simulated tick
    pub prune_bars: bool,

    /// Decimal places used when pricing the synthetic market-maker orders
    pub price_decimals: u32,

    /// RNG seed for the sampler (0 = random seed)
    pub seed: u64,

    /// Quote model
    pub sampler: SamplerConfig,
}

impl MarketConfig {
    /// Create a new configuration with required parameters
    pub fn new(symbol: String, sampler: SamplerConfig) -> Self {
        Self {
            symbol,
            bar_period_ms: 60_000,
            history_age_ms: 24 * 60 * 60 * 1000,
            history_sample_period_ms: 1_000,
            prune_bars: false,
            price_decimals: 4,
            seed: 0,
            sampler,
        }
    }

    /// Builder method: Set bar period
    pub fn with_bar_period(mut self, period: TimeDelta) -> Self {
        self.bar_period_ms = period.num_milliseconds();
        self
    }

    /// Builder method: Set history retention
    pub fn with_history_age(mut self, age: TimeDelta) -> Self {
        self.history_age_ms = age.num_milliseconds();
        self
    }

    /// Builder method: Set backfill sample period
    pub fn with_history_sample_period(mut self, period: TimeDelta) -> Self {
        self.history_sample_period_ms = period.num_milliseconds();
        self
    }

    /// Builder method: Enable or disable bar pruning
    pub fn with_prune_bars(mut self, prune: bool) -> Self {
        self.prune_bars = prune;
        self
    }

    /// Builder method: Set synthetic order price precision
    pub fn with_price_decimals(mut self, decimals: u32) -> Self {
        self.price_decimals = decimals;
        self
    }

    /// Builder method: Set the sampler seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn bar_period(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.bar_period_ms)
    }

    pub fn history_age(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.history_age_ms)
    }

    pub fn history_sample_period(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.history_sample_period_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> MarketResult<()> {
        if self.symbol.is_empty() {
            return Err(MarketError::InvalidConfig(
                "Symbol cannot be empty".to_string(),
            ));
        }

        if self.bar_period_ms <= 0 {
            return Err(MarketError::InvalidConfig(
                "Bar period must be positive".to_string(),
            ));
        }

        if self.history_age_ms <= 0 {
            return Err(MarketError::InvalidConfig(
                "History age must be positive".to_string(),
            ));
        }

        if self.history_sample_period_ms <= 0 {
            return Err(MarketError::InvalidConfig(
                "History sample period must be positive".to_string(),
            ));
        }

        if self.price_decimals > 18 {
            return Err(MarketError::InvalidConfig(
                "Price decimals cannot exceed 18".to_string(),
            ));
        }

        self.sampler.validate()
    }
}

// ============================================================================
// Preset Configurations (Factory Methods)
// ============================================================================

impl MarketConfig {
    /// FX-style configuration
    /// - Semi-Markov tick model with mean-reverting tick direction
    /// - Tick size: 0.0001, one-minute bars
    pub fn fx_style(symbol: String) -> Self {
        Self::new(
            symbol,
            SamplerConfig::SemiMarkov {
                alpha_plus: -0.3,
                alpha_neg: -0.3,
                tick_probs: vec![0.4, 0.45, 0.15],
                tick_size: 0.0001,
                step_interval_ms: 1_000,
            },
        )
        .with_price_decimals(4)
    }

    /// White-noise configuration
    /// - Gaussian mid-price walk with constant spread
    pub fn white_noise(symbol: String, sigma: f64) -> Self {
        Self::new(symbol, SamplerConfig::WhiteNoise { sigma })
    }
}
