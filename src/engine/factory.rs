// ============================================================================
// Market Factory
// Creates markets with proper configuration
// ============================================================================

use crate::domain::config::{MarketConfig, SamplerConfig};
use crate::engine::Market;
use crate::error::MarketResult;
use crate::interfaces::EventHandler;
use chrono::TimeDelta;
use std::sync::Arc;

// ============================================================================
// Factory Functions
// ============================================================================

/// Creates a market from configuration
///
/// # Arguments
/// * `config` - Market configuration
/// * `event_handler` - Event handler for fills, quotes and bars
///
/// # Example
/// ```
/// use market_sim::prelude::*;
/// use market_sim::engine::factory::create_market;
/// use std::sync::Arc;
///
/// let config = MarketConfig::fx_style("EURUSD".to_string());
/// let market = create_market(config, Arc::new(NoOpEventHandler)).unwrap();
/// assert_eq!(market.symbol(), "EURUSD");
/// ```
pub fn create_market(
    config: MarketConfig,
    event_handler: Arc<dyn EventHandler>,
) -> MarketResult<Market> {
    tracing::debug!(symbol = %config.symbol, "creating market");
    Market::new(config, event_handler)
}

// ============================================================================
// Builder Pattern for Advanced Configuration
// ============================================================================

/// Builder for creating markets with fluent API
///
/// # Example
/// ```
/// use market_sim::prelude::*;
/// use market_sim::engine::factory::MarketBuilder;
/// use chrono::TimeDelta;
/// use std::sync::Arc;
///
/// let market = MarketBuilder::new("ES")
///     .white_noise(0.2)
///     .bar_period(TimeDelta::seconds(5))
///     .seed(42)
///     .build(Arc::new(NoOpEventHandler))
///     .unwrap();
/// ```
pub struct MarketBuilder {
    config: MarketConfig,
}

impl MarketBuilder {
    /// Create a new builder for the specified symbol, FX-style by default
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            config: MarketConfig::fx_style(symbol.into()),
        }
    }

    // ========================================================================
    // Sampler Configuration
    // ========================================================================

    /// Gaussian mid-price walk
    pub fn white_noise(mut self, sigma: f64) -> Self {
        self.config.sampler = SamplerConfig::WhiteNoise { sigma };
        self
    }

    /// Semi-Markov tick model
    pub fn semi_markov(
        mut self,
        alpha_plus: f64,
        alpha_neg: f64,
        tick_probs: Vec<f64>,
        tick_size: f64,
        step_interval: TimeDelta,
    ) -> Self {
        self.config.sampler = SamplerConfig::SemiMarkov {
            alpha_plus,
            alpha_neg,
            tick_probs,
            tick_size,
            step_interval_ms: step_interval.num_milliseconds(),
        };
        self
    }

    // ========================================================================
    // History Configuration
    // ========================================================================

    pub fn bar_period(mut self, period: TimeDelta) -> Self {
        self.config = self.config.with_bar_period(period);
        self
    }

    pub fn history_age(mut self, age: TimeDelta) -> Self {
        self.config = self.config.with_history_age(age);
        self
    }

    pub fn history_sample_period(mut self, period: TimeDelta) -> Self {
        self.config = self.config.with_history_sample_period(period);
        self
    }

    pub fn prune_bars(mut self, prune: bool) -> Self {
        self.config = self.config.with_prune_bars(prune);
        self
    }

    // ========================================================================
    // Additional Configuration
    // ========================================================================

    pub fn price_decimals(mut self, decimals: u32) -> Self {
        self.config = self.config.with_price_decimals(decimals);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config = self.config.with_seed(seed);
        self
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the market
    pub fn build(self, event_handler: Arc<dyn EventHandler>) -> MarketResult<Market> {
        create_market(self.config, event_handler)
    }

    /// Get the configuration without building (for inspection)
    pub fn get_config(&self) -> &MarketConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarketError;
    use crate::interfaces::NoOpEventHandler;

    #[test]
    fn test_create_fx_market() {
        let config = MarketConfig::fx_style("EURUSD".to_string());
        let market = create_market(config, Arc::new(NoOpEventHandler)).unwrap();
        assert_eq!(market.symbol(), "EURUSD");
    }

    #[test]
    fn test_create_rejects_invalid_config() {
        let config = MarketConfig::white_noise("ES".to_string(), -1.0);
        let result = create_market(config, Arc::new(NoOpEventHandler));
        assert!(matches!(result, Err(MarketError::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_pattern() {
        let builder = MarketBuilder::new("ES")
            .white_noise(0.5)
            .bar_period(TimeDelta::seconds(5))
            .history_age(TimeDelta::hours(2))
            .prune_bars(true)
            .price_decimals(2)
            .seed(9);

        let config = builder.get_config();
        assert_eq!(config.sampler, SamplerConfig::WhiteNoise { sigma: 0.5 });
        assert_eq!(config.bar_period(), TimeDelta::seconds(5));
        assert_eq!(config.history_age(), TimeDelta::hours(2));
        assert!(config.prune_bars);
        assert_eq!(config.price_decimals, 2);
        assert_eq!(config.seed, 9);

        let market = builder.build(Arc::new(NoOpEventHandler)).unwrap();
        assert_eq!(market.symbol(), "ES");
    }

    #[test]
    fn test_builder_semi_markov() {
        let market = MarketBuilder::new("GBPUSD")
            .semi_markov(0.2, -0.4, vec![0.7, 0.3], 0.0001, TimeDelta::milliseconds(250))
            .history_sample_period(TimeDelta::milliseconds(250))
            .build(Arc::new(NoOpEventHandler))
            .unwrap();

        match &market.config().sampler {
            SamplerConfig::SemiMarkov { step_interval_ms, .. } => assert_eq!(*step_interval_ms, 250),
            other => panic!("unexpected sampler {:?}", other),
        }
    }

    #[test]
    fn test_builder_rejects_bad_tick_probs() {
        let result = MarketBuilder::new("X")
            .semi_markov(0.0, 0.0, vec![], 0.01, TimeDelta::seconds(1))
            .build(Arc::new(NoOpEventHandler));
        assert!(result.is_err());
    }
}
