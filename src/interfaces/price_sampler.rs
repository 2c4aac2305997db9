// ============================================================================
// Price Sampler Interface
// Defines the contract for stochastic quote generators
// ============================================================================

use crate::domain::TopOfBook;
use chrono::{DateTime, Utc};

/// Strategy interface for quote models
/// Implementations: WhiteNoise, SemiMarkov
pub trait PriceSampler: Send {
    /// Produce the top of book at `t1` evolved from `current`.
    ///
    /// Consumes randomness, so repeated calls with equal inputs differ.
    /// `t1` may precede `current.timestamp` when walking history backwards;
    /// only the magnitude of the elapsed time matters.
    fn sample(&mut self, current: &TopOfBook, t1: DateTime<Utc>) -> TopOfBook;

    /// Mid price of the most recent sample (`NaN` before the first one)
    fn mid(&self) -> f64;

    /// Spread of the most recent sample (`NaN` before the first one)
    fn spread(&self) -> f64;

    /// Bid and ask volumes of the most recent sample
    fn volumes(&self) -> (f64, f64);

    /// Get the model name for logging
    fn name(&self) -> &str;
}
