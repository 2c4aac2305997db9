// ============================================================================
// White Noise Sampler
// Gaussian random walk of the mid price
// ============================================================================

use crate::domain::TopOfBook;
use crate::interfaces::PriceSampler;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// `mid' = mid + sqrt(dt_days) * sigma * N(0, 1)`; spread and volumes are
/// carried over from the current quote.
///
/// # Example
/// ```text
/// sigma = 2.0, dt = 6h  =>  mid moves by N(0, 1) * 2.0 * sqrt(0.25)
/// ```
#[derive(Debug)]
pub struct WhiteNoiseSampler {
    sigma: f64,
    rng: StdRng,
    seed: u64,
    last: Option<TopOfBook>,
}

impl WhiteNoiseSampler {
    pub fn new(sigma: f64, seed: u64) -> Self {
        Self {
            sigma,
            rng: StdRng::seed_from_u64(seed),
            seed,
            last: None,
        }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Restart the random stream from the construction seed
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.last = None;
    }
}

impl PriceSampler for WhiteNoiseSampler {
    fn sample(&mut self, current: &TopOfBook, t1: DateTime<Utc>) -> TopOfBook {
        let elapsed_ms = (t1 - current.timestamp).num_milliseconds().unsigned_abs();
        let dt_days = elapsed_ms as f64 / MILLIS_PER_DAY;
        let shock: f64 = self.rng.sample(StandardNormal);

        let mut mid = current.mid() + dt_days.sqrt() * self.sigma * shock;
        if mid - current.spread() / 2.0 <= 0.0 {
            tracing::trace!(mid, "white noise step would cross zero, holding mid");
            mid = current.mid();
        }

        let next = current.recentred(t1, mid);
        self.last = Some(next.clone());
        next
    }

    fn mid(&self) -> f64 {
        self.last.as_ref().map_or(f64::NAN, TopOfBook::mid)
    }

    fn spread(&self) -> f64 {
        self.last.as_ref().map_or(f64::NAN, TopOfBook::spread)
    }

    fn volumes(&self) -> (f64, f64) {
        self.last
            .as_ref()
            .map_or((f64::NAN, f64::NAN), |top| (top.bid_volume, top.ask_volume))
    }

    fn name(&self) -> &str {
        "WhiteNoise"
    }
}
