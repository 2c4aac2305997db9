// ============================================================================
// Semi-Markov Sampler
// Fodra-Pham tick model: Markov tick direction with independent jump sizes
// ============================================================================

use crate::domain::TopOfBook;
use crate::error::{MarketError, MarketResult};
use crate::interfaces::PriceSampler;
use chrono::{DateTime, TimeDelta, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Upper bound on chain steps applied by one `sample` call
pub const MAX_STEPS_PER_SAMPLE: i64 = 100_000;

/// Current tick direction of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
        }
    }

    pub fn flip(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// Model parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SemiMarkovParams {
    /// Persistence of up moves: stay up with probability (1 + alpha_plus) / 2
    pub alpha_plus: f64,
    /// Persistence of down moves: stay down with probability (1 + alpha_neg) / 2
    pub alpha_neg: f64,
    /// Jump size weights in ticks; index 0 is the zero jump
    pub tick_probs: Vec<f64>,
    pub tick_size: f64,
    /// Elapsed time represented by one chain step
    pub step_interval: TimeDelta,
}

/// Semi-Markov microstructure sampler.
///
/// Each step first decides whether the direction persists, then draws a
/// jump of `k` ticks with probability `tick_probs[k]` and moves the mid by
/// `direction * k * tick_size`. Negative persistence parameters produce the
/// short-range mean reversion seen in real tick data.
#[derive(Debug)]
pub struct SemiMarkovSampler {
    params: SemiMarkovParams,
    jumps: WeightedIndex<f64>,
    direction: Direction,
    rng: StdRng,
    seed: u64,
    last: Option<TopOfBook>,
}

impl SemiMarkovSampler {
    pub fn new(params: SemiMarkovParams, seed: u64) -> MarketResult<Self> {
        let jumps = WeightedIndex::new(&params.tick_probs)
            .map_err(|err| MarketError::InvalidConfig(format!("tick_probs: {}", err)))?;

        Ok(Self {
            params,
            jumps,
            direction: Direction::Up,
            rng: StdRng::seed_from_u64(seed),
            seed,
            last: None,
        })
    }

    pub fn params(&self) -> &SemiMarkovParams {
        &self.params
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Restart the chain and the random stream from the construction seed
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.direction = Direction::Up;
        self.last = None;
    }

    /// Fresh, restartable price path starting at `start`.
    ///
    /// Independent of the live sampler state: every call replays the same
    /// path for the same seed.
    pub fn path_iter(&self, start: f64) -> SemiMarkovPath<'_> {
        SemiMarkovPath {
            params: &self.params,
            jumps: &self.jumps,
            direction: Direction::Up,
            rng: StdRng::seed_from_u64(self.seed),
            price: start,
        }
    }

    /// First `n` prices of [`path_iter`](Self::path_iter)
    pub fn path(&self, start: f64, n: usize) -> Vec<f64> {
        self.path_iter(start).take(n).collect()
    }

    fn steps_for(&self, elapsed: TimeDelta) -> i64 {
        let step_ms = self.params.step_interval.num_milliseconds().max(1);
        let steps = (elapsed.num_milliseconds().abs() / step_ms).max(1);
        if steps > MAX_STEPS_PER_SAMPLE {
            tracing::warn!(
                steps,
                max = MAX_STEPS_PER_SAMPLE,
                ?elapsed,
                "semi-Markov step count capped"
            );
            return MAX_STEPS_PER_SAMPLE;
        }
        steps
    }
}

fn step(
    params: &SemiMarkovParams,
    jumps: &WeightedIndex<f64>,
    direction: &mut Direction,
    rng: &mut StdRng,
) -> f64 {
    let alpha = match direction {
        Direction::Up => params.alpha_plus,
        Direction::Down => params.alpha_neg,
    };
    let persist = ((1.0 + alpha) / 2.0).clamp(0.0, 1.0);
    if !rng.gen_bool(persist) {
        *direction = direction.flip();
    }

    let ticks = jumps.sample(rng) as f64;
    direction.sign() * ticks * params.tick_size
}

impl PriceSampler for SemiMarkovSampler {
    fn sample(&mut self, current: &TopOfBook, t1: DateTime<Utc>) -> TopOfBook {
        let steps = self.steps_for(t1 - current.timestamp);
        let mut mid = current.mid();
        for _ in 0..steps {
            mid += step(&self.params, &self.jumps, &mut self.direction, &mut self.rng);
        }

        let floor = current.spread() / 2.0 + self.params.tick_size;
        if mid < floor {
            tracing::trace!(mid, floor, "semi-Markov path clamped above zero");
            mid = floor;
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
        "SemiMarkov"
    }
}

/// Iterator over a semi-Markov price path
pub struct SemiMarkovPath<'a> {
    params: &'a SemiMarkovParams,
    jumps: &'a WeightedIndex<f64>,
    direction: Direction,
    rng: StdRng,
    price: f64,
}

impl Iterator for SemiMarkovPath<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        self.price += step(self.params, self.jumps, &mut self.direction, &mut self.rng);
        Some(self.price)
    }
}

/// Estimate `(alpha_plus, alpha_neg)` from an observed price path.
///
/// Only non-zero moves are counted, so the estimate is exact in expectation
/// when the jump distribution has no zero outcome. Returns `None` when the
/// path has no consecutive moves starting in one of the two directions.
pub fn estimate_alphas(prices: &[f64]) -> Option<(f64, f64)> {
    let moves: Vec<Direction> = prices
        .windows(2)
        .filter_map(|w| {
            let diff = w[1] - w[0];
            if diff > 0.0 {
                Some(Direction::Up)
            } else if diff < 0.0 {
                Some(Direction::Down)
            } else {
                None
            }
        })
        .collect();

    let (mut up_total, mut up_stay, mut down_total, mut down_stay) = (0u64, 0u64, 0u64, 0u64);
    for pair in moves.windows(2) {
        match pair[0] {
            Direction::Up => {
                up_total += 1;
                up_stay += u64::from(pair[1] == Direction::Up);
            },
            Direction::Down => {
                down_total += 1;
                down_stay += u64::from(pair[1] == Direction::Down);
            },
        }
    }

    if up_total == 0 || down_total == 0 {
        return None;
    }
    let alpha_plus = 2.0 * up_stay as f64 / up_total as f64 - 1.0;
    let alpha_neg = 2.0 * down_stay as f64 / down_total as f64 - 1.0;
    Some((alpha_plus, alpha_neg))
}
