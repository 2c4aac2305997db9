// ============================================================================
// Market
// Sampler, bar builders and order matcher behind one lock
// ============================================================================

use crate::bars::{BarBuilder, ReverseBarBuilder};
use crate::domain::{
    bars_to_json, floor_time, Bar, BarMap, BookLevel, MarketConfig, Order, Side, TopOfBook,
    Valuation,
};
use crate::engine::order_matcher::{InsertOutcome, OrderMatcher};
use crate::error::{MarketError, MarketResult};
use crate::interfaces::{BarBuffer, EventHandler, MarketEvent, PriceSampler};
use crate::sampler::Sampler;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Owner tag of the synthetic quote orders
pub const MARKET_MAKER_OWNER: &str = "market-maker";

/// Upper bound on samples generated by a single backfill
const MAX_BACKFILL_STEPS: usize = 1_000_000;

/// Decimal places kept on synthetic quote sizes
const VOLUME_DECIMALS: u32 = 8;

/// Outcome of one simulated tick
#[derive(Debug, Clone)]
pub struct SimulationStep {
    /// The freshly sampled quote
    pub top_of_book: TopOfBook,

    /// Fills produced by re-quoting the synthetic orders
    pub fills: Vec<Order>,

    /// Bars completed by this tick
    pub bars: Vec<Bar>,
}

/// Everything the market lock guards
#[derive(Debug)]
struct MarketState {
    sampler: Sampler,
    bar_builder: BarBuilder<BarBuffer>,
    reverse_builder: ReverseBarBuilder<BarBuffer>,
    matcher: OrderMatcher,
    current: Option<TopOfBook>,
    previous: Option<TopOfBook>,
    /// Earliest sample known, live or backfilled
    oldest: Option<TopOfBook>,
    history: BTreeMap<DateTime<Utc>, TopOfBook>,
    bars: BarMap,
    bid_order: Option<String>,
    ask_order: Option<String>,
}

/// Simulated venue for one instrument.
///
/// Every public operation takes the market lock for its full duration, so
/// order flow and simulation never observe a half-updated book. Events are
/// handed to the [`EventHandler`] after the lock is released.
pub struct Market {
    config: MarketConfig,
    state: Mutex<MarketState>,
    event_handler: Arc<dyn EventHandler>,
}

impl Market {
    pub fn new(config: MarketConfig, event_handler: Arc<dyn EventHandler>) -> MarketResult<Self> {
        config.validate()?;

        let sampler = Sampler::from_config(&config.sampler, config.seed)?;
        let period = config.bar_period();

        let state = MarketState {
            sampler,
            bar_builder: BarBuilder::new(period, BarBuffer::new()),
            reverse_builder: ReverseBarBuilder::new(period, BarBuffer::new()),
            matcher: OrderMatcher::new(config.symbol.clone()),
            current: None,
            previous: None,
            oldest: None,
            history: BTreeMap::new(),
            bars: BarMap::new(),
            bid_order: None,
            ask_order: None,
        };

        Ok(Self {
            config,
            state: Mutex::new(state),
            event_handler,
        })
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    /// Seed the market with its first quote and post the synthetic orders.
    ///
    /// Returns any fills the synthetic orders produced against resting
    /// client orders.
    pub fn open(&self, initial: TopOfBook) -> MarketResult<Vec<Order>> {
        if initial.symbol != self.config.symbol {
            return Err(MarketError::InvalidConfig(format!(
                "initial quote for {} on market {}",
                initial.symbol, self.config.symbol
            )));
        }
        if !(initial.bid_price > 0.0 && initial.ask_price > initial.bid_price) {
            return Err(MarketError::InvalidConfig(format!(
                "initial quote must have 0 < bid < ask, got {} / {}",
                initial.bid_price, initial.ask_price
            )));
        }

        let fills = {
            let mut state = self.state.lock();
            state.open(&self.config, initial.clone())
        };

        tracing::info!(
            symbol = %self.config.symbol,
            sampler = %self.sampler_name(),
            bid = initial.bid_price,
            ask = initial.ask_price,
            "market opened"
        );

        let mut events = vec![MarketEvent::TopOfBook(initial)];
        events.extend(fills.iter().cloned().map(MarketEvent::Fill));
        self.event_handler.on_events(events);

        Ok(fills)
    }

    /// Advance the simulation to the current wall-clock time
    pub fn simulate_next(&self) -> MarketResult<SimulationStep> {
        self.simulate_at(Utc::now())
    }

    /// Advance the simulation to `time`.
    ///
    /// Samples a new quote from the current one, records it in the history,
    /// feeds its mid into the bar builder and re-quotes the synthetic orders.
    pub fn simulate_at(&self, time: DateTime<Utc>) -> MarketResult<SimulationStep> {
        let step = {
            let mut state = self.state.lock();
            state.simulate(&self.config, time)?
        };

        let mut events = Vec::with_capacity(1 + step.fills.len() + step.bars.len());
        events.push(MarketEvent::TopOfBook(step.top_of_book.clone()));
        events.extend(step.fills.iter().cloned().map(MarketEvent::Fill));
        events.extend(step.bars.iter().copied().map(MarketEvent::Bar));
        self.event_handler.on_events(events);

        Ok(step)
    }

    /// Replace the synthetic orders whose price moved between `previous`
    /// and `current`, collecting resulting fills into `out`.
    ///
    /// A side without a live synthetic order is always re-quoted. Fills are
    /// only reported through `out`.
    pub fn update_quotes(
        &self,
        current: &TopOfBook,
        previous: Option<&TopOfBook>,
        out: &mut Vec<Order>,
    ) {
        let mut state = self.state.lock();
        state.update_quotes(&self.config, current, previous, out);
    }

    /// Backfill bars by walking the sampler backwards from the oldest known
    /// sample until `past_cutoff` is reached.
    ///
    /// Returns the number of bars added to the history.
    pub fn extend_bar_history(&self, past_cutoff: DateTime<Utc>) -> usize {
        let mut state = self.state.lock();
        state.extend_bar_history(&self.config, past_cutoff)
    }

    /// Bars with an end time in `[from, to]` as columnar JSON, together with
    /// the number of bars serialised.
    ///
    /// History is backfilled first when the bar ending at `from` is not
    /// known yet. The walk goes one sample past the start of that bar so the
    /// reverse builder completes it.
    pub fn get_bars_as_json(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> MarketResult<(String, usize)> {
        let mut state = self.state.lock();

        let oldest_end = state.bars.keys().next().copied();
        if oldest_end.map_or(true, |end| from < end) {
            let period = self.config.bar_period();
            let past_cutoff =
                floor_time(from - period, period) - self.config.history_sample_period();
            let added = state.extend_bar_history(&self.config, past_cutoff);
            tracing::debug!(%from, %past_cutoff, added, "bar history extended for query");
        }

        if from > to {
            return bars_to_json(std::iter::empty::<&Bar>());
        }
        bars_to_json(state.bars.range(from..=to).map(|(_, bar)| bar))
    }

    /// Bars with an end time in `[from, to]`, without backfilling
    pub fn bars(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Bar> {
        if from > to {
            return Vec::new();
        }
        let state = self.state.lock();
        state.bars.range(from..=to).map(|(_, bar)| *bar).collect()
    }

    /// Bar currently being built from live samples
    pub fn current_bar(&self) -> Option<Bar> {
        self.state.lock().bar_builder.current()
    }

    pub fn get_top_of_book(&self) -> MarketResult<TopOfBook> {
        self.state.lock().current.clone().ok_or(MarketError::EmptyBook)
    }

    /// Recorded quotes with a timestamp in `[from, to]`
    pub fn top_of_book_history(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<TopOfBook> {
        if from > to {
            return Vec::new();
        }
        let state = self.state.lock();
        state
            .history
            .range(from..=to)
            .map(|(_, top)| top.clone())
            .collect()
    }

    /// Submit a client order; fills are also sent to the event handler
    pub fn insert_order(&self, order: Order) -> MarketResult<InsertOutcome> {
        let outcome = {
            let mut state = self.state.lock();
            let outcome = state.matcher.insert(order)?;
            state.forget_closed_quotes();
            outcome
        };

        if !outcome.fills.is_empty() {
            self.event_handler
                .on_events(outcome.fills.iter().cloned().map(MarketEvent::Fill).collect());
        }
        Ok(outcome)
    }

    /// Cancel a resting order, returning its cancelled copy
    pub fn cancel_order(&self, side: Side, client_order_id: &str) -> MarketResult<Order> {
        let mut state = self.state.lock();
        let order = state
            .matcher
            .erase(side, client_order_id)
            .ok_or_else(|| MarketError::NotFound {
                side,
                id: client_order_id.to_string(),
            })?;
        state.forget_closed_quotes();
        Ok(order)
    }

    pub fn find_order(&self, side: Side, client_order_id: &str) -> MarketResult<Order> {
        let state = self.state.lock();
        state.matcher.find(side, client_order_id).cloned()
    }

    /// Aggregated book, one row per price tier
    pub fn book_levels(&self, valuation: Valuation) -> MarketResult<Vec<BookLevel>> {
        let state = self.state.lock();
        if state.current.is_none() {
            return Err(MarketError::EmptyBook);
        }
        Ok(state.matcher.book_levels(|order| valuation.value(order)))
    }

    /// The live synthetic bid and ask orders
    pub fn quote_orders(&self) -> (Option<Order>, Option<Order>) {
        let state = self.state.lock();
        let lookup = |side, id: &Option<String>| {
            id.as_deref()
                .and_then(|id| state.matcher.find(side, id).ok())
                .cloned()
        };
        (
            lookup(Side::Buy, &state.bid_order),
            lookup(Side::Sell, &state.ask_order),
        )
    }

    fn sampler_name(&self) -> String {
        self.state.lock().sampler.name().to_string()
    }
}

impl MarketState {
    fn open(&mut self, config: &MarketConfig, initial: TopOfBook) -> Vec<Order> {
        self.oldest = Some(initial.clone());
        self.previous = None;
        self.record(initial.clone(), config);
        self.bar_builder.add(initial.timestamp, initial.mid());
        self.current = Some(initial.clone());

        let mut fills = Vec::new();
        self.update_quotes(config, &initial, None, &mut fills);
        fills
    }

    fn simulate(&mut self, config: &MarketConfig, time: DateTime<Utc>) -> MarketResult<SimulationStep> {
        let current = self.current.take().ok_or(MarketError::EmptyBook)?;
        if time < current.timestamp {
            tracing::warn!(%time, last = %current.timestamp, "simulation clock moved backwards");
        }

        let next = self.sampler.sample(&current, time);
        tracing::trace!(
            bid = next.bid_price,
            ask = next.ask_price,
            %time,
            "sampled quote"
        );

        self.record(next.clone(), config);

        self.bar_builder.add(time, next.mid());
        let bars = self.bar_builder.sink_mut().take();
        for bar in &bars {
            self.bars.insert(bar.end, *bar);
        }
        if config.prune_bars {
            self.prune_bars(time - config.history_age());
        }

        self.previous = Some(current);
        self.current = Some(next.clone());

        let mut fills = Vec::new();
        let previous = self.previous.clone();
        self.update_quotes(config, &next, previous.as_ref(), &mut fills);

        Ok(SimulationStep {
            top_of_book: next,
            fills,
            bars,
        })
    }

    fn record(&mut self, top: TopOfBook, config: &MarketConfig) {
        let cutoff = top.timestamp - config.history_age();
        self.history.insert(top.timestamp, top);
        self.history = self.history.split_off(&cutoff);
    }

    fn prune_bars(&mut self, cutoff: DateTime<Utc>) {
        let before = self.bars.len();
        self.bars = self.bars.split_off(&cutoff);
        let pruned = before - self.bars.len();
        if pruned > 0 {
            tracing::debug!(pruned, %cutoff, "pruned bars");
        }
    }

    fn update_quotes(
        &mut self,
        config: &MarketConfig,
        current: &TopOfBook,
        previous: Option<&TopOfBook>,
        out: &mut Vec<Order>,
    ) {
        self.forget_closed_quotes();

        let requote_bid = self.bid_order.is_none()
            || previous.map_or(true, |p| p.bid_price != current.bid_price);
        let requote_ask = self.ask_order.is_none()
            || previous.map_or(true, |p| p.ask_price != current.ask_price);

        // Withdraw first so the new bid never trades against the stale ask
        if requote_bid {
            self.withdraw(Side::Buy);
        }
        if requote_ask {
            self.withdraw(Side::Sell);
        }

        if requote_bid {
            self.bid_order = self.post(config, Side::Buy, current.bid_price, current.bid_volume, out);
        }
        if requote_ask {
            self.ask_order =
                self.post(config, Side::Sell, current.ask_price, current.ask_volume, out);
        }
    }

    fn withdraw(&mut self, side: Side) {
        let id = match side {
            Side::Buy => self.bid_order.take(),
            Side::Sell => self.ask_order.take(),
        };
        if let Some(id) = id {
            self.matcher.erase(side, &id);
        }
    }

    /// Post a fresh synthetic order on `side`.
    ///
    /// Returns the id of the new order if it rests in the book.
    fn post(
        &mut self,
        config: &MarketConfig,
        side: Side,
        price: f64,
        volume: f64,
        out: &mut Vec<Order>,
    ) -> Option<String> {
        let rounded_price = Decimal::from_f64(price).map(|p| p.round_dp(config.price_decimals));
        let rounded_quantity = Decimal::from_f64(volume).map(|q| q.round_dp(VOLUME_DECIMALS));
        let (price, quantity) = match (rounded_price, rounded_quantity) {
            (Some(p), Some(q)) if p > Decimal::ZERO && q > Decimal::ZERO => (p, q),
            _ => {
                tracing::warn!(?side, price, volume, "quote not representable, side left empty");
                return None;
            },
        };

        let id = Uuid::new_v4().to_string();
        let order = Order::limit(
            id.clone(),
            config.symbol.clone(),
            MARKET_MAKER_OWNER,
            side,
            price,
            quantity,
        );

        match self.matcher.insert(order) {
            Ok(outcome) => {
                tracing::debug!(
                    ?side,
                    %price,
                    %quantity,
                    matches = outcome.match_count,
                    "synthetic quote refreshed"
                );
                out.extend(outcome.fills);
                outcome.resting.map(|_| id)
            },
            Err(err) => {
                tracing::warn!(?side, %err, "synthetic quote rejected");
                None
            },
        }
    }

    /// Drop ids of synthetic orders that have been filled or cancelled
    fn forget_closed_quotes(&mut self) {
        if let Some(id) = &self.bid_order {
            if self.matcher.find(Side::Buy, id).is_err() {
                self.bid_order = None;
            }
        }
        if let Some(id) = &self.ask_order {
            if self.matcher.find(Side::Sell, id).is_err() {
                self.ask_order = None;
            }
        }
    }

    fn extend_bar_history(&mut self, config: &MarketConfig, past_cutoff: DateTime<Utc>) -> usize {
        let Some(mut top) = self.oldest.clone() else {
            tracing::warn!("bar history requested before the market opened");
            return 0;
        };
        if top.timestamp <= past_cutoff {
            return 0;
        }

        if self.reverse_builder.last_time().is_none() {
            self.reverse_builder.add(top.timestamp, top.mid());
        }

        let step = config.history_sample_period();
        let mut steps = 0;
        while top.timestamp > past_cutoff {
            if steps == MAX_BACKFILL_STEPS {
                tracing::warn!(%past_cutoff, reached = %top.timestamp, "backfill step limit reached");
                break;
            }
            let time = top.timestamp - step;
            top = self.sampler.sample(&top, time);
            self.reverse_builder.add(time, top.mid());
            steps += 1;
        }
        self.oldest = Some(top);

        let mut added = 0;
        for bar in self.reverse_builder.sink_mut().take() {
            // Live bars take precedence over backfilled ones
            if let std::collections::btree_map::Entry::Vacant(entry) = self.bars.entry(bar.end) {
                entry.insert(bar);
                added += 1;
            }
        }
        tracing::debug!(steps, added, "bar history extended");
        added
    }
}
