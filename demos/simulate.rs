// ============================================================================
// Simulation Example
// ============================================================================
//
// One thread advances the market on a virtual clock, one thread feeds client
// orders through a bounded queue, and the main thread drains market events.
//
// Run with: cargo run --example simulate --features logging

use chrono::{TimeDelta, Utc};
use market_sim::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

const TICKS: i64 = 600;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting market simulation example");

    let events = QueueEventHandler::default();
    let market = Arc::new(
        MarketBuilder::new("EURUSD")
            .bar_period(TimeDelta::seconds(60))
            .history_age(TimeDelta::hours(1))
            .seed(2024)
            .build(Arc::new(events.clone()))?,
    );

    let start = Utc::now();
    market.open(TopOfBook::new("EURUSD", start, 1.0850, 5.0, 1.0852, 5.0))?;

    // Client order flow, throttled by a bounded queue
    let orders: BoundedQueue<Order> = BoundedQueue::new(16);
    let client = {
        let orders = orders.clone();
        thread::spawn(move || {
            for i in 0..40 {
                let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
                let offset = Decimal::new((i % 5) as i64, 4);
                let price = match side {
                    Side::Buy => Decimal::new(10851, 4) + offset,
                    Side::Sell => Decimal::new(10851, 4) - offset,
                };
                let order = Order::limit(
                    format!("client-{}", i),
                    "EURUSD",
                    "demo-client",
                    side,
                    price,
                    Decimal::from(1 + i % 3),
                );
                if let Err(order) = orders.push_timeout(order, Duration::from_secs(1)) {
                    warn!(id = %order.client_order_id, "order flow stalled, dropping order");
                }
            }
        })
    };

    // Simulation driver on a virtual one-second clock
    let simulator = {
        let market = Arc::clone(&market);
        let orders = orders.clone();
        thread::spawn(move || -> MarketResult<()> {
            for tick in 1..=TICKS {
                market.simulate_at(start + TimeDelta::seconds(tick))?;
                orders.drain(|order| {
                    if let Err(err) = market.insert_order(order) {
                        warn!(%err, "client order rejected");
                    }
                });
            }
            Ok(())
        })
    };

    client.join().map_err(|_| "client thread panicked")?;
    simulator.join().map_err(|_| "simulator thread panicked")??;

    let mut fills = 0;
    let mut bars = 0;
    while let Some(event) = events.queue().pop_timeout(Duration::from_millis(50)) {
        match event {
            MarketEvent::Fill(order) if order.owner != MARKET_MAKER_OWNER => {
                fills += 1;
                info!(
                    id = %order.client_order_id,
                    price = %order.last_executed_price(),
                    quantity = %order.last_executed_quantity(),
                    "client fill"
                );
            },
            MarketEvent::Bar(_) => bars += 1,
            _ => {},
        }
    }
    info!(fills, bars, "events drained");

    let top = market.get_top_of_book()?;
    info!(bid = top.bid_price, ask = top.ask_price, "final quote");

    println!("\n=== Order Book ===");
    for level in market.book_levels(Valuation::OpenQuantity)? {
        println!(
            "  {:>10} {:>12?} | {:<12?} {:<10}",
            level.bid_value, level.bid_price, level.ask_price, level.ask_value
        );
    }

    // Ask for an hour of bars; the part before the open is backfilled
    let (json, count) =
        market.get_bars_as_json(start - TimeDelta::minutes(50), start + TimeDelta::seconds(TICKS))?;
    println!("\n=== Bar History ===");
    println!("{} bars, {} bytes of JSON", count, json.len());

    Ok(())
}
