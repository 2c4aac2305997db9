// ============================================================================
// Market Flow Integration Tests
// ============================================================================

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use market_sim::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::thread;

fn start() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn open_market(config: MarketConfig, handler: Arc<dyn EventHandler>) -> Arc<Market> {
    let market = Arc::new(Market::new(config, handler).unwrap());
    market
        .open(TopOfBook::new("EURUSD", start(), 1.1000, 10.0, 1.1002, 10.0))
        .unwrap();
    market
}

#[test]
fn test_concurrent_order_flow_and_simulation() {
    let handler = Arc::new(QueueEventHandler::default());
    let market = open_market(
        MarketConfig::fx_style("EURUSD".to_string()).with_seed(5),
        handler.clone(),
    );

    let simulator = {
        let market = Arc::clone(&market);
        thread::spawn(move || {
            for tick in 1..=300 {
                market
                    .simulate_at(start() + TimeDelta::seconds(tick))
                    .unwrap();
            }
        })
    };

    let clients: Vec<_> = (0..4)
        .map(|c| {
            let market = Arc::clone(&market);
            thread::spawn(move || {
                for i in 0..50 {
                    let side = if (c + i) % 2 == 0 { Side::Buy } else { Side::Sell };
                    let order = Order::limit(
                        format!("c{}-{}", c, i),
                        "EURUSD",
                        format!("client{}", c),
                        side,
                        Decimal::new(10996 + (i % 10) as i64, 4),
                        Decimal::ONE,
                    );
                    market.insert_order(order).unwrap();
                    if i % 7 == 0 {
                        // May already have traded away
                        let _ = market.cancel_order(side, &format!("c{}-{}", c, i));
                    }
                }
            })
        })
        .collect();

    simulator.join().unwrap();
    for client in clients {
        client.join().unwrap();
    }

    // Never left crossed by any interleaving
    let levels = market.book_levels(Valuation::OpenQuantity).unwrap();
    if let Some(top) = levels.first() {
        if let (Some(bid), Some(ask)) = (top.bid_price, top.ask_price) {
            assert!(bid < ask);
        }
    }

    let mut quotes = 0;
    handler.queue().drain(|event| {
        if let MarketEvent::Fill(order) = event {
            assert_eq!(
                order.open_quantity() + order.executed_quantity(),
                order.quantity
            );
        } else if let MarketEvent::TopOfBook(_) = event {
            quotes += 1;
        }
    });
    assert_eq!(quotes, 301);
    assert_eq!(market.get_top_of_book().unwrap().timestamp, start() + TimeDelta::seconds(300));
}

#[test]
fn test_history_query_backfills_before_open() {
    let market = open_market(
        MarketConfig::white_noise("EURUSD".to_string(), 0.005)
            .with_seed(3)
            .with_bar_period(TimeDelta::minutes(1)),
        Arc::new(NoOpEventHandler),
    );
    for tick in 1..=10 {
        market
            .simulate_at(start() + TimeDelta::seconds(tick * 30))
            .unwrap();
    }

    let from = start() - TimeDelta::minutes(30);
    let to = start() + TimeDelta::minutes(5);
    let (json, count) = market.get_bars_as_json(from, to).unwrap();
    let bars = bars_from_json(&json, TimeDelta::minutes(1)).unwrap();

    assert_eq!(bars.len(), count);
    assert!(count >= 34);
    assert!(bars.values().all(Bar::is_well_formed));
    assert!(bars.keys().all(|end| *end >= from && *end <= to));

    // Same query again is served from history
    let (again, again_count) = market.get_bars_as_json(from, to).unwrap();
    assert_eq!((again, again_count), (json, count));
}

#[test]
fn test_quote_book_one_sided() {
    let mut book = Book::new("EURUSD");
    book.update_book(1.1000, 3.0, true);

    assert!(matches!(book.top(), Err(MarketError::EmptyBook)));
    assert!(book.spread().is_nan());

    book.update_book(1.1002, 4.0, false);
    let top = book.top().unwrap();
    assert_eq!((top.bid_price, top.ask_price), (1.1000, 1.1002));

    // Size zero removes the level
    book.update_book(1.1000, 0.0, true);
    assert!(book.best_bid().is_err());
}
