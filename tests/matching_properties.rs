// ============================================================================
// Matching Property Tests
// ============================================================================

use market_sim::prelude::*;
use proptest::prelude::*;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
enum Op {
    Insert { buy: bool, price: i64, quantity: i64 },
    Market { buy: bool, quantity: i64 },
    Cancel { buy: bool, nth: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (any::<bool>(), 95i64..=105, 1i64..=10)
            .prop_map(|(buy, price, quantity)| Op::Insert { buy, price, quantity }),
        1 => (any::<bool>(), 1i64..=15).prop_map(|(buy, quantity)| Op::Market { buy, quantity }),
        2 => (any::<bool>(), 0usize..50).prop_map(|(buy, nth)| Op::Cancel { buy, nth }),
    ]
}

fn side(buy: bool) -> Side {
    if buy {
        Side::Buy
    } else {
        Side::Sell
    }
}

fn assert_conserved(order: &Order) {
    assert_eq!(
        order.open_quantity() + order.executed_quantity() + order.cancelled_quantity(),
        order.quantity,
        "quantity leak on {}",
        order.client_order_id
    );
    if order.cancelled_quantity().is_zero() {
        assert_eq!(order.open_quantity() + order.executed_quantity(), order.quantity);
    }
    assert!(order.open_quantity() >= Decimal::ZERO);
}

proptest! {
    #[test]
    fn quantity_is_conserved_and_book_never_crosses(ops in prop::collection::vec(op(), 1..120)) {
        let mut matcher = OrderMatcher::new("TEST");
        let mut live: Vec<(Side, String)> = Vec::new();

        for (i, op) in ops.into_iter().enumerate() {
            let id = format!("o{}", i);
            match op {
                Op::Insert { buy, price, quantity } => {
                    let order = Order::limit(
                        id.clone(), "TEST", "p", side(buy),
                        Decimal::from(price), Decimal::from(quantity),
                    );
                    let outcome = matcher.insert(order).unwrap();
                    prop_assert_eq!(outcome.fills.len(), outcome.match_count * 2);
                    outcome.fills.iter().for_each(assert_conserved);
                    if let Some(handle) = outcome.resting {
                        let resting = matcher.get(handle).unwrap();
                        assert_conserved(resting);
                        live.push((side(buy), id));
                    }
                },
                Op::Market { buy, quantity } => {
                    let order = Order::market(id, "TEST", "p", side(buy), Decimal::from(quantity));
                    let outcome = matcher.insert(order).unwrap();
                    prop_assert!(outcome.resting.is_none());
                    outcome.fills.iter().for_each(assert_conserved);
                },
                Op::Cancel { buy, nth } => {
                    let candidates: Vec<_> = live.iter().filter(|(s, _)| *s == side(buy)).collect();
                    if let Some((s, id)) = candidates.get(nth % candidates.len().max(1)) {
                        if let Some(order) = matcher.erase(*s, id) {
                            assert_conserved(&order);
                            prop_assert!(order.is_closed());
                        }
                    }
                },
            }

            if let (Some(bid), Some(ask)) = (matcher.best_bid(), matcher.best_ask()) {
                prop_assert!(bid < ask, "crossed book {} >= {}", bid, ask);
            }
        }
    }

    #[test]
    fn equal_price_orders_fill_in_arrival_order(count in 2usize..20, take in 1usize..20) {
        let mut matcher = OrderMatcher::new("TEST");
        for i in 0..count {
            let order = Order::limit(
                format!("s{}", i), "TEST", "p", Side::Sell, Decimal::from(100), Decimal::ONE,
            );
            matcher.insert(order).unwrap();
        }

        let take = take.min(count);
        let aggressor = Order::limit(
            "b", "TEST", "p", Side::Buy, Decimal::from(100), Decimal::from(take as i64),
        );
        let outcome = matcher.insert(aggressor).unwrap();

        let makers: Vec<String> = outcome
            .fills
            .iter()
            .step_by(2)
            .map(|order| order.client_order_id.clone())
            .collect();
        let expected: Vec<String> = (0..take).map(|i| format!("s{}", i)).collect();
        prop_assert_eq!(makers, expected);
    }
}

#[test]
fn test_aggressive_sell_leaves_remainder_as_best_ask() {
    let mut matcher = OrderMatcher::new("TEST");
    let limit = |id: &str, owner: &str, side, price: i64, quantity: i64| {
        Order::limit(id, "TEST", owner, side, Decimal::from(price), Decimal::from(quantity))
    };

    matcher.insert(limit("b1", "c", Side::Buy, 100, 2)).unwrap();
    matcher.insert(limit("s1", "c", Side::Sell, 110, 1)).unwrap();
    let outcome = matcher
        .insert(limit("s2", "market-owner", Side::Sell, 90, 10))
        .unwrap();

    assert_eq!(outcome.fills[0].client_order_id, "b1");
    assert!(outcome.fills[0].is_closed());
    assert_eq!(outcome.fills[0].avg_executed_price(), Decimal::from(100));

    let rested = matcher.find(Side::Sell, "s2").unwrap();
    assert_eq!(rested.open_quantity(), Decimal::from(8));
    assert_eq!(matcher.best_ask(), Some(Decimal::from(90)));
}
