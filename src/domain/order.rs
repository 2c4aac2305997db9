// ============================================================================
// Order Domain Model
// ============================================================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

/// Opaque reference to an order resting in an [`OrderMatcher`].
///
/// Handles stay valid while the order rests; once it is filled or erased
/// the handle resolves to nothing, even if the underlying slot is reused.
///
/// [`OrderMatcher`]: crate::engine::OrderMatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderHandle {
    pub(crate) key: usize,
    pub(crate) sequence: u64,
}

// ============================================================================
// Order State Machine
// ============================================================================

pub mod state {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum OrderState {
        New,
        PartiallyFilled,
        Filled,
        Cancelled,
    }

    impl OrderState {
        pub fn is_terminal(&self) -> bool {
            matches!(self, OrderState::Filled | OrderState::Cancelled)
        }

        pub fn can_be_cancelled(&self) -> bool {
            matches!(self, OrderState::New | OrderState::PartiallyFilled)
        }
    }

    /// Valid state transitions for the order state machine
    #[derive(Debug, Clone, Copy)]
    pub enum OrderStateTransition {
        PartialFill,
        Fill,
        Cancel,
    }

    impl OrderState {
        pub fn transition(&self, transition: OrderStateTransition) -> Result<OrderState, String> {
            match (self, transition) {
                (OrderState::New, OrderStateTransition::PartialFill)
                | (OrderState::PartiallyFilled, OrderStateTransition::PartialFill) => {
                    Ok(OrderState::PartiallyFilled)
                },
                (OrderState::New, OrderStateTransition::Fill)
                | (OrderState::PartiallyFilled, OrderStateTransition::Fill) => Ok(OrderState::Filled),
                (OrderState::New, OrderStateTransition::Cancel)
                | (OrderState::PartiallyFilled, OrderStateTransition::Cancel) => {
                    Ok(OrderState::Cancelled)
                },

                _ => Err(format!(
                    "Invalid transition from {:?} via {:?}",
                    self, transition
                )),
            }
        }
    }
}

// ============================================================================
// Order Entity
// ============================================================================

/// Client order with its execution state.
///
/// `open_quantity + executed_quantity == quantity` holds for every order that
/// has not been cancelled. Cancelling moves the open quantity into
/// `cancelled_quantity`, so `open + executed + cancelled == quantity` always.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub client_order_id: String,
    pub symbol: String,
    pub owner: String,
    pub target: String,
    pub side: Side,
    pub order_type: OrderType,
    /// Limit price; `None` for market orders
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub timestamp: DateTime<Utc>,

    open_quantity: Decimal,
    executed_quantity: Decimal,
    cancelled_quantity: Decimal,
    avg_executed_price: Decimal,
    last_executed_price: Decimal,
    last_executed_quantity: Decimal,
    state: state::OrderState,
}

impl Order {
    pub fn new(
        client_order_id: impl Into<String>,
        symbol: impl Into<String>,
        owner: impl Into<String>,
        target: impl Into<String>,
        side: Side,
        order_type: OrderType,
        price: Option<Decimal>,
        quantity: Decimal,
    ) -> Self {
        Self {
            client_order_id: client_order_id.into(),
            symbol: symbol.into(),
            owner: owner.into(),
            target: target.into(),
            side,
            order_type,
            price,
            quantity,
            timestamp: Utc::now(),
            open_quantity: quantity,
            executed_quantity: Decimal::ZERO,
            cancelled_quantity: Decimal::ZERO,
            avg_executed_price: Decimal::ZERO,
            last_executed_price: Decimal::ZERO,
            last_executed_quantity: Decimal::ZERO,
            state: state::OrderState::New,
        }
    }

    /// Create a limit order with empty routing tags
    pub fn limit(
        client_order_id: impl Into<String>,
        symbol: impl Into<String>,
        owner: impl Into<String>,
        side: Side,
        price: Decimal,
        quantity: Decimal,
    ) -> Self {
        Self::new(
            client_order_id,
            symbol,
            owner,
            String::new(),
            side,
            OrderType::Limit,
            Some(price),
            quantity,
        )
    }

    /// Create a market order with empty routing tags
    pub fn market(
        client_order_id: impl Into<String>,
        symbol: impl Into<String>,
        owner: impl Into<String>,
        side: Side,
        quantity: Decimal,
    ) -> Self {
        Self::new(
            client_order_id,
            symbol,
            owner,
            String::new(),
            side,
            OrderType::Market,
            None,
            quantity,
        )
    }

    /// Builder method: set the routing target tag
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    // ========================================================================
    // Getters
    // ========================================================================

    pub fn open_quantity(&self) -> Decimal {
        self.open_quantity
    }

    pub fn executed_quantity(&self) -> Decimal {
        self.executed_quantity
    }

    pub fn cancelled_quantity(&self) -> Decimal {
        self.cancelled_quantity
    }

    pub fn avg_executed_price(&self) -> Decimal {
        self.avg_executed_price
    }

    pub fn last_executed_price(&self) -> Decimal {
        self.last_executed_price
    }

    pub fn last_executed_quantity(&self) -> Decimal {
        self.last_executed_quantity
    }

    pub fn state(&self) -> state::OrderState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.open_quantity.is_zero()
    }

    pub fn is_market_order(&self) -> bool {
        matches!(self.order_type, OrderType::Market)
    }

    pub fn is_limit_order(&self) -> bool {
        matches!(self.order_type, OrderType::Limit)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Whether a fill of `quantity` at `price` would be accepted by
    /// [`execute`](Self::execute).
    pub fn can_execute(&self, price: Decimal, quantity: Decimal) -> bool {
        self.fill_transition(quantity).is_some() && self.average_after(price, quantity).is_some()
    }

    /// Fill `quantity` at `price`.
    ///
    /// Returns false (leaving the order untouched) when the quantity is not
    /// positive, exceeds the open quantity or the fill notional overflows.
    pub fn execute(&mut self, price: Decimal, quantity: Decimal) -> bool {
        let Some(next) = self.fill_transition(quantity) else {
            return false;
        };
        let Some(avg_executed_price) = self.average_after(price, quantity) else {
            tracing::warn!(
                id = %self.client_order_id,
                %price,
                %quantity,
                "fill notional out of range"
            );
            return false;
        };

        self.avg_executed_price = avg_executed_price;
        self.open_quantity -= quantity;
        self.executed_quantity += quantity;
        self.last_executed_price = price;
        self.last_executed_quantity = quantity;
        self.state = next;

        debug_assert_eq!(
            self.open_quantity + self.executed_quantity,
            self.quantity,
            "fill broke quantity conservation"
        );
        true
    }

    fn fill_transition(&self, quantity: Decimal) -> Option<state::OrderState> {
        if quantity <= Decimal::ZERO || quantity > self.open_quantity {
            return None;
        }
        let transition = if quantity == self.open_quantity {
            state::OrderStateTransition::Fill
        } else {
            state::OrderStateTransition::PartialFill
        };
        self.state.transition(transition).ok()
    }

    /// Volume weighted price over all fills including this one
    fn average_after(&self, price: Decimal, quantity: Decimal) -> Option<Decimal> {
        let notional = quantity
            .checked_mul(price)?
            .checked_add(self.avg_executed_price.checked_mul(self.executed_quantity)?)?;
        notional.checked_div(quantity.checked_add(self.executed_quantity)?)
    }

    /// Cancel the remaining open quantity.
    ///
    /// Returns false if the order was already closed.
    pub fn cancel(&mut self) -> bool {
        match self.state.transition(state::OrderStateTransition::Cancel) {
            Ok(next) => {
                self.cancelled_quantity += self.open_quantity;
                self.open_quantity = Decimal::ZERO;
                self.state = next;
                true
            },
            Err(_) => false,
        }
    }
}
