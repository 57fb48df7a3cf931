//! Order lifecycle types
//!
//! [`OrderIntent`] is the validated inbound command (create or cancel) that
//! gets journaled; [`Order`] is the engine-side working copy that tracks
//! fills and may rest on the book.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::ids::{OrderId, SymbolId, UserId};
use crate::numeric::{Price, Quantity};

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side a taker on `self` consumes liquidity from.
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Executes at `price` or better, may rest.
    Limit,
    /// Executes against whatever liquidity exists, never rests.
    Market,
}

/// Time-in-force policy for limit orders.
///
/// Market orders carry no effective time-in-force; any value supplied is
/// ignored at match time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-till-cancel: unfilled remainder rests on the book.
    Gtc,
    /// Immediate-or-cancel: fill what crosses now, discard the rest.
    Ioc,
    /// Fill-or-kill: execute in full immediately or not at all.
    Fok,
}

/// Kind of inbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    OrderCreate,
    OrderCancel,
}

/// A validated inbound order command.
///
/// This is the unit of durability: intents are appended to the WAL before
/// acknowledgement and replayed verbatim during recovery. Optional fields
/// are absent for cancels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Upstream message id, for log correlation only.
    pub message_id: Uuid,
    pub message_type: MessageType,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub symbol_id: SymbolId,
    pub order_type: Option<OrderType>,
    pub side: Option<Side>,
    pub price: Option<Price>,
    pub quantity: Option<Quantity>,
    pub time_in_force: Option<TimeInForce>,
    /// Unix milliseconds at ingestion.
    pub timestamp: i64,
}

impl OrderIntent {
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        order_id: OrderId,
        user_id: UserId,
        symbol_id: SymbolId,
        order_type: OrderType,
        side: Side,
        price: Option<Price>,
        quantity: Quantity,
        time_in_force: Option<TimeInForce>,
        timestamp: i64,
    ) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            message_type: MessageType::OrderCreate,
            order_id,
            user_id,
            symbol_id,
            order_type: Some(order_type),
            side: Some(side),
            price,
            quantity: Some(quantity),
            time_in_force,
            timestamp,
        }
    }

    pub fn cancel(order_id: OrderId, user_id: UserId, symbol_id: SymbolId, timestamp: i64) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            message_type: MessageType::OrderCancel,
            order_id,
            user_id,
            symbol_id,
            order_type: None,
            side: None,
            price: None,
            quantity: None,
            time_in_force: None,
            timestamp,
        }
    }
}

/// An order inside the engine.
///
/// `price` is `None` for market orders, which therefore can never become
/// resting book entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub symbol_id: SymbolId,
    pub order_type: OrderType,
    pub side: Side,
    pub price: Option<Price>,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub time_in_force: Option<TimeInForce>,
    /// Unix milliseconds at ingestion, used for time priority audit only;
    /// queue position is what actually enforces priority.
    pub created_at: i64,
}

impl Order {
    pub fn remaining_quantity(&self) -> Quantity {
        self.quantity - self.filled_quantity
    }

    pub fn is_filled(&self) -> bool {
        self.filled_quantity >= self.quantity
    }

    pub fn add_fill(&mut self, quantity: Quantity) {
        self.filled_quantity += quantity;
    }
}
