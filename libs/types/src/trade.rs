//! Trade execution types

use serde::{Deserialize, Serialize};

use crate::ids::{OrderId, SymbolId, TradeId, UserId};
use crate::numeric::{Price, Quantity};

/// A single fill between a resting maker order and an incoming taker.
///
/// The execution price is always the maker's resting price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub symbol_id: SymbolId,
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub maker_user_id: UserId,
    pub taker_user_id: UserId,
    pub price: Price,
    pub quantity: Quantity,
    /// Unix milliseconds at execution.
    pub timestamp: i64,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol_id: SymbolId,
        maker_order_id: OrderId,
        taker_order_id: OrderId,
        maker_user_id: UserId,
        taker_user_id: UserId,
        price: Price,
        quantity: Quantity,
        timestamp: i64,
    ) -> Self {
        Self {
            trade_id: TradeId::new(),
            symbol_id,
            maker_order_id,
            taker_order_id,
            maker_user_id,
            taker_user_id,
            price,
            quantity,
            timestamp,
        }
    }
}
