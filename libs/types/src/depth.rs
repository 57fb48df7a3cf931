//! Market depth messages published after book changes

use serde::{Deserialize, Serialize};

use crate::ids::SymbolId;
use crate::numeric::{Price, Quantity};

/// Aggregate liquidity at one price level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceQuantity {
    pub price: Price,
    pub quantity: Quantity,
}

/// Top-of-book depth snapshot.
///
/// Bids are ordered best (highest) first, asks best (lowest) first.
/// Empty levels are never included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookDepth {
    pub symbol_id: SymbolId,
    pub bids: Vec<PriceQuantity>,
    pub asks: Vec<PriceQuantity>,
    /// Unix milliseconds when the snapshot was taken.
    pub timestamp: i64,
}

impl BookDepth {
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }
}
