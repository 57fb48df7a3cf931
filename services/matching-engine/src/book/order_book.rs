//! Per-instrument limit order book
//!
//! Two `BTreeMap`s of price levels (bids iterated descending, asks
//! ascending) plus an order-id index for O(log n) cancels. The book also
//! carries the WAL watermark of the last command applied to it, which is
//! what ties a snapshot of this struct back to a replay start position.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;
use types::depth::{BookDepth, PriceQuantity};
use types::ids::{OrderId, SymbolId};
use types::numeric::Price;
use types::order::{Order, Side};
use types::time::unix_millis;

use crate::book::price_level::PriceLevel;

/// A single instrument's order book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    symbol_id: SymbolId,
    /// Bid levels, best bid is the last (highest) key
    bids: BTreeMap<Price, PriceLevel>,
    /// Ask levels, best ask is the first (lowest) key
    asks: BTreeMap<Price, PriceLevel>,
    /// Order id to book location, for cancels and lookups
    index: BTreeMap<OrderId, (Side, Price)>,
    /// Sequence of the last WAL command applied to this book
    last_applied_wal_seq: u64,
}

impl OrderBook {
    pub fn new(symbol_id: SymbolId) -> Self {
        Self {
            symbol_id,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: BTreeMap::new(),
            last_applied_wal_seq: 0,
        }
    }

    pub fn symbol_id(&self) -> SymbolId {
        self.symbol_id
    }

    /// Rest an order on the book.
    ///
    /// Priceless (market) orders can never rest; they are refused with a
    /// warning rather than panicking, since the matcher is the only caller
    /// and never passes one.
    pub fn add_order(&mut self, order: Order) {
        let Some(price) = order.price else {
            warn!(order_id = %order.order_id, "order without a price cannot rest on the book");
            return;
        };
        let order_id = order.order_id;
        let side = order.side;
        self.side_mut(side)
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .push_back(order);
        self.index.insert(order_id, (side, price));
    }

    /// Remove a resting order, returning it if present.
    pub fn remove_order(&mut self, order_id: OrderId) -> Option<Order> {
        let (side, price) = self.index.remove(&order_id)?;
        let levels = self.side_mut(side);
        let order = levels.get_mut(&price)?.remove(order_id);
        if levels.get(&price).is_some_and(PriceLevel::is_empty) {
            levels.remove(&price);
        }
        order
    }

    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        let (side, price) = self.index.get(&order_id)?;
        self.side(*side).get(price)?.get(order_id)
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// Number of resting orders across both sides.
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    /// Aggregate depth snapshot, best levels first, up to `levels` per side.
    pub fn depth(&self, levels: usize) -> BookDepth {
        let entry = |(price, level): (&Price, &PriceLevel)| PriceQuantity {
            price: *price,
            quantity: level.total_quantity(),
        };
        BookDepth {
            symbol_id: self.symbol_id,
            bids: self
                .bids
                .iter()
                .rev()
                .filter(|(_, l)| !l.is_empty())
                .take(levels)
                .map(entry)
                .collect(),
            asks: self
                .asks
                .iter()
                .filter(|(_, l)| !l.is_empty())
                .take(levels)
                .map(entry)
                .collect(),
            timestamp: unix_millis(),
        }
    }

    /// Full deep copy for snapshotting; the clone shares nothing with the
    /// live book.
    pub fn deep_copy(&self) -> OrderBook {
        self.clone()
    }

    pub fn last_applied_wal_seq(&self) -> u64 {
        self.last_applied_wal_seq
    }

    /// Advance the watermark after applying a WAL command. Never moves
    /// backwards.
    pub fn advance_watermark(&mut self, seq: u64) {
        if seq > self.last_applied_wal_seq {
            self.last_applied_wal_seq = seq;
        }
    }

    pub(crate) fn levels(&self, side: Side) -> &BTreeMap<Price, PriceLevel> {
        self.side(side)
    }

    /// Best price on the given book side (highest bid, lowest ask).
    pub(crate) fn best_price(&self, side: Side) -> Option<Price> {
        match side {
            Side::Buy => self.best_bid(),
            Side::Sell => self.best_ask(),
        }
    }

    pub(crate) fn level_mut(&mut self, side: Side, price: Price) -> Option<&mut PriceLevel> {
        self.side_mut(side).get_mut(&price)
    }

    /// Drop the level at `price` if it has no orders left.
    pub(crate) fn prune_level(&mut self, side: Side, price: Price) {
        let levels = self.side_mut(side);
        if levels.get(&price).is_some_and(PriceLevel::is_empty) {
            levels.remove(&price);
        }
    }

    pub(crate) fn unindex(&mut self, order_id: OrderId) {
        self.index.remove(&order_id);
    }

    fn side(&self, side: Side) -> &BTreeMap<Price, PriceLevel> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Price, PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::UserId;
    use types::numeric::Quantity;
    use types::order::{OrderType, TimeInForce};

    fn order(id: u64, side: Side, price: u64, qty: u64) -> Order {
        Order {
            order_id: OrderId::new(id),
            user_id: UserId::new(1),
            symbol_id: SymbolId::new(1),
            order_type: OrderType::Limit,
            side,
            price: Some(Price::from_u64(price)),
            quantity: Quantity::from_u64(qty),
            filled_quantity: Quantity::zero(),
            time_in_force: Some(TimeInForce::Gtc),
            created_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_best_bid_is_highest() {
        let mut book = OrderBook::new(SymbolId::new(1));
        book.add_order(order(1, Side::Buy, 100, 1));
        book.add_order(order(2, Side::Buy, 102, 1));
        book.add_order(order(3, Side::Buy, 101, 1));

        assert_eq!(book.best_bid(), Some(Price::from_u64(102)));
    }

    #[test]
    fn test_best_ask_is_lowest() {
        let mut book = OrderBook::new(SymbolId::new(1));
        book.add_order(order(1, Side::Sell, 105, 1));
        book.add_order(order(2, Side::Sell, 103, 1));

        assert_eq!(book.best_ask(), Some(Price::from_u64(103)));
    }

    #[test]
    fn test_remove_order_prunes_empty_level() {
        let mut book = OrderBook::new(SymbolId::new(1));
        book.add_order(order(1, Side::Buy, 100, 1));

        let removed = book.remove_order(OrderId::new(1)).unwrap();
        assert_eq!(removed.order_id, OrderId::new(1));
        assert_eq!(book.best_bid(), None);
        assert!(!book.contains(OrderId::new(1)));
    }

    #[test]
    fn test_remove_missing_order() {
        let mut book = OrderBook::new(SymbolId::new(1));
        assert!(book.remove_order(OrderId::new(42)).is_none());
    }

    #[test]
    fn test_get_order() {
        let mut book = OrderBook::new(SymbolId::new(1));
        book.add_order(order(7, Side::Sell, 101, 3));

        let found = book.get_order(OrderId::new(7)).unwrap();
        assert_eq!(found.quantity, Quantity::from_u64(3));
        assert!(book.get_order(OrderId::new(8)).is_none());
    }

    #[test]
    fn test_depth_ordering_and_aggregation() {
        let mut book = OrderBook::new(SymbolId::new(1));
        book.add_order(order(1, Side::Buy, 100, 1));
        book.add_order(order(2, Side::Buy, 100, 2));
        book.add_order(order(3, Side::Buy, 99, 5));
        book.add_order(order(4, Side::Sell, 101, 4));
        book.add_order(order(5, Side::Sell, 102, 6));

        let depth = book.depth(10);
        assert_eq!(depth.bids.len(), 2);
        assert_eq!(depth.bids[0].price, Price::from_u64(100));
        assert_eq!(depth.bids[0].quantity, Quantity::from_u64(3));
        assert_eq!(depth.bids[1].price, Price::from_u64(99));
        assert_eq!(depth.asks[0].price, Price::from_u64(101));
        assert_eq!(depth.asks[1].price, Price::from_u64(102));
    }

    #[test]
    fn test_depth_respects_level_limit() {
        let mut book = OrderBook::new(SymbolId::new(1));
        for i in 0..5 {
            book.add_order(order(i, Side::Sell, 101 + i, 1));
        }
        let depth = book.depth(3);
        assert_eq!(depth.asks.len(), 3);
        assert_eq!(depth.asks[0].price, Price::from_u64(101));
    }

    #[test]
    fn test_watermark_never_moves_backwards() {
        let mut book = OrderBook::new(SymbolId::new(1));
        book.advance_watermark(5);
        book.advance_watermark(3);
        assert_eq!(book.last_applied_wal_seq(), 5);
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let mut book = OrderBook::new(SymbolId::new(1));
        book.add_order(order(1, Side::Buy, 100, 1));
        let copy = book.deep_copy();

        book.add_order(order(2, Side::Buy, 101, 1));
        assert_eq!(copy.order_count(), 1);
        assert_eq!(copy.best_bid(), Some(Price::from_u64(100)));
    }
}
