//! Price level implementation with FIFO queue
//!
//! A price level contains all resting orders at a specific price point.
//! Orders are maintained in FIFO (First-In-First-Out) order to enforce
//! time priority.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::Order;

/// A price level containing orders at a specific price
///
/// Maintains strict FIFO ordering for time-priority matching and a cached
/// total of the remaining quantity across all queued orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    price: Price,
    /// Queue of orders at this price level (FIFO order)
    orders: VecDeque<Order>,
    /// Total remaining quantity across the queue
    total_quantity: Quantity,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new(price: Price) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
            total_quantity: Quantity::zero(),
        }
    }

    pub fn price(&self) -> Price {
        self.price
    }

    /// Append an order at the back of the queue (time priority)
    pub fn push_back(&mut self, order: Order) {
        self.total_quantity += order.remaining_quantity();
        self.orders.push_back(order);
    }

    /// Remove an order from the queue by id
    pub fn remove(&mut self, order_id: OrderId) -> Option<Order> {
        let position = self.orders.iter().position(|o| o.order_id == order_id)?;
        let order = self.orders.remove(position)?;
        self.total_quantity -= order.remaining_quantity();
        Some(order)
    }

    /// Peek at the front order without removing it
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Mutable access to the front order, for in-place fills
    pub fn front_mut(&mut self) -> Option<&mut Order> {
        self.orders.front_mut()
    }

    /// Pop the front order from the queue
    pub fn pop_front(&mut self) -> Option<Order> {
        let order = self.orders.pop_front()?;
        self.total_quantity -= order.remaining_quantity();
        Some(order)
    }

    /// Adjust the cached total after an in-place fill of a queued order.
    ///
    /// `before` and `after` are the order's remaining quantity around the
    /// fill, so the total is corrected without a full rescan.
    pub fn apply_fill(&mut self, before: Quantity, after: Quantity) {
        self.total_quantity = self.total_quantity - before + after;
    }

    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.order_id == order_id)
    }

    /// Check if the price level is empty
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Get the total remaining quantity at this price level
    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    /// Get the number of orders at this level
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use types::ids::{SymbolId, UserId};
    use types::order::{OrderType, Side, TimeInForce};

    fn order(id: u64, qty: u64) -> Order {
        Order {
            order_id: OrderId::new(id),
            user_id: UserId::new(1),
            symbol_id: SymbolId::new(1),
            order_type: OrderType::Limit,
            side: Side::Buy,
            price: Some(Price::from_u64(100)),
            quantity: Quantity::from_u64(qty),
            filled_quantity: Quantity::zero(),
            time_in_force: Some(TimeInForce::Gtc),
            created_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_price_level_push_back() {
        let mut level = PriceLevel::new(Price::from_u64(100));
        level.push_back(order(1, 5));

        assert_eq!(level.order_count(), 1);
        assert_eq!(level.total_quantity(), Quantity::from_u64(5));
        assert!(!level.is_empty());
    }

    #[test]
    fn test_price_level_fifo_order() {
        let mut level = PriceLevel::new(Price::from_u64(100));
        level.push_back(order(1, 1));
        level.push_back(order(2, 2));
        level.push_back(order(3, 3));

        assert_eq!(level.front().unwrap().order_id, OrderId::new(1));
        assert_eq!(level.pop_front().unwrap().order_id, OrderId::new(1));
        assert_eq!(level.front().unwrap().order_id, OrderId::new(2));
    }

    #[test]
    fn test_price_level_remove_middle() {
        let mut level = PriceLevel::new(Price::from_u64(100));
        level.push_back(order(1, 1));
        level.push_back(order(2, 2));
        level.push_back(order(3, 3));

        let removed = level.remove(OrderId::new(2)).unwrap();
        assert_eq!(removed.quantity, Quantity::from_u64(2));
        assert_eq!(level.order_count(), 2);
        assert_eq!(level.total_quantity(), Quantity::from_u64(4));
    }

    #[test]
    fn test_price_level_remove_missing() {
        let mut level = PriceLevel::new(Price::from_u64(100));
        level.push_back(order(1, 1));
        assert!(level.remove(OrderId::new(9)).is_none());
        assert_eq!(level.total_quantity(), Quantity::from_u64(1));
    }

    #[test]
    fn test_price_level_apply_fill() {
        let mut level = PriceLevel::new(Price::from_u64(100));
        level.push_back(order(1, 5));

        let before = level.front().unwrap().remaining_quantity();
        level.front_mut().unwrap().add_fill(Quantity::from_u64(3));
        let after = level.front().unwrap().remaining_quantity();
        level.apply_fill(before, after);

        assert_eq!(level.total_quantity(), Quantity::from_u64(2));
    }

    proptest! {
        // The cached total must equal the sum of remaining quantities no
        // matter how the queue is mutated.
        #[test]
        fn prop_total_tracks_queue(ops in proptest::collection::vec((0u8..3, 1u64..100), 1..50)) {
            let mut level = PriceLevel::new(Price::from_u64(100));
            let mut next_id = 1u64;
            for (op, qty) in ops {
                match op {
                    0 => {
                        level.push_back(order(next_id, qty));
                        next_id += 1;
                    }
                    1 => { level.pop_front(); }
                    _ => {
                        if let Some(front) = level.front_mut() {
                            let before = front.remaining_quantity();
                            let fill = Quantity::from_u64(qty).min(before);
                            front.add_fill(fill);
                            let after = front.remaining_quantity();
                            level.apply_fill(before, after);
                            if level.front().is_some_and(|o| o.is_filled()) {
                                level.pop_front();
                            }
                        }
                    }
                }
                let expected = level
                    .iter()
                    .fold(Quantity::zero(), |acc, o| acc + o.remaining_quantity());
                prop_assert_eq!(level.total_quantity(), expected);
            }
        }
    }
}
