//! Market order matching

use tracing::debug;
use types::order::Order;
use types::trade::Trade;

use crate::book::OrderBook;
use crate::matching::sweep;

/// Match a market order against the book.
///
/// Sweeps the opposite side with no price bound. Any time-in-force on the
/// message is ignored, and any remainder after the book is exhausted is
/// discarded; a market order never rests.
pub fn match_market(book: &mut OrderBook, mut order: Order, timestamp: i64) -> Vec<Trade> {
    if order.time_in_force.take().is_some() {
        debug!(order_id = %order.order_id, "time-in-force on market order ignored");
    }

    let trades = sweep(book, &mut order, None, timestamp);

    if !order.is_filled() {
        debug!(
            order_id = %order.order_id,
            remaining = %order.remaining_quantity(),
            "market order remainder discarded, book exhausted"
        );
    }

    trades
}
