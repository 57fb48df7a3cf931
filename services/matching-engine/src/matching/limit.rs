//! Limit order matching

use tracing::{debug, warn};
use types::numeric::{Price, Quantity};
use types::order::{Order, Side, TimeInForce};
use types::trade::Trade;

use crate::book::OrderBook;
use crate::matching::{sweep, tif};

/// Match a limit order against the book.
///
/// FOK orders are screened before any book mutation: if the crossable
/// liquidity cannot cover the full quantity the order is killed and the
/// book is untouched. The check is safe without rollback because the
/// single writer thread means liquidity cannot change between check and
/// sweep.
pub fn match_limit(book: &mut OrderBook, mut order: Order, timestamp: i64) -> Vec<Trade> {
    let Some(limit) = order.price else {
        warn!(order_id = %order.order_id, "limit order without a price, dropping");
        return Vec::new();
    };

    if order.time_in_force == Some(TimeInForce::Fok) {
        let available = available_quantity(book, order.side, limit);
        if available < order.remaining_quantity() {
            debug!(
                order_id = %order.order_id,
                %available,
                required = %order.remaining_quantity(),
                "fill-or-kill order killed, insufficient liquidity"
            );
            return Vec::new();
        }
    }

    let trades = sweep(book, &mut order, Some(limit), timestamp);

    if !order.is_filled() {
        if tif::rests_unfilled(order.time_in_force) {
            book.add_order(order);
        } else {
            debug!(
                order_id = %order.order_id,
                remaining = %order.remaining_quantity(),
                "immediate-or-cancel remainder discarded"
            );
        }
    }

    trades
}

/// Total crossable quantity for a prospective taker at `limit`.
///
/// Sums level totals on the opposite side from best to worst, stopping at
/// the first level that no longer crosses.
fn available_quantity(book: &OrderBook, taker_side: Side, limit: Price) -> Quantity {
    let mut total = Quantity::zero();
    match taker_side {
        Side::Buy => {
            for (price, level) in book.levels(Side::Sell) {
                if *price > limit {
                    break;
                }
                total += level.total_quantity();
            }
        }
        Side::Sell => {
            for (price, level) in book.levels(Side::Buy).iter().rev() {
                if *price < limit {
                    break;
                }
                total += level.total_quantity();
            }
        }
    }
    total
}
