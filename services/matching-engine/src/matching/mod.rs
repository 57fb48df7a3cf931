//! Matching logic module
//!
//! Price-time priority matching. Dispatch is a closed enum match over the
//! order type; there is no pluggable matcher surface.

pub mod limit;
pub mod market;
pub mod tif;

use types::numeric::Price;
use types::order::{Order, OrderType, Side};
use types::trade::Trade;

use crate::book::OrderBook;

/// Match an incoming order against the book.
///
/// Consumes the order; a GTC limit remainder ends up resting inside the
/// book, everything else is dropped. Returns the trades in execution
/// order.
pub fn match_order(book: &mut OrderBook, order: Order, timestamp: i64) -> Vec<Trade> {
    match order.order_type {
        OrderType::Limit => limit::match_limit(book, order, timestamp),
        OrderType::Market => market::match_market(book, order, timestamp),
    }
}

/// Core sweep shared by both matchers.
///
/// Walks opposite-side levels from best to worst, filling FIFO within each
/// level, until the taker is filled, the book is exhausted, or the next
/// level no longer crosses `limit` (`None` means no price bound). The
/// execution price is always the maker's level price.
pub(crate) fn sweep(
    book: &mut OrderBook,
    taker: &mut Order,
    limit: Option<Price>,
    timestamp: i64,
) -> Vec<Trade> {
    let symbol_id = book.symbol_id();
    let book_side = taker.side.opposite();
    let mut trades = Vec::new();

    'levels: while !taker.is_filled() {
        let Some(level_price) = book.best_price(book_side) else {
            break;
        };
        if let Some(bound) = limit {
            let crosses = match taker.side {
                Side::Buy => level_price <= bound,
                Side::Sell => level_price >= bound,
            };
            if !crosses {
                break;
            }
        }

        while !taker.is_filled() {
            let (trade, maker_filled, maker_id) = {
                let Some(level) = book.level_mut(book_side, level_price) else {
                    break 'levels;
                };
                let Some(maker) = level.front_mut() else {
                    break;
                };
                let take = taker.remaining_quantity().min(maker.remaining_quantity());
                let before = maker.remaining_quantity();
                maker.add_fill(take);
                taker.add_fill(take);
                let after = maker.remaining_quantity();
                let trade = Trade::new(
                    symbol_id,
                    maker.order_id,
                    taker.order_id,
                    maker.user_id,
                    taker.user_id,
                    level_price,
                    take,
                    timestamp,
                );
                let maker_filled = maker.is_filled();
                let maker_id = maker.order_id;
                level.apply_fill(before, after);
                if maker_filled {
                    level.pop_front();
                }
                (trade, maker_filled, maker_id)
            };
            trades.push(trade);
            if maker_filled {
                book.unindex(maker_id);
            }
        }
        book.prune_level(book_side, level_price);
    }

    trades
}
