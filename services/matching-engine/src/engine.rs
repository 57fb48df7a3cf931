//! Command application
//!
//! [`apply_intent`] is the single entry point that turns a journaled
//! command into book mutations. The live pipeline and WAL replay both go
//! through it, which is what makes recovery deterministic.

use thiserror::Error;
use tracing::debug;
use types::errors::ValidationError;
use types::order::{MessageType, Order, OrderIntent, OrderType};
use types::trade::Trade;

use crate::book::OrderBook;
use crate::matching;

/// Result of applying one command to a book.
#[derive(Debug)]
pub struct ApplyOutcome {
    /// Trades in execution order, empty for cancels and non-crossing orders.
    pub trades: Vec<Trade>,
    /// Whether the resting book changed (fills, a new resting order, or a
    /// successful cancel).
    pub book_changed: bool,
    /// The removed order for a successful cancel.
    pub canceled: Option<Order>,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid intent: {0}")]
    Invalid(#[from] ValidationError),
}

/// Apply a single command to the book.
///
/// Cancels of unknown orders are a silent no-op: the order may have been
/// filled between submission and cancellation, which is not an error.
pub fn apply_intent(book: &mut OrderBook, intent: &OrderIntent) -> Result<ApplyOutcome, EngineError> {
    match intent.message_type {
        MessageType::OrderCancel => {
            let canceled = book.remove_order(intent.order_id);
            if canceled.is_none() {
                debug!(order_id = %intent.order_id, "cancel for unknown order, ignoring");
            }
            Ok(ApplyOutcome {
                trades: Vec::new(),
                book_changed: canceled.is_some(),
                canceled,
            })
        }
        MessageType::OrderCreate => {
            let order = order_from_intent(intent)?;
            let order_id = order.order_id;
            let trades = matching::match_order(book, order, intent.timestamp);
            let book_changed = !trades.is_empty() || book.contains(order_id);
            Ok(ApplyOutcome {
                trades,
                book_changed,
                canceled: None,
            })
        }
    }
}

/// Build the engine-side working order from a create intent.
///
/// Market orders drop any price on the message so they can never rest;
/// limit orders require a positive price.
pub fn order_from_intent(intent: &OrderIntent) -> Result<Order, ValidationError> {
    let order_type = intent
        .order_type
        .ok_or(ValidationError::MissingField("order_type"))?;
    let side = intent.side.ok_or(ValidationError::MissingField("side"))?;
    let quantity = intent
        .quantity
        .ok_or(ValidationError::MissingField("quantity"))?;
    if !quantity.is_positive() {
        return Err(ValidationError::NonPositiveQuantity);
    }

    let price = match order_type {
        OrderType::Limit => {
            let price = intent.price.ok_or(ValidationError::MissingField("price"))?;
            if !price.is_positive() {
                return Err(ValidationError::NonPositivePrice);
            }
            Some(price)
        }
        OrderType::Market => None,
    };

    Ok(Order {
        order_id: intent.order_id,
        user_id: intent.user_id,
        symbol_id: intent.symbol_id,
        order_type,
        side,
        price,
        quantity,
        filled_quantity: types::numeric::Quantity::zero(),
        time_in_force: intent.time_in_force,
        created_at: intent.timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::{OrderId, SymbolId, UserId};
    use types::numeric::{Price, Quantity};
    use types::order::{Side, TimeInForce};

    const TS: i64 = 1_700_000_000_000;

    fn create(id: u64, side: Side, price: u64, qty: u64) -> OrderIntent {
        OrderIntent::create(
            OrderId::new(id),
            UserId::new(id),
            SymbolId::new(1),
            OrderType::Limit,
            side,
            Some(Price::from_u64(price)),
            Quantity::from_u64(qty),
            Some(TimeInForce::Gtc),
            TS,
        )
    }

    #[test]
    fn test_apply_create_rests() {
        let mut book = OrderBook::new(SymbolId::new(1));
        let outcome = apply_intent(&mut book, &create(1, Side::Buy, 100, 5)).unwrap();
        assert!(outcome.trades.is_empty());
        assert!(outcome.book_changed);
        assert!(book.contains(OrderId::new(1)));
    }

    #[test]
    fn test_apply_create_matches() {
        let mut book = OrderBook::new(SymbolId::new(1));
        apply_intent(&mut book, &create(1, Side::Sell, 100, 5)).unwrap();
        let outcome = apply_intent(&mut book, &create(2, Side::Buy, 100, 5)).unwrap();
        assert_eq!(outcome.trades.len(), 1);
        assert!(outcome.book_changed);
        assert_eq!(book.order_count(), 0);
    }

    #[test]
    fn test_apply_non_crossing_ioc_leaves_book_unchanged() {
        let mut book = OrderBook::new(SymbolId::new(1));
        apply_intent(&mut book, &create(1, Side::Sell, 105, 5)).unwrap();

        let mut intent = create(2, Side::Buy, 100, 5);
        intent.time_in_force = Some(TimeInForce::Ioc);
        let outcome = apply_intent(&mut book, &intent).unwrap();
        assert!(outcome.trades.is_empty());
        assert!(!outcome.book_changed);
    }

    #[test]
    fn test_apply_cancel() {
        let mut book = OrderBook::new(SymbolId::new(1));
        apply_intent(&mut book, &create(1, Side::Buy, 100, 5)).unwrap();

        let cancel = OrderIntent::cancel(OrderId::new(1), UserId::new(1), SymbolId::new(1), TS);
        let outcome = apply_intent(&mut book, &cancel).unwrap();
        assert!(outcome.book_changed);
        assert_eq!(outcome.canceled.unwrap().order_id, OrderId::new(1));
        assert!(!book.contains(OrderId::new(1)));
    }

    #[test]
    fn test_apply_cancel_unknown_is_noop() {
        let mut book = OrderBook::new(SymbolId::new(1));
        let cancel = OrderIntent::cancel(OrderId::new(9), UserId::new(1), SymbolId::new(1), TS);
        let outcome = apply_intent(&mut book, &cancel).unwrap();
        assert!(!outcome.book_changed);
        assert!(outcome.canceled.is_none());
    }

    #[test]
    fn test_create_missing_side_rejected() {
        let mut book = OrderBook::new(SymbolId::new(1));
        let mut intent = create(1, Side::Buy, 100, 5);
        intent.side = None;
        let err = apply_intent(&mut book, &intent).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Invalid(ValidationError::MissingField("side"))
        ));
    }

    #[test]
    fn test_create_zero_quantity_rejected() {
        let mut intent = create(1, Side::Buy, 100, 5);
        intent.quantity = Some(Quantity::zero());
        assert_eq!(
            order_from_intent(&intent).unwrap_err(),
            ValidationError::NonPositiveQuantity
        );
    }

    #[test]
    fn test_limit_without_price_rejected() {
        let mut intent = create(1, Side::Buy, 100, 5);
        intent.price = None;
        assert_eq!(
            order_from_intent(&intent).unwrap_err(),
            ValidationError::MissingField("price")
        );
    }

    #[test]
    fn test_market_order_drops_price() {
        let mut intent = create(1, Side::Buy, 100, 5);
        intent.order_type = Some(OrderType::Market);
        let order = order_from_intent(&intent).unwrap();
        assert_eq!(order.price, None);
    }
}
