//! Market event fan-out
//!
//! Trades and depth updates are published on a tokio broadcast channel.
//! Publishing is fire-and-forget: no subscribers is fine, and a slow
//! subscriber lags rather than back-pressuring the writer thread.

use tokio::sync::broadcast;

use types::depth::BookDepth;
use types::trade::Trade;

#[derive(Debug, Clone)]
pub enum MarketEvent {
    Trade(Trade),
    Depth(BookDepth),
}

#[derive(Debug, Clone)]
pub struct MarketFeed {
    tx: broadcast::Sender<MarketEvent>,
}

impl MarketFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: MarketEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::{OrderId, SymbolId, TradeId, UserId};
    use types::numeric::{Price, Quantity};

    fn trade() -> Trade {
        Trade {
            trade_id: TradeId::new(),
            symbol_id: SymbolId::new(1),
            maker_order_id: OrderId::new(1),
            taker_order_id: OrderId::new(2),
            maker_user_id: UserId::new(1),
            taker_user_id: UserId::new(2),
            price: Price::from_u64(100),
            quantity: Quantity::from_u64(1),
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let feed = MarketFeed::new(16);
        feed.publish(MarketEvent::Trade(trade()));
    }

    #[test]
    fn test_subscriber_receives_events() {
        let feed = MarketFeed::new(16);
        let mut rx = feed.subscribe();
        feed.publish(MarketEvent::Trade(trade()));

        match rx.try_recv().unwrap() {
            MarketEvent::Trade(t) => assert_eq!(t.symbol_id, SymbolId::new(1)),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
