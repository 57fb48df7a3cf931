//! Book manager
//!
//! Owns one [`OrderBook`] per registered instrument. Only the sequencer's
//! writer thread holds a `&mut` to this, which is what makes every book
//! mutation single-threaded.

use std::collections::HashMap;
use types::ids::SymbolId;

use crate::book::order_book::OrderBook;

#[derive(Debug, Default)]
pub struct BookManager {
    books: HashMap<SymbolId, OrderBook>,
}

impl BookManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a fresh book exists for the instrument.
    pub fn create(&mut self, symbol_id: SymbolId) -> &mut OrderBook {
        self.books
            .entry(symbol_id)
            .or_insert_with(|| OrderBook::new(symbol_id))
    }

    /// Install a fully built book, e.g. one restored from a snapshot.
    pub fn install(&mut self, book: OrderBook) {
        self.books.insert(book.symbol_id(), book);
    }

    pub fn get(&self, symbol_id: SymbolId) -> Option<&OrderBook> {
        self.books.get(&symbol_id)
    }

    pub fn get_mut(&mut self, symbol_id: SymbolId) -> Option<&mut OrderBook> {
        self.books.get_mut(&symbol_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrderBook> {
        self.books.values()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_is_idempotent() {
        let mut manager = BookManager::new();
        manager.create(SymbolId::new(1)).advance_watermark(7);
        manager.create(SymbolId::new(1));

        assert_eq!(manager.len(), 1);
        assert_eq!(
            manager.get(SymbolId::new(1)).unwrap().last_applied_wal_seq(),
            7
        );
    }

    #[test]
    fn test_install_replaces_existing() {
        let mut manager = BookManager::new();
        manager.create(SymbolId::new(2));

        let mut restored = OrderBook::new(SymbolId::new(2));
        restored.advance_watermark(99);
        manager.install(restored);

        assert_eq!(
            manager.get(SymbolId::new(2)).unwrap().last_applied_wal_seq(),
            99
        );
    }
}
