//! Order book infrastructure module
//!
//! Contains price levels, the per-instrument book, and the book manager.

pub mod manager;
pub mod order_book;
pub mod price_level;

pub use manager::BookManager;
pub use order_book::OrderBook;
pub use price_level::PriceLevel;
