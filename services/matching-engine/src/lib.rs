//! Matching engine core
//!
//! Price-time priority limit order books and the matching logic that
//! mutates them. Everything here is synchronous and single-threaded; the
//! sequencer service provides the threading model around it.
//!
//! **Key invariants:**
//! - Price-time priority strictly enforced (best price first, FIFO within
//!   a level)
//! - Execution price is always the maker's resting price
//! - Deterministic: the same command sequence produces the same book
//! - Market orders and IOC/FOK remainders never rest

pub mod book;
pub mod engine;
pub mod matching;

pub use book::{BookManager, OrderBook, PriceLevel};
pub use engine::{apply_intent, order_from_intent, ApplyOutcome, EngineError};
