//! Time-in-force retention rules
//!
//! Decides what happens to the unfilled remainder of a limit order after
//! its sweep. Market orders never consult this module.

use types::order::TimeInForce;

/// Whether an unfilled limit remainder should rest on the book.
///
/// Missing time-in-force defaults to GTC. IOC discards the remainder and
/// FOK never has one, since the pre-check killed the order before any
/// fills.
pub fn rests_unfilled(tif: Option<TimeInForce>) -> bool {
    matches!(tif.unwrap_or(TimeInForce::Gtc), TimeInForce::Gtc)
}
