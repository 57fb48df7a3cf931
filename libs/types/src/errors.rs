//! Shared validation errors
//!
//! Validation happens before the WAL append, so a rejected intent is never
//! journaled and never reaches the book.

use thiserror::Error;

use crate::ids::SymbolId;

/// Structural validation failures for inbound intents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("quantity must be positive")]
    NonPositiveQuantity,

    #[error("price must be positive")]
    NonPositivePrice,

    #[error("unknown instrument: {0}")]
    UnknownInstrument(SymbolId),
}
