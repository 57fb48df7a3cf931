//! Shared type definitions for the matching engine services
//!
//! # Modules
//! - `ids`: identifiers (OrderId, UserId, SymbolId, TradeId)
//! - `numeric`: fixed-point decimal types (Price, Quantity)
//! - `order`: order commands and lifecycle types
//! - `trade`: trade execution types
//! - `depth`: market depth messages
//! - `registry`: symbol-to-id registry
//! - `errors`: shared validation errors
//! - `time`: millisecond clock helper

pub mod depth;
pub mod errors;
pub mod ids;
pub mod numeric;
pub mod order;
pub mod registry;
pub mod time;
pub mod trade;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::depth::*;
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::registry::*;
    pub use crate::trade::*;
}
