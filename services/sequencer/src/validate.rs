//! Pre-WAL intent validation
//!
//! Runs before anything is journaled: a rejected intent never costs an
//! fsync and never appears during replay. Structural checks reuse the
//! engine's own intent-to-order conversion so validation and application
//! can never disagree.

use matching_engine::engine::order_from_intent;
use types::errors::ValidationError;
use types::order::{MessageType, OrderIntent};
use types::registry::SymbolRegistry;

pub fn validate_intent(
    intent: &OrderIntent,
    registry: &SymbolRegistry,
) -> Result<(), ValidationError> {
    if !registry.contains_id(intent.symbol_id) {
        return Err(ValidationError::UnknownInstrument(intent.symbol_id));
    }
    match intent.message_type {
        MessageType::OrderCancel => Ok(()),
        MessageType::OrderCreate => order_from_intent(intent).map(|_| ()),
    }
}
