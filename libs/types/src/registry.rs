//! Instrument registry
//!
//! Maps symbol strings to numeric [`SymbolId`]s. Built once at startup
//! from configuration and passed explicitly to the components that need
//! it; there is deliberately no global registry.

use std::collections::HashMap;

use crate::ids::SymbolId;

/// Bidirectional symbol-string to symbol-id mapping.
#[derive(Debug, Clone, Default)]
pub struct SymbolRegistry {
    by_symbol: HashMap<String, SymbolId>,
    by_id: HashMap<SymbolId, String>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instrument. Later registrations of the same symbol or
    /// id replace earlier ones.
    pub fn register(&mut self, symbol: impl Into<String>, id: SymbolId) {
        let symbol = symbol.into();
        self.by_symbol.insert(symbol.clone(), id);
        self.by_id.insert(id, symbol);
    }

    pub fn resolve(&self, symbol: &str) -> Option<SymbolId> {
        self.by_symbol.get(symbol).copied()
    }

    pub fn symbol_of(&self, id: SymbolId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn contains_id(&self, id: SymbolId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.by_id.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
