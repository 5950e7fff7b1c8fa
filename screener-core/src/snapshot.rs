//! Keyed last-value-wins table of per-symbol state.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::types::{RawUpdate, SymbolRecord};

/// Latest derived record per symbol, iterated in first-seen order.
///
/// There is no eviction: symbols accumulate for the lifetime of a session and
/// are only dropped wholesale when the reload cycle rebuilds the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    records: IndexMap<SmolStr, SymbolRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one wire update into the table. The single write path.
    ///
    /// The entry is replaced wholesale, so a stored record never mixes fields
    /// from updates of different vintages. Updates for the same symbol apply
    /// in receipt order, last one wins; re-applying an identical update is a
    /// no-op. A symbol keeps its original position once seen.
    pub fn apply_update(&mut self, raw: &RawUpdate) {
        self.records
            .insert(raw.symbol.clone(), SymbolRecord::from_update(raw));
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolRecord> {
        self.records.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Entries in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &SymbolRecord)> {
        self.records.iter()
    }

    /// Drop every entry. Reload path only; transport events never call this.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
