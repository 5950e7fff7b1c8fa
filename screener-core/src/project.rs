//! Ordered, render-ready projection over the snapshot.

use std::cmp::Ordering;

use smol_str::SmolStr;

use crate::snapshot::Snapshot;
use crate::types::SymbolRecord;

/// Row ordering requested by the UI.
///
/// Owned by the presentation layer; toggling it never mutates the snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortMode {
    /// First-seen order, the snapshot's native iteration order
    #[default]
    InsertionOrder,
    /// Case-insensitive lexicographic order by symbol
    Alphabetical,
}

impl SortMode {
    /// The other mode, for checkbox-style toggles
    pub fn toggled(self) -> Self {
        match self {
            SortMode::InsertionOrder => SortMode::Alphabetical,
            SortMode::Alphabetical => SortMode::InsertionOrder,
        }
    }
}

/// Project the snapshot into an ordered row list.
///
/// Read-only and deterministic for fixed input: `Alphabetical` is a stable
/// sort under an ASCII-case-insensitive comparator with a bytewise tiebreak,
/// `InsertionOrder` passes the snapshot's first-seen order through. Cheap
/// enough to re-run on every update at the expected tens-to-hundreds of
/// symbols.
pub fn project(snapshot: &Snapshot, mode: SortMode) -> Vec<(SmolStr, SymbolRecord)> {
    let mut rows: Vec<(SmolStr, SymbolRecord)> = snapshot
        .iter()
        .map(|(symbol, record)| (symbol.clone(), record.clone()))
        .collect();

    if mode == SortMode::Alphabetical {
        rows.sort_by(|(a, _), (b, _)| compare_symbols(a, b));
    }

    rows
}

/// ASCII-case-insensitive comparison, bytewise tiebreak for a total order
fn compare_symbols(a: &str, b: &str) -> Ordering {
    let folded = a
        .bytes()
        .map(|byte| byte.to_ascii_lowercase())
        .cmp(b.bytes().map(|byte| byte.to_ascii_lowercase()));
    folded.then_with(|| a.cmp(b))
}
