//! List numbering state, scoped to a single tab conversion.

use std::collections::HashMap;

/// Tracks the active list and per-nesting-level item counters.
///
/// Reset whenever a non-list paragraph is encountered or a different list id
/// is entered; counters for deeper levels are discarded when the nesting
/// level decreases, so re-entering a deeper level restarts its numbering.
#[derive(Debug, Default)]
pub(super) struct ListTracker {
    list_id: String,
    nesting_level: i64,
    item_counts: HashMap<i64, u64>,
}

impl ListTracker {
    /// Leave list context entirely.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record one list item and return its 1-based number at that level.
    pub fn enter_item(&mut self, list_id: &str, nesting_level: i64) -> u64 {
        // Switching lists restarts numbering, even at the same nesting level.
        if self.list_id != list_id {
            self.reset();
            self.list_id = list_id.to_string();
        }

        if nesting_level < self.nesting_level {
            self.item_counts.retain(|&level, _| level <= nesting_level);
        }

        self.nesting_level = nesting_level;
        let count = self.item_counts.entry(nesting_level).or_insert(0);
        *count += 1;
        *count
    }
}

/// Glyph types that render as numbered Markdown list items. Anything else,
/// including missing list data, falls back to an unordered bullet.
pub(super) fn is_ordered_glyph(glyph_type: &str) -> bool {
    matches!(
        glyph_type,
        "DECIMAL" | "ALPHA" | "UPPER_ALPHA" | "ROMAN" | "UPPER_ROMAN" | "ZERO_DECIMAL"
    )
}
