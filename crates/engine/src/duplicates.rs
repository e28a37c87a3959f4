//! Duplicate-charge detection.
//!
//! Two expenses in the same calendar month with the same normalized key,
//! amount and currency look like a duplicate charge. The detector fires
//! exactly when the second matching transaction appears; a third or later
//! occurrence stays silent. This is a narrow heuristic for "did I get
//! charged twice?", not general duplicate suppression.

use unicode_normalization::UnicodeNormalization;

use crate::Category;

/// NFKC-normalize, trim and lower-case a description. Unicode-aware, so
/// it must be applied consistently on both sides of a key comparison;
/// SQLite's `LOWER` only folds ASCII and would disagree on anything else.
pub(crate) fn fold_description(description: &str) -> String {
    description.trim().nfkc().collect::<String>().to_lowercase()
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DuplicateChargeDetector;

impl DuplicateChargeDetector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Normalized grouping key for an expense: the NFKC-normalized,
    /// trimmed, lower-cased description, or the category key when the
    /// description is empty.
    #[must_use]
    pub fn dedupe_key(&self, description: &str, category: Category) -> String {
        let key = fold_description(description);
        if key.is_empty() {
            category.as_str().to_string()
        } else {
            key
        }
    }

    /// True only when the period count of matching expenses has just
    /// become 2.
    #[must_use]
    pub fn fires_at(&self, count: u64) -> bool {
        count == 2
    }
}
