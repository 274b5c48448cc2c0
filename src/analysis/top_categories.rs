//! Top-N categories by total sales

use std::cmp::Ordering;

use crate::enrich::CategoryAggregate;

/// Number of categories reported when none is configured
pub const DEFAULT_TOP_N: usize = 3;

/// Rank categories by `total_sales` descending, ties by name ascending
///
/// Returns at most `n` rows; fewer categories than `n` are returned as-is.
pub fn top_categories(categories: &[CategoryAggregate], n: usize) -> Vec<CategoryAggregate> {
    let mut ranked = categories.to_vec();
    ranked.sort_by(|a, b| {
        b.total_sales
            .partial_cmp(&a.total_sales)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });
    ranked.truncate(n);
    ranked
}
