//! Segment summaries over a scored customer table

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::score::ScoredCustomer;

/// Number of customers per composite score, largest segment first
///
/// Segments of equal size are ordered by score code.
pub fn segment_counts(customers: &[ScoredCustomer]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for customer in customers {
        *counts.entry(customer.score.as_str()).or_insert(0) += 1;
    }

    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(score, count)| (score.to_string(), count))
        .collect();
    // Stable sort keeps the alphabetical order among ties
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// The `limit` highest-value customers holding the given score
///
/// Ties on value are broken by customer id.
pub fn top_customers<'a>(
    customers: &'a [ScoredCustomer],
    score: &str,
    limit: usize,
) -> Vec<&'a ScoredCustomer> {
    let mut matching: Vec<&ScoredCustomer> =
        customers.iter().filter(|c| c.score == score).collect();
    matching.sort_by(|a, b| {
        b.metrics
            .value
            .partial_cmp(&a.metrics.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.metrics.customer_id.cmp(&b.metrics.customer_id))
    });
    matching.truncate(limit);
    matching
}

/// Share of customers in a segment, as a percentage of the total
pub fn segment_share(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64) * 100.0
}
