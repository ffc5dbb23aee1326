//! End-to-end RFV segmentation: extract, threshold, classify, score

use chrono::NaiveDate;

use crate::data::{extract_metrics, Transaction};
use crate::error::Result;
use crate::model::{compute_quartiles, QuartileThresholds};
use crate::score::{score_customers, ActionTable, ScoredCustomer};

/// Output of one segmentation run
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    /// `None` when the input had no customers
    pub thresholds: Option<QuartileThresholds>,
    /// One scored row per customer, ordered by customer id
    pub customers: Vec<ScoredCustomer>,
}

impl Segmentation {
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}

/// Segment customers from raw transactions
///
/// # Arguments
/// * `transactions` - Transaction rows in any order
/// * `reference_date` - Date recency is measured from
/// * `actions` - Recommendation lookup applied to each composite score
///
/// # Returns
/// * A `Segmentation`; an empty transaction table gives an empty segmentation
///   with no thresholds rather than an error
pub fn segment_customers(
    transactions: &[Transaction],
    reference_date: NaiveDate,
    actions: &ActionTable,
) -> Result<Segmentation> {
    let metrics = extract_metrics(transactions, reference_date);
    if metrics.is_empty() {
        log::info!("no transactions to segment");
        return Ok(Segmentation {
            thresholds: None,
            customers: Vec::new(),
        });
    }

    let thresholds = compute_quartiles(&metrics)?;
    let customers = score_customers(metrics, &thresholds, actions);

    let with_action = customers.iter().filter(|c| c.action.is_some()).count();
    log::info!(
        "segmented {} customers ({} with a recommended action)",
        customers.len(),
        with_action
    );

    Ok(Segmentation {
        thresholds: Some(thresholds),
        customers,
    })
}
