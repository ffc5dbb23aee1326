//! Composite RFV scores and the recommended-action table

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::CustomerMetrics;
use crate::error::{Result, RfvError};
use crate::model::{classify, Grade, Metric, QuartileThresholds};

/// Built-in recommendations for the extreme segments
pub const DEFAULT_ACTIONS: [(&str, &str); 4] = [
    (
        "AAA",
        "Send discount coupons and free samples of new products.",
    ),
    (
        "DDD",
        "Churn risk: low spend and few purchases. Start recovery actions.",
    ),
    ("DAA", "Send offers and promotions to reactivate the customer."),
    ("CAA", "Send personalized promotions to increase retention."),
];

/// Mapping from composite score to a free-text recommendation
///
/// Lookups are exact matches on the three-letter code. A code with no entry
/// simply has no recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct ActionTable {
    entries: BTreeMap<String, String>,
}

impl Default for ActionTable {
    fn default() -> Self {
        let entries = DEFAULT_ACTIONS
            .iter()
            .map(|(code, action)| (code.to_string(), action.to_string()))
            .collect();
        Self { entries }
    }
}

impl TryFrom<BTreeMap<String, String>> for ActionTable {
    type Error = RfvError;

    fn try_from(entries: BTreeMap<String, String>) -> Result<Self> {
        let mut table = ActionTable::empty();
        for (code, action) in entries {
            table.insert(code, action)?;
        }
        Ok(table)
    }
}

impl From<ActionTable> for BTreeMap<String, String> {
    fn from(table: ActionTable) -> Self {
        table.entries
    }
}

impl ActionTable {
    /// A table with no entries; every score maps to no action
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Parse a JSON object of `{"AAA": "..."}` entries
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON action table from disk
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let table = Self::from_json_str(&contents)?;
        log::debug!("loaded {} actions from {}", table.len(), path.display());
        Ok(table)
    }

    /// Add or replace the recommendation for a code
    pub fn insert(&mut self, code: impl Into<String>, action: impl Into<String>) -> Result<()> {
        let code = code.into();
        if !is_valid_code(&code) {
            return Err(RfvError::InvalidActionCode { code });
        }
        self.entries.insert(code, action.into());
        Ok(())
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// True for a three-letter code over A-D
pub fn is_valid_code(code: &str) -> bool {
    code.chars().count() == 3 && code.chars().all(|c| Grade::from_char(c).is_some())
}

/// A customer's metrics with grades, composite score and recommendation
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCustomer {
    pub metrics: CustomerMetrics,
    pub recency_grade: Grade,
    pub frequency_grade: Grade,
    pub value_grade: Grade,
    /// Recency, frequency and value grades concatenated, e.g. "ABD"
    pub score: String,
    pub action: Option<String>,
}

/// Concatenate grades in recency, frequency, value order
pub fn composite_score(recency: Grade, frequency: Grade, value: Grade) -> String {
    [recency, frequency, value]
        .iter()
        .map(|g| g.as_char())
        .collect()
}

/// Grade one customer and attach the matching recommendation
pub fn score_customer(
    metrics: CustomerMetrics,
    thresholds: &QuartileThresholds,
    actions: &ActionTable,
) -> ScoredCustomer {
    let recency_grade = classify(Metric::Recency.of(&metrics), Metric::Recency, thresholds);
    let frequency_grade = classify(Metric::Frequency.of(&metrics), Metric::Frequency, thresholds);
    let value_grade = classify(Metric::Value.of(&metrics), Metric::Value, thresholds);

    let score = composite_score(recency_grade, frequency_grade, value_grade);
    let action = actions.get(&score).map(str::to_string);

    ScoredCustomer {
        metrics,
        recency_grade,
        frequency_grade,
        value_grade,
        score,
        action,
    }
}

/// Grade every customer against the same thresholds
pub fn score_customers(
    customers: Vec<CustomerMetrics>,
    thresholds: &QuartileThresholds,
    actions: &ActionTable,
) -> Vec<ScoredCustomer> {
    customers
        .into_iter()
        .map(|metrics| score_customer(metrics, thresholds, actions))
        .collect()
}
