//! RfvForge: a Rust CLI application for customer segmentation using RFV scoring
//!
//! This library reduces raw purchase transactions to per-customer Recency,
//! Frequency and Value metrics, grades each metric against population
//! quartiles, and maps the combined three-letter score to a recommended
//! marketing action.

pub mod cli;
pub mod data;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod score;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{
    extract_metrics, load_transactions, write_scored_table, ColumnNames, CustomerMetrics,
    Transaction,
};
pub use error::{Result, RfvError};
pub use model::{classify, compute_quartiles, Grade, Metric, Polarity, QuartileThresholds, Quartiles};
pub use pipeline::{segment_customers, Segmentation};
pub use report::{segment_counts, top_customers};
pub use score::{composite_score, score_customer, ActionTable, ScoredCustomer, DEFAULT_ACTIONS};
