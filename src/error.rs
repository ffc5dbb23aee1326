//! Error types for the RFV engine and its CSV layer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RfvError {
    #[error("Cannot compute quartiles over an empty customer population")]
    EmptyInput,

    #[error("Row {row}: missing value for required field '{field}'")]
    MissingField { row: usize, field: String },

    #[error("Input table has no column named '{column}'")]
    MissingColumn { column: String },

    #[error("Row {row}: cannot parse purchase date '{value}'")]
    InvalidDate { row: usize, value: String },

    #[error("Row {row}: amount '{value}' is not a finite, non-negative number")]
    InvalidAmount { row: usize, value: String },

    #[error("Invalid action code '{code}': expected three letters from A-D")]
    InvalidActionCode { code: String },

    #[error("Unknown metric '{name}': expected recency, frequency or value")]
    UnknownMetric { name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Table error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

pub type Result<T> = std::result::Result<T, RfvError>;
