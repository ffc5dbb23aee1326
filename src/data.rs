//! Transaction loading, per-customer RFV metric extraction and CSV export using Polars

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::error::{Result, RfvError};
use crate::score::ScoredCustomer;

/// A single purchase event as read from the transaction table
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub customer_id: String,
    pub purchase_date: NaiveDate,
    /// Identifies the purchase event; only ever counted, never deduplicated
    pub purchase_code: String,
    pub amount: f64,
}

impl Transaction {
    pub fn new(
        customer_id: impl Into<String>,
        purchase_date: NaiveDate,
        purchase_code: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            purchase_date,
            purchase_code: purchase_code.into(),
            amount,
        }
    }
}

/// One row per customer with the three raw RFV metrics
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerMetrics {
    pub customer_id: String,
    /// Days between the reference date and the latest purchase. Negative when
    /// the latest purchase falls after the reference date.
    pub recency: i64,
    /// Number of transaction rows for the customer
    pub frequency: u64,
    /// Total amount spent
    pub value: f64,
}

/// Header names of the four columns the loader reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub customer_id: String,
    pub purchase_date: String,
    pub purchase_code: String,
    pub amount: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            customer_id: "ID_cliente".to_string(),
            purchase_date: "DiaCompra".to_string(),
            purchase_code: "CodigoCompra".to_string(),
            amount: "ValorTotal".to_string(),
        }
    }
}

/// Load transactions from a CSV file
///
/// # Arguments
/// * `file_path` - Path to the CSV file (must have a header row)
/// * `columns` - Names of the customer, date, code and amount columns
///
/// # Returns
/// * One `Transaction` per data row, in file order
///
/// Every row is validated as it is converted: a blank cell in a required
/// column fails the whole load with `MissingField` rather than dropping the row.
pub fn load_transactions(file_path: &Path, columns: &ColumnNames) -> Result<Vec<Transaction>> {
    // Read everything as text; typing happens per row below
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(file_path.to_path_buf()))?
        .finish()?;

    log::debug!(
        "read {} rows x {} columns from {}",
        df.height(),
        df.width(),
        file_path.display()
    );

    let customer_ids = string_column(&df, &columns.customer_id)?;
    let dates = string_column(&df, &columns.purchase_date)?;
    let codes = string_column(&df, &columns.purchase_code)?;
    let amounts = string_column(&df, &columns.amount)?;

    let mut transactions = Vec::with_capacity(df.height());
    for (idx, (((customer_id, date), code), amount)) in customer_ids
        .into_iter()
        .zip(dates)
        .zip(codes)
        .zip(amounts)
        .enumerate()
    {
        // 1-based data row, header excluded
        let row = idx + 1;

        let customer_id = require(customer_id, row, &columns.customer_id)?;
        let raw_date = require(date, row, &columns.purchase_date)?;
        let purchase_code = require(code, row, &columns.purchase_code)?;
        let raw_amount = require(amount, row, &columns.amount)?;

        let purchase_date =
            parse_purchase_date(&raw_date).ok_or(RfvError::InvalidDate { row, value: raw_date })?;
        let amount = parse_amount(&raw_amount).ok_or(RfvError::InvalidAmount {
            row,
            value: raw_amount,
        })?;

        transactions.push(Transaction {
            customer_id,
            purchase_date,
            purchase_code,
            amount,
        });
    }

    Ok(transactions)
}

/// Reduce transactions to one metrics row per distinct customer
///
/// # Arguments
/// * `transactions` - Transaction rows in any order
/// * `reference_date` - Date recency is measured from
///
/// # Returns
/// * Metrics ordered by customer id; empty when there are no transactions
pub fn extract_metrics(transactions: &[Transaction], reference_date: NaiveDate) -> Vec<CustomerMetrics> {
    struct Accumulator {
        last_purchase: NaiveDate,
        count: u64,
        amounts: Vec<f64>,
    }

    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for tx in transactions {
        let acc = groups
            .entry(tx.customer_id.as_str())
            .or_insert_with(|| Accumulator {
                last_purchase: tx.purchase_date,
                count: 0,
                amounts: Vec::new(),
            });
        acc.last_purchase = acc.last_purchase.max(tx.purchase_date);
        acc.count += 1;
        acc.amounts.push(tx.amount);
    }

    let metrics: Vec<CustomerMetrics> = groups
        .into_iter()
        .map(|(customer_id, mut acc)| {
            // Sum in a fixed order so totals are identical for any row order
            acc.amounts.sort_by(f64::total_cmp);
            CustomerMetrics {
                customer_id: customer_id.to_string(),
                recency: (reference_date - acc.last_purchase).num_days(),
                frequency: acc.count,
                value: acc.amounts.iter().sum(),
            }
        })
        .collect();

    log::debug!(
        "extracted metrics for {} customers from {} transactions",
        metrics.len(),
        transactions.len()
    );

    metrics
}

/// Write the scored customer table to a CSV file, one row per customer
pub fn write_scored_table(file_path: &Path, customers: &[ScoredCustomer]) -> Result<()> {
    let customer_ids: Vec<String> = customers
        .iter()
        .map(|c| c.metrics.customer_id.clone())
        .collect();
    let recency: Vec<i64> = customers.iter().map(|c| c.metrics.recency).collect();
    let frequency: Vec<u64> = customers.iter().map(|c| c.metrics.frequency).collect();
    let value: Vec<f64> = customers.iter().map(|c| c.metrics.value).collect();
    let r_grade: Vec<String> = customers.iter().map(|c| c.recency_grade.to_string()).collect();
    let f_grade: Vec<String> = customers
        .iter()
        .map(|c| c.frequency_grade.to_string())
        .collect();
    let v_grade: Vec<String> = customers.iter().map(|c| c.value_grade.to_string()).collect();
    let score: Vec<String> = customers.iter().map(|c| c.score.clone()).collect();
    let action: Vec<Option<String>> = customers.iter().map(|c| c.action.clone()).collect();

    let mut df = DataFrame::new(vec![
        Series::new("customer_id", customer_ids),
        Series::new("recency", recency),
        Series::new("frequency", frequency),
        Series::new("value", value),
        Series::new("r_grade", r_grade),
        Series::new("f_grade", f_grade),
        Series::new("v_grade", v_grade),
        Series::new("rfv_score", score),
        Series::new("action", action),
    ])?;

    let mut file = File::create(file_path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;

    log::debug!("wrote {} scored customers to {}", customers.len(), file_path.display());
    Ok(())
}

/// Extract a column as trimmed text, mapping blank cells to `None`
fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name).map_err(|_| RfvError::MissingColumn {
        column: name.to_string(),
    })?;
    let text = series.cast(&DataType::String)?;
    let values = text
        .str()?
        .into_iter()
        .map(|cell| {
            cell.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect();
    Ok(values)
}

fn require(cell: Option<String>, row: usize, field: &str) -> Result<String> {
    cell.ok_or_else(|| RfvError::MissingField {
        row,
        field: field.to_string(),
    })
}

/// Parse a purchase date, keeping only the calendar day of timestamps
fn parse_purchase_date(raw: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];
    const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_csv(rows: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ID_cliente,DiaCompra,CodigoCompra,ValorTotal").unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file
    }

    #[test]
    fn test_load_transactions() {
        let file = create_test_csv(&[
            "17850,2021-12-01,536365,15.30",
            "17850,2021-11-20T08:26:00,536366,20.34",
            "13047,05/12/2021,536367,22.00",
        ]);

        let transactions = load_transactions(file.path(), &ColumnNames::default()).unwrap();
        assert_eq!(transactions.len(), 3);
        assert_eq!(transactions[0].customer_id, "17850");
        assert_eq!(transactions[1].purchase_date, date(2021, 11, 20));
        assert_eq!(transactions[2].purchase_date, date(2021, 12, 5));
        assert_eq!(transactions[2].purchase_code, "536367");
        assert!((transactions[0].amount - 15.30).abs() < 1e-9);
    }

    #[test]
    fn test_load_reports_missing_field() {
        let file = create_test_csv(&["17850,2021-12-01,536365,15.30", "13047,2021-12-02,,8.00"]);

        let err = load_transactions(file.path(), &ColumnNames::default()).unwrap_err();
        match err {
            RfvError::MissingField { row, field } => {
                assert_eq!(row, 2);
                assert_eq!(field, "CodigoCompra");
            }
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_load_reports_missing_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "CustomerID,InvoiceDate,InvoiceNo").unwrap();
        writeln!(file, "17850,2021-12-01,536365").unwrap();

        let err = load_transactions(file.path(), &ColumnNames::default()).unwrap_err();
        assert!(matches!(err, RfvError::MissingColumn { column } if column == "ID_cliente"));
    }

    #[test]
    fn test_load_custom_column_names() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "InvoiceNo,InvoiceDate,CustomerID,Total").unwrap();
        writeln!(file, "536365,2010-12-01T08:26:00,17850,15.3").unwrap();

        let columns = ColumnNames {
            customer_id: "CustomerID".to_string(),
            purchase_date: "InvoiceDate".to_string(),
            purchase_code: "InvoiceNo".to_string(),
            amount: "Total".to_string(),
        };
        let transactions = load_transactions(file.path(), &columns).unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].purchase_date, date(2010, 12, 1));
    }

    #[test]
    fn test_load_rejects_bad_values() {
        let file = create_test_csv(&["17850,yesterday,536365,15.30"]);
        let err = load_transactions(file.path(), &ColumnNames::default()).unwrap_err();
        assert!(matches!(err, RfvError::InvalidDate { row: 1, .. }));

        let file = create_test_csv(&["17850,2021-12-01,536365,-4.00"]);
        let err = load_transactions(file.path(), &ColumnNames::default()).unwrap_err();
        assert!(matches!(err, RfvError::InvalidAmount { row: 1, .. }));
    }

    #[test]
    fn test_extract_metrics() {
        let reference = date(2021, 12, 9);
        let transactions = vec![
            Transaction::new("b", date(2021, 12, 1), "1", 10.0),
            Transaction::new("a", date(2021, 11, 29), "2", 5.5),
            Transaction::new("b", date(2021, 12, 7), "1", 2.5),
            Transaction::new("b", date(2021, 10, 1), "3", 0.0),
        ];

        let metrics = extract_metrics(&transactions, reference);
        assert_eq!(metrics.len(), 2);

        assert_eq!(metrics[0].customer_id, "a");
        assert_eq!(metrics[0].recency, 10);
        assert_eq!(metrics[0].frequency, 1);
        assert!((metrics[0].value - 5.5).abs() < 1e-9);

        // Duplicate purchase codes are counted, not collapsed
        assert_eq!(metrics[1].customer_id, "b");
        assert_eq!(metrics[1].recency, 2);
        assert_eq!(metrics[1].frequency, 3);
        assert!((metrics[1].value - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_extract_keeps_negative_recency() {
        let transactions = vec![Transaction::new("late", date(2021, 12, 12), "9", 1.0)];
        let metrics = extract_metrics(&transactions, date(2021, 12, 9));
        assert_eq!(metrics[0].recency, -3);
    }

    #[test]
    fn test_extract_empty_and_zero_value() {
        assert!(extract_metrics(&[], date(2021, 12, 9)).is_empty());

        let transactions = vec![
            Transaction::new("free", date(2021, 12, 1), "1", 0.0),
            Transaction::new("free", date(2021, 12, 2), "2", 0.0),
        ];
        let metrics = extract_metrics(&transactions, date(2021, 12, 9));
        assert_eq!(metrics[0].value, 0.0);
        assert_eq!(metrics[0].frequency, 2);
    }

    #[test]
    fn test_parse_purchase_date_formats() {
        assert_eq!(parse_purchase_date("2021-12-09"), Some(date(2021, 12, 9)));
        assert_eq!(parse_purchase_date("2021-12-09 23:59:59"), Some(date(2021, 12, 9)));
        assert_eq!(parse_purchase_date("2021-12-09T08:26:00.250"), Some(date(2021, 12, 9)));
        assert_eq!(parse_purchase_date("2021-12-09T08:26:00Z"), Some(date(2021, 12, 9)));
        assert_eq!(parse_purchase_date("09/12/2021"), Some(date(2021, 12, 9)));
        assert_eq!(parse_purchase_date("December 9"), None);
    }
}
