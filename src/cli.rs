//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::data::ColumnNames;

/// Customer segmentation CLI using quartile-based RFV scoring
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file of transactions
    #[arg(short, long, default_value = "data.csv")]
    pub input: PathBuf,

    /// Output path for the scored customer table (CSV)
    #[arg(short, long, default_value = "rfv_scores.csv")]
    pub output: PathBuf,

    /// Date recency is measured from (YYYY-MM-DD)
    #[arg(short, long, default_value = "2021-12-09")]
    pub reference_date: NaiveDate,

    /// JSON file mapping RFV scores to recommended actions
    /// (defaults to the built-in AAA/DDD/DAA/CAA table)
    #[arg(short, long)]
    pub actions: Option<PathBuf>,

    /// Name of the customer identifier column
    #[arg(long, default_value = "ID_cliente")]
    pub customer_col: String,

    /// Name of the purchase date column
    #[arg(long, default_value = "DiaCompra")]
    pub date_col: String,

    /// Name of the purchase code column
    #[arg(long, default_value = "CodigoCompra")]
    pub code_col: String,

    /// Name of the purchase amount column
    #[arg(long, default_value = "ValorTotal")]
    pub amount_col: String,

    /// Segment to list top customers for
    #[arg(short, long, default_value = "AAA")]
    pub segment: String,

    /// How many top customers to list
    #[arg(short, long, default_value = "10")]
    pub top: usize,

    /// Classification mode: grade R,F,V values against the loaded data
    /// Example: --classify "30,10,500.0" for Recency=30, Frequency=10, Value=500.0
    #[arg(short, long)]
    pub classify: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Column names for the transaction loader
    pub fn column_names(&self) -> ColumnNames {
        ColumnNames {
            customer_id: self.customer_col.clone(),
            purchase_date: self.date_col.clone(),
            purchase_code: self.code_col.clone(),
            amount: self.amount_col.clone(),
        }
    }

    /// Parse RFV values from the classify string
    /// Expected format: "recency,frequency,value"
    pub fn parse_rfv_values(&self) -> anyhow::Result<Option<(f64, f64, f64)>> {
        if let Some(ref classify_str) = self.classify {
            let parts: Vec<&str> = classify_str.split(',').collect();
            if parts.len() != 3 {
                anyhow::bail!("Classify values must be in format 'recency,frequency,value'");
            }

            let recency: f64 = parts[0]
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid recency value: {}", parts[0]))?;
            let frequency: f64 = parts[1]
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid frequency value: {}", parts[1]))?;
            let value: f64 = parts[2]
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid value: {}", parts[2]))?;

            Ok(Some((recency, frequency, value)))
        } else {
            Ok(None)
        }
    }
}
