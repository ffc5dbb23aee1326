//! RfvForge: Customer Segmentation CLI using quartile-based RFV analysis
//!
//! This is the main entrypoint that orchestrates data loading, segmentation,
//! reporting, export and single-customer classification.

use anyhow::{Context, Result};
use clap::Parser;
use rfvforge::{
    classify, composite_score, load_transactions, report, segment_customers, write_scored_table,
    ActionTable, Args, Metric, Segmentation,
};
use std::time::Instant;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let actions = match &args.actions {
        Some(path) => ActionTable::from_json_file(path)
            .with_context(|| format!("loading action table from {}", path.display()))?,
        None => ActionTable::default(),
    };

    // Check if in classification mode
    if let Some(rfv_values) = args.parse_rfv_values()? {
        run_classification_mode(&args, &actions, rfv_values)?;
    } else {
        run_full_pipeline(&args, &actions)?;
    }

    Ok(())
}

fn load_and_segment(args: &Args, actions: &ActionTable) -> Result<Segmentation> {
    log::info!("loading transactions from {}", args.input.display());
    let transactions = load_transactions(&args.input, &args.column_names())
        .with_context(|| format!("loading transactions from {}", args.input.display()))?;
    log::info!("loaded {} transactions", transactions.len());

    Ok(segment_customers(&transactions, args.reference_date, actions)?)
}

/// Grade a single R,F,V triple against thresholds from the loaded data
fn run_classification_mode(
    args: &Args,
    actions: &ActionTable,
    rfv_values: (f64, f64, f64),
) -> Result<()> {
    println!("=== Classification Mode ===");
    println!(
        "Input RFV values: R={}, F={}, V={}",
        rfv_values.0, rfv_values.1, rfv_values.2
    );

    let segmentation = load_and_segment(args, actions)?;
    let Some(thresholds) = segmentation.thresholds else {
        anyhow::bail!(
            "{} contains no customers to derive thresholds from",
            args.input.display()
        );
    };

    let recency = classify(rfv_values.0, Metric::Recency, &thresholds);
    let frequency = classify(rfv_values.1, Metric::Frequency, &thresholds);
    let value = classify(rfv_values.2, Metric::Value, &thresholds);
    let score = composite_score(recency, frequency, value);

    println!("\n✓ RFV Score: {}", score);
    println!("  Grades: R={}, F={}, V={}", recency, frequency, value);
    match actions.get(&score) {
        Some(action) => println!("  Recommended action: {}", action),
        None => println!("  Recommended action: none for this segment"),
    }

    let peers = segmentation
        .customers
        .iter()
        .filter(|c| c.score == score)
        .count();
    println!(
        "  Customers already in {}: {} ({:.1}% of total)",
        score,
        peers,
        report::segment_share(peers, segmentation.customers.len())
    );

    Ok(())
}

/// Run full segmentation pipeline
fn run_full_pipeline(args: &Args, actions: &ActionTable) -> Result<()> {
    println!("=== RFV Segmentation Pipeline ===\n");

    let start_time = Instant::now();
    let segmentation = load_and_segment(args, actions)?;

    let Some(thresholds) = segmentation.thresholds else {
        println!("No transactions found; nothing to segment.");
        return Ok(());
    };
    let customers = &segmentation.customers;
    println!(
        "✓ Segmented {} customers (reference date {})",
        customers.len(),
        args.reference_date
    );

    println!("\n=== Quartile Thresholds ===");
    println!("{:<10} {:>12} {:>12} {:>12}", "metric", "q25", "q50", "q75");
    for metric in Metric::ALL {
        let q = thresholds.get(metric);
        println!(
            "{:<10} {:>12.2} {:>12.2} {:>12.2}",
            metric.name(),
            q.q25,
            q.q50,
            q.q75
        );
    }

    println!("\n=== Customers per RFV Score ===");
    for (score, count) in report::segment_counts(customers) {
        let action = actions.get(&score).unwrap_or("-");
        println!(
            "{}: {:>6} customers ({:>5.1}%)  {}",
            score,
            count,
            report::segment_share(count, customers.len()),
            action
        );
    }

    let top = report::top_customers(customers, &args.segment, args.top);
    println!("\n=== Top {} customers with score '{}' ===", args.top, args.segment);
    if top.is_empty() {
        println!("(none)");
    }
    for customer in top {
        let m = &customer.metrics;
        println!(
            "{:<16} R={:<6} F={:<6} V={:.2}",
            m.customer_id, m.recency, m.frequency, m.value
        );
    }

    write_scored_table(&args.output, customers)
        .with_context(|| format!("writing {}", args.output.display()))?;

    let total_time = start_time.elapsed();
    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", total_time.as_secs_f64());
    println!("Scored table saved to: {}", args.output.display());

    Ok(())
}
