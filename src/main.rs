//! Salesforge CLI: one pipeline run per invocation
//!
//! Extracts the raw CSV, runs the analytics core and hands every artifact to
//! the CSV directory sink. Nothing is written unless the whole run succeeds.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use salesforge::{run_from_csv, Args, CsvDirSink, PipelineReport, Segment, Sink};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.to_config().context("invalid configuration")?;
    let start_time = Instant::now();

    let report = run_from_csv(&args.input, &config)
        .with_context(|| format!("pipeline run over {} failed", args.input.display()))?;

    let mut sink = CsvDirSink::new(&args.output_dir);
    sink.deliver(&report)
        .with_context(|| format!("failed to write results to {}", args.output_dir.display()))?;

    print_summary(&report, &args, &sink);
    println!("\nTotal processing time: {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Print the run's headline numbers to stdout
fn print_summary(report: &PipelineReport, args: &Args, sink: &CsvDirSink) {
    println!("=== Run Summary ===");
    println!(
        "Rows: {} kept, {} discarded",
        report.canonical.len(),
        report.discarded()
    );
    for (reason, count) in &report.cleaning.by_reason {
        println!("  {reason}: {count}");
    }

    if report.is_empty() {
        println!("\nNo transactions survived cleaning; empty tables written.");
        return;
    }

    println!("\n=== Top {} Categories ===", args.top_n);
    for (rank, category) in report.top_categories.iter().enumerate() {
        println!("{:>2}. {:<24} {:>12.2}", rank + 1, category.category, category.total_sales);
    }

    println!("\n=== Customer Segments ===");
    for segment in [Segment::Low, Segment::Medium, Segment::High] {
        let size = report.segments.iter().filter(|s| s.segment == segment).count();
        let percentage = size as f64 / report.segments.len() as f64 * 100.0;
        println!("{:<6}: {} customers ({:.1}%)", segment.as_str(), size, percentage);
    }

    println!("\n=== Cohort Retention ({}) ===", report.retention.granularity());
    for cell in report.retention.cells() {
        println!(
            "{} +{:<3} {:>5}/{:<5} {:>6.1}%",
            cell.cohort,
            cell.elapsed_periods,
            cell.retained_customers,
            cell.cohort_size,
            cell.retention_rate
        );
    }

    println!("\nResults saved to: {}", sink.dir().display());
}
