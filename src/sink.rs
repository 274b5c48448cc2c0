//! Sink adapters that receive the finished artifacts of a run

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::df;
use polars::prelude::*;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::pipeline::PipelineReport;

pub const TRANSACTIONS_FILE: &str = "transactions.csv";
pub const TOP_CATEGORIES_FILE: &str = "top_categories.csv";
pub const SEGMENTS_FILE: &str = "customer_segments.csv";
pub const RETENTION_FILE: &str = "cohort_retention.csv";
pub const DAILY_SALES_FILE: &str = "daily_sales.csv";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Durable destination for a run's artifacts. A delivery either stores all
/// artifacts or none of them.
pub trait Sink {
    fn deliver(&mut self, report: &PipelineReport) -> Result<()>;
}

/// Writes every artifact as CSV into one directory. Files are written to a
/// staging directory first and published with a rename, so a failed run
/// leaves the previous contents in place.
#[derive(Debug, Clone)]
pub struct CsvDirSink {
    dir: PathBuf,
}

impl CsvDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn sibling(&self, suffix: &str) -> Result<PathBuf> {
        let name = self.dir.file_name().ok_or_else(|| {
            PipelineError::InvalidConfig(format!(
                "output directory {} has no final component",
                self.dir.display()
            ))
        })?;
        Ok(self
            .dir
            .with_file_name(format!(".{}.{suffix}", name.to_string_lossy())))
    }

    fn write_all(&self, staging: &Path, report: &PipelineReport) -> Result<()> {
        write_frame(&staging.join(TRANSACTIONS_FILE), transactions_frame(report)?)?;
        write_frame(&staging.join(TOP_CATEGORIES_FILE), top_categories_frame(report)?)?;
        write_frame(&staging.join(SEGMENTS_FILE), segments_frame(report)?)?;
        write_frame(&staging.join(RETENTION_FILE), retention_frame(report)?)?;
        write_frame(&staging.join(DAILY_SALES_FILE), daily_sales_frame(report)?)?;
        Ok(())
    }
}

impl Sink for CsvDirSink {
    fn deliver(&mut self, report: &PipelineReport) -> Result<()> {
        let staging = self.sibling("staging")?;
        let previous = self.sibling("previous")?;

        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        if let Err(err) = self.write_all(&staging, report) {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!(dir = %staging.display(), error = %cleanup, "failed to remove staging directory");
            }
            return Err(err);
        }

        publish(&staging, &self.dir, &previous)?;

        info!(dir = %self.dir.display(), rows = report.canonical.len(), "delivered artifacts");
        Ok(())
    }
}

/// Swap `staging` into `dir`, parking the old contents at `previous` until the
/// rename succeeds. On failure `dir` is restored from `previous`.
fn publish(staging: &Path, dir: &Path, previous: &Path) -> Result<()> {
    if previous.exists() {
        fs::remove_dir_all(previous)?;
    }
    let had_previous = dir.exists();
    if had_previous {
        fs::rename(dir, previous)?;
    }
    if let Err(err) = fs::rename(staging, dir) {
        if had_previous {
            fs::rename(previous, dir)?;
        }
        return Err(err.into());
    }
    if had_previous {
        fs::remove_dir_all(previous)?;
    }
    Ok(())
}

fn write_frame(path: &Path, mut df: DataFrame) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}

fn transactions_frame(report: &PipelineReport) -> Result<DataFrame> {
    let rows = &report.canonical;
    let df = df!(
        "transaction_id" => rows.iter().map(|r| r.transaction.transaction_id.clone()).collect::<Vec<String>>(),
        "customer_id" => rows.iter().map(|r| r.transaction.customer_id.clone()).collect::<Vec<String>>(),
        "category" => rows.iter().map(|r| r.transaction.category.clone()).collect::<Vec<String>>(),
        "quantity" => rows.iter().map(|r| r.transaction.quantity).collect::<Vec<u64>>(),
        "unit_price" => rows.iter().map(|r| r.transaction.unit_price).collect::<Vec<f64>>(),
        "timestamp" => rows
            .iter()
            .map(|r| r.transaction.timestamp.format(TIMESTAMP_FORMAT).to_string())
            .collect::<Vec<String>>(),
        "total_sales" => rows.iter().map(|r| r.total_sales).collect::<Vec<f64>>()
    )?;
    Ok(df)
}

fn top_categories_frame(report: &PipelineReport) -> Result<DataFrame> {
    let top = &report.top_categories;
    let df = df!(
        "rank" => (1..=top.len() as u64).collect::<Vec<u64>>(),
        "category" => top.iter().map(|c| c.category.clone()).collect::<Vec<String>>(),
        "total_sales" => top.iter().map(|c| c.total_sales).collect::<Vec<f64>>()
    )?;
    Ok(df)
}

fn segments_frame(report: &PipelineReport) -> Result<DataFrame> {
    let segments = &report.segments;
    let df = df!(
        "customer_id" => segments.iter().map(|s| s.customer_id.clone()).collect::<Vec<String>>(),
        "total_spend" => segments.iter().map(|s| s.total_spend).collect::<Vec<f64>>(),
        "segment" => segments.iter().map(|s| s.segment.to_string()).collect::<Vec<String>>()
    )?;
    Ok(df)
}

fn retention_frame(report: &PipelineReport) -> Result<DataFrame> {
    let cells = report.retention.cells();
    let df = df!(
        "cohort" => cells.iter().map(|c| c.cohort.to_string()).collect::<Vec<String>>(),
        "elapsed_periods" => cells.iter().map(|c| c.elapsed_periods).collect::<Vec<u32>>(),
        "retained_customers" => cells.iter().map(|c| c.retained_customers as u64).collect::<Vec<u64>>(),
        "cohort_size" => cells.iter().map(|c| c.cohort_size as u64).collect::<Vec<u64>>(),
        "retention_rate" => cells.iter().map(|c| c.retention_rate).collect::<Vec<f64>>()
    )?;
    Ok(df)
}

fn daily_sales_frame(report: &PipelineReport) -> Result<DataFrame> {
    let days = &report.daily_sales;
    let df = df!(
        "date" => days.iter().map(|d| d.date.to_string()).collect::<Vec<String>>(),
        "total_sales" => days.iter().map(|d| d.total_sales).collect::<Vec<f64>>()
    )?;
    Ok(df)
}
