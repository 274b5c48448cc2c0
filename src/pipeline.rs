//! Single-invocation pipeline: clean, enrich, analyze

use std::path::Path;

use tracing::{info, warn};

use crate::analysis::{
    cohort_retention, segment_customers, top_categories, CustomerSegment, RetentionMatrix,
};
use crate::cleaner::{clean, CleaningReport};
use crate::config::PipelineConfig;
use crate::data::{extract_csv, RawRecord};
use crate::enrich::{enrich, CategoryAggregate, DailySales, EnrichedTransaction};
use crate::error::Result;

/// Every artifact of one run, handed to a sink as a unit
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Canonical transactions with `total_sales`, in input order
    pub canonical: Vec<EnrichedTransaction>,
    /// All category aggregates, sorted by name
    pub categories: Vec<CategoryAggregate>,
    pub top_categories: Vec<CategoryAggregate>,
    /// One row per customer, sorted by customer id
    pub segments: Vec<CustomerSegment>,
    pub retention: RetentionMatrix,
    pub daily_sales: Vec<DailySales>,
    pub cleaning: CleaningReport,
}

impl PipelineReport {
    /// True when no row survived cleaning. This is a valid outcome, not a failure.
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn discarded(&self) -> usize {
        self.cleaning.discarded
    }
}

/// Run the pipeline over one input snapshot
///
/// The run is self-contained: nothing is read from or kept for other runs.
/// An invalid configuration fails before any processing.
pub fn run(raw: &[RawRecord], config: &PipelineConfig) -> Result<PipelineReport> {
    config.validate()?;
    info!(rows = raw.len(), "starting pipeline run");

    let cleaned = clean(raw, config.outlier_zscore);
    if cleaned.rows.is_empty() {
        warn!(discarded = cleaned.report.discarded, "no rows survived cleaning");
    }

    let table = enrich(cleaned.rows);
    let top = top_categories(&table.categories, config.top_n);
    let segments = segment_customers(&table.customers, &config.segmentation);
    let retention = cohort_retention(&table.rows, config.granularity);
    let daily_sales = table.daily_sales();

    info!(
        canonical = table.rows.len(),
        discarded = cleaned.report.discarded,
        top_categories = top.len(),
        customers = segments.len(),
        cohorts = retention.cohorts().count(),
        "pipeline run complete"
    );

    Ok(PipelineReport {
        canonical: table.rows,
        categories: table.categories,
        top_categories: top,
        segments,
        retention,
        daily_sales,
        cleaning: cleaned.report,
    })
}

/// Extract a CSV and run the pipeline over it
pub fn run_from_csv(path: impl AsRef<Path>, config: &PipelineConfig) -> Result<PipelineReport> {
    config.validate()?;
    let raw = extract_csv(path)?;
    run(&raw, config)
}
