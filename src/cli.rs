//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;

use crate::analysis::{SegmentationPolicy, DEFAULT_TOP_N, HIGH_SPEND_QUANTILE, LOW_SPEND_QUANTILE};
use crate::config::PipelineConfig;
use crate::period::Granularity;

/// Clean e-commerce transactions and compute top categories, spend segments
/// and cohort retention. Runs once per invocation.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the raw transactions CSV file
    #[arg(short, long, env = "SALESFORGE_INPUT", default_value = "data/transactions.csv")]
    pub input: PathBuf,

    /// Directory that receives the output tables
    #[arg(short, long, env = "SALESFORGE_OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Number of categories in the top categories table
    #[arg(short = 'n', long, env = "SALESFORGE_TOP_N", default_value_t = DEFAULT_TOP_N)]
    pub top_n: usize,

    /// Cohort period: day, week or month
    #[arg(short, long, env = "SALESFORGE_GRANULARITY", default_value = "month")]
    pub granularity: Granularity,

    /// Spend quantile at or below which customers are low spenders
    #[arg(long, env = "SALESFORGE_LOW_QUANTILE", default_value_t = LOW_SPEND_QUANTILE)]
    pub low_quantile: f64,

    /// Spend quantile at or below which customers are medium spenders
    #[arg(long, env = "SALESFORGE_HIGH_QUANTILE", default_value_t = HIGH_SPEND_QUANTILE)]
    pub high_quantile: f64,

    /// Drop rows whose unit price or quantity z-score exceeds this value
    #[arg(long, env = "SALESFORGE_OUTLIER_ZSCORE")]
    pub outlier_zscore: Option<f64>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Build and validate the pipeline configuration
    pub fn to_config(&self) -> crate::Result<PipelineConfig> {
        let config = PipelineConfig {
            top_n: self.top_n,
            segmentation: SegmentationPolicy::new(self.low_quantile, self.high_quantile)?,
            granularity: self.granularity,
            outlier_zscore: self.outlier_zscore,
        };
        config.validate()?;
        Ok(config)
    }
}
