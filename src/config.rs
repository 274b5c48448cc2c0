//! Run configuration for the analytics pipeline

use crate::analysis::{SegmentationPolicy, DEFAULT_TOP_N};
use crate::error::{PipelineError, Result};
use crate::period::{Granularity, DEFAULT_GRANULARITY};

/// Everything a run needs besides its input. Built once by the caller; the
/// core performs no configuration lookups of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Number of categories in the top-N view
    pub top_n: usize,
    pub segmentation: SegmentationPolicy,
    /// Cohort period width
    pub granularity: Granularity,
    /// Z-score threshold for outlier removal; `None` disables the filter
    pub outlier_zscore: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            segmentation: SegmentationPolicy::default(),
            granularity: DEFAULT_GRANULARITY,
            outlier_zscore: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.segmentation.validate()?;
        if let Some(threshold) = self.outlier_zscore {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "outlier z-score threshold must be positive, got {threshold}"
                )));
            }
        }
        Ok(())
    }
}
