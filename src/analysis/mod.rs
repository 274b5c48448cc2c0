//! Analytical views over the enriched table
//!
//! Each view is a pure function of its input; none carries state between runs.

pub mod retention;
pub mod segmentation;
pub mod top_categories;

pub use retention::{cohort_retention, RetentionCell, RetentionMatrix};
pub use segmentation::{
    segment_customers, CustomerSegment, Segment, SegmentationPolicy, HIGH_SPEND_QUANTILE,
    LOW_SPEND_QUANTILE,
};
pub use top_categories::{top_categories, DEFAULT_TOP_N};
