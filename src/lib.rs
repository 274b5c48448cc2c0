//! Salesforge: batch analytics over e-commerce transactions
//!
//! A run flows Extractor → Cleaner → Enricher → Analyzer → Sink and yields a
//! canonical transaction table plus top-selling categories, customer spend
//! segments and cohort retention.

pub mod analysis;
pub mod cleaner;
pub mod cli;
pub mod config;
pub mod data;
pub mod enrich;
pub mod error;
pub mod period;
pub mod pipeline;
pub mod sink;

// Re-export public items for easier access
pub use analysis::{CustomerSegment, RetentionMatrix, Segment, SegmentationPolicy};
pub use cleaner::{clean, CleaningReport, Rejection, Transaction};
pub use cli::Args;
pub use config::PipelineConfig;
pub use data::{extract_csv, RawRecord};
pub use enrich::{enrich, CategoryAggregate, CustomerSpend, EnrichedTransaction};
pub use error::{PipelineError, Result};
pub use period::{Granularity, Period};
pub use pipeline::{run, run_from_csv, PipelineReport};
pub use sink::{CsvDirSink, Sink};
