//! Error taxonomy for a pipeline run

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Failures that abort a run. Row-level problems are not errors; they are
/// recorded as [`crate::cleaner::Rejection`]s and the run continues.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to extract records from {}: {reason}", path.display())]
    FatalExtraction { path: PathBuf, reason: String },

    #[error("input is missing required column `{column}`")]
    MissingColumn { column: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
