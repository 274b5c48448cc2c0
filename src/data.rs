//! Raw record extraction using Polars

use std::path::Path;

use polars::prelude::*;
use tracing::info;

use crate::error::{PipelineError, Result};

/// Column names of the fixed transaction schema, in canonical order
pub const SCHEMA_COLUMNS: [&str; 6] = [
    "transaction_id",
    "customer_id",
    "category",
    "quantity",
    "unit_price",
    "timestamp",
];

/// One uninterpreted input row. Every value is kept exactly as read;
/// blank cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub transaction_id: Option<String>,
    pub customer_id: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<String>,
    pub unit_price: Option<String>,
    pub timestamp: Option<String>,
}

impl RawRecord {
    /// Build a fully populated record
    pub fn new(
        transaction_id: impl Into<String>,
        customer_id: impl Into<String>,
        category: impl Into<String>,
        quantity: impl Into<String>,
        unit_price: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            transaction_id: Some(transaction_id.into()),
            customer_id: Some(customer_id.into()),
            category: Some(category.into()),
            quantity: Some(quantity.into()),
            unit_price: Some(unit_price.into()),
            timestamp: Some(timestamp.into()),
        }
    }
}

/// Read every row of a transaction CSV without interpreting any value
///
/// # Arguments
/// * `file_path` - Path to the CSV file; the header must name all six schema columns
///
/// # Returns
/// * Rows in file order, or a fatal extraction error if the source is unreadable
pub fn extract_csv(file_path: impl AsRef<Path>) -> Result<Vec<RawRecord>> {
    let path = file_path.as_ref();
    let fatal = |err: PolarsError| PipelineError::FatalExtraction {
        path: path.to_path_buf(),
        reason: err.to_string(),
    };

    // Schema inference disabled: all columns are read as strings. Rows with
    // surplus fields are truncated and left for the cleaner to reject.
    let df = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(0))
        .with_truncate_ragged_lines(true)
        .finish()
        .map_err(fatal)?
        .collect()
        .map_err(fatal)?;

    let records = records_from_frame(&df)?;
    info!(path = %path.display(), rows = records.len(), "extracted raw records");
    Ok(records)
}

/// Convert a string-typed frame into raw records
pub fn records_from_frame(df: &DataFrame) -> Result<Vec<RawRecord>> {
    let mut columns: Vec<Vec<Option<String>>> = Vec::with_capacity(SCHEMA_COLUMNS.len());
    for name in SCHEMA_COLUMNS {
        let series = df.column(name).map_err(|_| PipelineError::MissingColumn {
            column: name.to_string(),
        })?;
        let values = series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(non_blank)
            .collect();
        columns.push(values);
    }

    let mut columns = columns.into_iter();
    let mut next = || columns.next().unwrap_or_default().into_iter();
    let (ids, customers, categories) = (next(), next(), next());
    let (quantities, prices, timestamps) = (next(), next(), next());

    let records = ids
        .zip(customers)
        .zip(categories)
        .zip(quantities)
        .zip(prices)
        .zip(timestamps)
        .map(
            |(((((transaction_id, customer_id), category), quantity), unit_price), timestamp)| {
                RawRecord {
                    transaction_id,
                    customer_id,
                    category,
                    quantity,
                    unit_price,
                    timestamp,
                }
            },
        )
        .collect();

    Ok(records)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "transaction_id,customer_id,category,quantity,unit_price,timestamp,channel").unwrap();
        writeln!(file, "1,A,Books,2,10.00,2024-01-05 09:00:00,web").unwrap();
        writeln!(file, "2,,Books,1,abc,2024-02-10 10:30:00,store").unwrap();
        writeln!(file, "3,B,Toys,007,5,2024-01-20,web").unwrap();
        file
    }

    #[test]
    fn test_extract_keeps_values_uninterpreted() {
        let file = create_test_csv();
        let records = extract_csv(file.path()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            RawRecord::new("1", "A", "Books", "2", "10.00", "2024-01-05 09:00:00")
        );
        // Leading zeros survive because nothing is parsed here
        assert_eq!(records[2].quantity.as_deref(), Some("007"));
        assert_eq!(records[1].customer_id, None);
        assert_eq!(records[1].unit_price.as_deref(), Some("abc"));
    }

    #[test]
    fn test_ragged_row_is_kept_for_cleaning() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "transaction_id,customer_id,category,quantity,unit_price,timestamp").unwrap();
        writeln!(file, "1,A,X,2,10,2024-01-05").unwrap();
        writeln!(file, "2,B,Books, Kids,1,5,2024-01-20").unwrap();
        writeln!(file, "3,C,Y,1,5,2024-01-20").unwrap();

        let records = extract_csv(file.path()).unwrap();

        assert_eq!(records.len(), 3);
        // Fields shift right of the stray comma
        assert_eq!(records[1].quantity.as_deref(), Some("Kids"));
        assert_eq!(records[2], RawRecord::new("3", "C", "Y", "1", "5", "2024-01-20"));
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "transaction_id,customer_id,category,quantity,timestamp").unwrap();
        writeln!(file, "1,A,Books,2,2024-01-05").unwrap();

        let err = extract_csv(file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { ref column } if column == "unit_price"));
    }

    #[test]
    fn test_unreadable_source_is_fatal() {
        let err = extract_csv("/definitely/not/here/transactions.csv").unwrap_err();
        assert!(matches!(err, PipelineError::FatalExtraction { .. }));
    }

    #[test]
    fn test_header_only_file_yields_no_records() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "transaction_id,customer_id,category,quantity,unit_price,timestamp").unwrap();

        let records = extract_csv(file.path()).unwrap();
        assert!(records.is_empty());
    }
}
