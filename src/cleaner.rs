//! Data-quality repair: nulls, duplicates, type coercion and optional outlier removal

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ndarray::Array1;
use tracing::{debug, info};

use crate::data::RawRecord;

/// A cleaned purchase line. Identity and time fields are always present and
/// numeric fields are non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub transaction_id: String,
    pub customer_id: String,
    pub category: String,
    pub quantity: u64,
    pub unit_price: f64,
    pub timestamp: NaiveDateTime,
}

/// Fields that can cause a row to be rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    TransactionId,
    CustomerId,
    Category,
    Quantity,
    UnitPrice,
    Timestamp,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::TransactionId => "transaction_id",
            Field::CustomerId => "customer_id",
            Field::Category => "category",
            Field::Quantity => "quantity",
            Field::UnitPrice => "unit_price",
            Field::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// Why a row was dropped. Rejections are recovered locally: the row is
/// counted and the run continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rejection {
    MissingField(Field),
    MalformedField(Field),
    Duplicate,
    Outlier(Field),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingField(field) => write!(f, "missing {field}"),
            Rejection::MalformedField(field) => write!(f, "malformed {field}"),
            Rejection::Duplicate => f.write_str("duplicate transaction_id"),
            Rejection::Outlier(field) => write!(f, "outlier {field}"),
        }
    }
}

/// Discard accounting for one cleaning pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub discarded: usize,
    pub by_reason: BTreeMap<Rejection, usize>,
}

impl CleaningReport {
    fn reject(&mut self, row: impl fmt::Display, reason: Rejection) {
        debug!(%row, %reason, "dropping row");
        self.discarded += 1;
        *self.by_reason.entry(reason).or_insert(0) += 1;
    }

    pub fn count(&self, reason: Rejection) -> usize {
        self.by_reason.get(&reason).copied().unwrap_or(0)
    }
}

/// Canonical table plus its discard accounting
#[derive(Debug, Clone, Default)]
pub struct CleanOutput {
    pub rows: Vec<Transaction>,
    pub report: CleaningReport,
}

/// Clean raw records into the canonical table
///
/// # Arguments
/// * `raw` - Input rows in source order
/// * `outlier_zscore` - If set, drop rows whose `unit_price` and then `quantity`
///   z-score exceeds this threshold
///
/// # Returns
/// * Surviving rows in input order, and how many rows were dropped and why
pub fn clean(raw: &[RawRecord], outlier_zscore: Option<f64>) -> CleanOutput {
    let mut report = CleaningReport {
        input_rows: raw.len(),
        ..CleaningReport::default()
    };
    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(raw.len());

    for (index, record) in raw.iter().enumerate() {
        match coerce(record) {
            Ok(tx) => {
                if seen.insert(tx.transaction_id.clone()) {
                    rows.push(tx);
                } else {
                    report.reject(index, Rejection::Duplicate);
                }
            }
            Err(reason) => report.reject(index, reason),
        }
    }

    if let Some(threshold) = outlier_zscore {
        rows = remove_outliers(rows, Field::UnitPrice, threshold, &mut report);
        rows = remove_outliers(rows, Field::Quantity, threshold, &mut report);
    }

    info!(
        input = report.input_rows,
        kept = rows.len(),
        discarded = report.discarded,
        "cleaned transactions"
    );

    CleanOutput { rows, report }
}

/// Type-check one raw record
fn coerce(record: &RawRecord) -> Result<Transaction, Rejection> {
    let transaction_id = required(&record.transaction_id, Field::TransactionId)?;
    let customer_id = required(&record.customer_id, Field::CustomerId)?;
    let category = required(&record.category, Field::Category)?;
    let raw_timestamp = required(&record.timestamp, Field::Timestamp)?;

    let timestamp =
        parse_timestamp(raw_timestamp).ok_or(Rejection::MalformedField(Field::Timestamp))?;
    let quantity = match record.quantity.as_deref() {
        None => 0,
        Some(value) => parse_quantity(value).ok_or(Rejection::MalformedField(Field::Quantity))?,
    };
    let unit_price = match record.unit_price.as_deref() {
        None => 0.0,
        Some(value) => parse_price(value).ok_or(Rejection::MalformedField(Field::UnitPrice))?,
    };

    Ok(Transaction {
        transaction_id: transaction_id.to_string(),
        customer_id: customer_id.to_string(),
        category: category.to_string(),
        quantity,
        unit_price,
        timestamp,
    })
}

fn required(value: &Option<String>, field: Field) -> Result<&str, Rejection> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(Rejection::MissingField(field))
}

/// Non-negative integer; float notation is accepted only without a fraction
fn parse_quantity(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(quantity) = value.parse::<u64>() {
        return Some(quantity);
    }
    let float = value.parse::<f64>().ok()?;
    (float.is_finite() && float >= 0.0 && float.fract() == 0.0 && float <= u64::MAX as f64)
        .then_some(float as u64)
}

fn parse_price(value: &str) -> Option<f64> {
    let price = value.trim().parse::<f64>().ok()?;
    // -0.0 normalizes to 0.0
    (price.is_finite() && price >= 0.0).then_some(price + 0.0)
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]`, `YYYY-MM-DDTHH:MM:SS[.f]` and `YYYY-MM-DD`
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Drop rows whose z-score on `field` exceeds `threshold` (population std).
/// A constant column drops nothing.
fn remove_outliers(
    rows: Vec<Transaction>,
    field: Field,
    threshold: f64,
    report: &mut CleaningReport,
) -> Vec<Transaction> {
    let values: Array1<f64> = rows
        .iter()
        .map(|tx| match field {
            Field::Quantity => tx.quantity as f64,
            _ => tx.unit_price,
        })
        .collect();

    let Some(mean) = values.mean() else {
        return rows;
    };
    let std = values.std(0.0);
    if std == 0.0 || !std.is_finite() {
        return rows;
    }

    let z_scores = values.mapv(|v| ((v - mean) / std).abs());
    rows.into_iter()
        .zip(z_scores.iter())
        .filter_map(|(tx, &z)| {
            if z <= threshold {
                Some(tx)
            } else {
                report.reject(&tx.transaction_id, Rejection::Outlier(field));
                None
            }
        })
        .collect()
}
