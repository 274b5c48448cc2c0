//! Cohort retention analysis

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::enrich::EnrichedTransaction;
use crate::period::{Granularity, Period};

/// One populated cell of the retention matrix
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionCell {
    pub cohort: Period,
    pub elapsed_periods: u32,
    /// Distinct cohort customers active in the observed period
    pub retained_customers: usize,
    pub cohort_size: usize,
    /// `retained_customers / cohort_size * 100`
    pub retention_rate: f64,
}

/// Sparse `(cohort, elapsed_periods) -> active customers` mapping
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionMatrix {
    granularity: Granularity,
    counts: BTreeMap<(Period, u32), usize>,
    cohort_sizes: BTreeMap<Period, usize>,
}

impl RetentionMatrix {
    fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            counts: BTreeMap::new(),
            cohort_sizes: BTreeMap::new(),
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Active customers of `cohort` after `elapsed_periods`; absent cells are 0
    pub fn get(&self, cohort: &Period, elapsed_periods: u32) -> usize {
        self.counts
            .get(&(*cohort, elapsed_periods))
            .copied()
            .unwrap_or(0)
    }

    /// Number of customers whose first purchase falls in `cohort`
    pub fn cohort_size(&self, cohort: &Period) -> usize {
        self.cohort_sizes.get(cohort).copied().unwrap_or(0)
    }

    /// Cohorts in chronological order
    pub fn cohorts(&self) -> impl Iterator<Item = &Period> {
        self.cohort_sizes.keys()
    }

    /// Populated cells ordered by cohort, then elapsed periods
    pub fn cells(&self) -> Vec<RetentionCell> {
        self.counts
            .iter()
            .map(|(&(cohort, elapsed_periods), &retained_customers)| {
                let cohort_size = self.cohort_size(&cohort);
                RetentionCell {
                    cohort,
                    elapsed_periods,
                    retained_customers,
                    cohort_size,
                    retention_rate: retained_customers as f64 / cohort_size as f64 * 100.0,
                }
            })
            .collect()
    }

    /// Number of populated cells
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Build the cohort retention matrix
///
/// Every customer belongs to the period of their earliest transaction. Each
/// later period in which they transacted counts them once, however many
/// transactions they made in it.
pub fn cohort_retention(rows: &[EnrichedTransaction], granularity: Granularity) -> RetentionMatrix {
    let mut active: HashMap<&str, BTreeSet<Period>> = HashMap::new();
    for row in rows {
        let tx = &row.transaction;
        active
            .entry(tx.customer_id.as_str())
            .or_default()
            .insert(granularity.period_of(tx.timestamp));
    }

    let mut matrix = RetentionMatrix::new(granularity);
    for periods in active.values() {
        // The earliest active period is the cohort
        let Some(cohort) = periods.first().copied() else {
            continue;
        };
        *matrix.cohort_sizes.entry(cohort).or_insert(0) += 1;
        for observed in periods {
            let elapsed = u32::try_from(cohort.periods_until(observed)).unwrap_or(0);
            *matrix.counts.entry((cohort, elapsed)).or_insert(0) += 1;
        }
    }

    debug!(
        cohorts = matrix.cohort_sizes.len(),
        cells = matrix.counts.len(),
        %granularity,
        "computed cohort retention"
    );
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::{parse_timestamp, Transaction};

    fn row(id: &str, cust: &str, ts: &str) -> EnrichedTransaction {
        EnrichedTransaction {
            transaction: Transaction {
                transaction_id: id.to_string(),
                customer_id: cust.to_string(),
                category: "X".to_string(),
                quantity: 1,
                unit_price: 1.0,
                timestamp: parse_timestamp(ts).unwrap(),
            },
            total_sales: 1.0,
        }
    }

    fn month(ts: &str) -> Period {
        Granularity::Month.period_of(parse_timestamp(ts).unwrap())
    }

    #[test]
    fn test_two_customer_cohort() {
        let rows = vec![
            row("1", "A", "2024-01-05"),
            row("2", "A", "2024-02-10"),
            row("3", "B", "2024-01-20"),
        ];

        let matrix = cohort_retention(&rows, Granularity::Month);
        let jan = month("2024-01-01");

        assert_eq!(matrix.cohort_size(&jan), 2);
        assert_eq!(matrix.get(&jan, 0), 2);
        assert_eq!(matrix.get(&jan, 1), 1);
        assert_eq!(matrix.get(&jan, 2), 0);
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.cohorts().count(), 1);
    }

    #[test]
    fn test_distinct_customers_not_transactions() {
        let rows = vec![
            row("1", "A", "2024-03-01"),
            row("2", "A", "2024-03-02"),
            row("3", "A", "2024-05-01"),
            row("4", "A", "2024-05-30"),
            row("5", "A", "2024-05-31"),
        ];

        let matrix = cohort_retention(&rows, Granularity::Month);
        let mar = month("2024-03-15");

        assert_eq!(matrix.get(&mar, 0), 1);
        assert_eq!(matrix.get(&mar, 1), 0);
        assert_eq!(matrix.get(&mar, 2), 1);
    }

    #[test]
    fn test_lapsed_customers_may_return() {
        let rows = vec![
            row("1", "A", "2024-01-01"),
            row("2", "B", "2024-01-02"),
            row("3", "A", "2024-03-01"),
            row("4", "B", "2024-03-01"),
            row("5", "C", "2024-02-01"),
        ];

        let matrix = cohort_retention(&rows, Granularity::Month);
        let jan = month("2024-01-01");
        let feb = month("2024-02-01");

        assert_eq!(matrix.get(&jan, 1), 0);
        assert_eq!(matrix.get(&jan, 2), 2);
        assert_eq!(matrix.cohort_size(&feb), 1);
        assert_eq!(matrix.get(&feb, 0), 1);
    }

    #[test]
    fn test_period_zero_equals_cohort_size() {
        let rows = vec![
            row("1", "A", "2024-01-31"),
            row("2", "B", "2024-02-01"),
            row("3", "C", "2024-02-15"),
            row("4", "A", "2024-04-01"),
            row("5", "D", "2023-12-31"),
            row("6", "D", "2024-01-01"),
        ];

        let matrix = cohort_retention(&rows, Granularity::Month);
        for cohort in matrix.cohorts() {
            assert_eq!(matrix.get(cohort, 0), matrix.cohort_size(cohort));
        }
        let dec = month("2023-12-01");
        assert_eq!(matrix.get(&dec, 1), 1);
    }

    #[test]
    fn test_unordered_input_uses_earliest_transaction() {
        let rows = vec![row("1", "A", "2024-06-01"), row("2", "A", "2024-01-01")];

        let matrix = cohort_retention(&rows, Granularity::Month);
        let jan = month("2024-01-01");
        assert_eq!(matrix.get(&jan, 5), 1);
    }

    #[test]
    fn test_weekly_granularity() {
        let rows = vec![
            row("1", "A", "2024-01-01"),
            row("2", "A", "2024-01-09"),
            row("3", "B", "2024-01-07"),
        ];

        let matrix = cohort_retention(&rows, Granularity::Week);
        let cells = matrix.cells();

        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].retained_customers, 2);
        assert_eq!(cells[1].elapsed_periods, 1);
        assert_eq!(cells[1].retention_rate, 50.0);
    }

    #[test]
    fn test_cells_carry_rates() {
        let rows = vec![
            row("1", "A", "2024-01-05"),
            row("2", "A", "2024-02-10"),
            row("3", "B", "2024-01-20"),
        ];

        let cells = cohort_retention(&rows, Granularity::Month).cells();
        assert_eq!(cells[0].retention_rate, 100.0);
        assert_eq!(cells[1].retention_rate, 50.0);
        assert_eq!(cells[1].cohort.to_string(), "2024-01");
    }

    #[test]
    fn test_empty_input() {
        let matrix = cohort_retention(&[], Granularity::Month);
        assert!(matrix.is_empty());
        assert!(matrix.cells().is_empty());
    }
}
