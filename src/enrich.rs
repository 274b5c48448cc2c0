//! Derived columns and category/customer aggregates

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use crate::cleaner::Transaction;

/// Canonical row with its line total
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedTransaction {
    pub transaction: Transaction,
    /// `quantity * unit_price`
    pub total_sales: f64,
}

/// Total sales of one category
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryAggregate {
    pub category: String,
    pub total_sales: f64,
    pub transaction_count: usize,
}

/// Partial sums for one customer
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerSpend {
    pub customer_id: String,
    pub total_spend: f64,
    /// Earliest transaction, used for cohort assignment
    pub first_purchase: NaiveDateTime,
    pub transaction_count: usize,
}

/// Total sales of one calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct DailySales {
    pub date: NaiveDate,
    pub total_sales: f64,
}

/// Enricher output
#[derive(Debug, Clone, Default)]
pub struct EnrichedTable {
    /// Rows in canonical order
    pub rows: Vec<EnrichedTransaction>,
    /// Sorted by category name
    pub categories: Vec<CategoryAggregate>,
    /// Sorted by customer id
    pub customers: Vec<CustomerSpend>,
}

impl EnrichedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of `total_sales` over all rows
    pub fn total_sales(&self) -> f64 {
        self.rows.iter().map(|row| row.total_sales).sum()
    }

    /// Total sales per calendar day, in date order
    pub fn daily_sales(&self) -> Vec<DailySales> {
        let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for row in &self.rows {
            *by_day.entry(row.transaction.timestamp.date()).or_insert(0.0) += row.total_sales;
        }
        by_day
            .into_iter()
            .map(|(date, total_sales)| DailySales { date, total_sales })
            .collect()
    }
}

/// Append `total_sales` and build the category and customer groupings
pub fn enrich(rows: Vec<Transaction>) -> EnrichedTable {
    let rows: Vec<EnrichedTransaction> = rows
        .into_iter()
        .map(|transaction| EnrichedTransaction {
            total_sales: transaction.quantity as f64 * transaction.unit_price,
            transaction,
        })
        .collect();

    let mut categories: BTreeMap<&str, CategoryAggregate> = BTreeMap::new();
    let mut customers: BTreeMap<&str, CustomerSpend> = BTreeMap::new();

    for row in &rows {
        let tx = &row.transaction;

        let category = categories
            .entry(tx.category.as_str())
            .or_insert_with(|| CategoryAggregate {
                category: tx.category.clone(),
                total_sales: 0.0,
                transaction_count: 0,
            });
        category.total_sales += row.total_sales;
        category.transaction_count += 1;

        let customer = customers
            .entry(tx.customer_id.as_str())
            .or_insert_with(|| CustomerSpend {
                customer_id: tx.customer_id.clone(),
                total_spend: 0.0,
                first_purchase: tx.timestamp,
                transaction_count: 0,
            });
        customer.total_spend += row.total_sales;
        customer.first_purchase = customer.first_purchase.min(tx.timestamp);
        customer.transaction_count += 1;
    }

    let categories: Vec<CategoryAggregate> = categories.into_values().collect();
    let customers: Vec<CustomerSpend> = customers.into_values().collect();

    info!(
        rows = rows.len(),
        categories = categories.len(),
        customers = customers.len(),
        "enriched transactions"
    );

    EnrichedTable {
        rows,
        categories,
        customers,
    }
}
