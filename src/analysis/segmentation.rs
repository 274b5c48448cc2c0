//! Customer spend segmentation using distribution-based thresholds

use std::fmt;

use tracing::debug;

use crate::enrich::CustomerSpend;
use crate::error::{PipelineError, Result};

/// Quantile at or below which a customer is a low spender (lower tertile)
pub const LOW_SPEND_QUANTILE: f64 = 1.0 / 3.0;
/// Quantile at or below which a customer is a medium spender (upper tertile)
pub const HIGH_SPEND_QUANTILE: f64 = 2.0 / 3.0;

/// Spend tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    Low,
    Medium,
    High,
}

impl Segment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Low => "low",
            Segment::Medium => "medium",
            Segment::High => "high",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quantile cut points for the three tiers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentationPolicy {
    pub low_quantile: f64,
    pub high_quantile: f64,
}

impl Default for SegmentationPolicy {
    fn default() -> Self {
        Self {
            low_quantile: LOW_SPEND_QUANTILE,
            high_quantile: HIGH_SPEND_QUANTILE,
        }
    }
}

impl SegmentationPolicy {
    /// Build a policy, requiring `0 <= low <= high <= 1`
    pub fn new(low_quantile: f64, high_quantile: f64) -> Result<Self> {
        let policy = Self {
            low_quantile,
            high_quantile,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        let in_range = |q: f64| (0.0..=1.0).contains(&q);
        if !in_range(self.low_quantile) || !in_range(self.high_quantile) {
            return Err(PipelineError::InvalidConfig(format!(
                "segmentation quantiles must lie in [0, 1], got {} and {}",
                self.low_quantile, self.high_quantile
            )));
        }
        if self.low_quantile > self.high_quantile {
            return Err(PipelineError::InvalidConfig(format!(
                "low quantile {} exceeds high quantile {}",
                self.low_quantile, self.high_quantile
            )));
        }
        Ok(())
    }

    /// Spend thresholds `(low, high)` for a distribution sorted ascending
    fn thresholds(&self, sorted_spend: &[f64]) -> (f64, f64) {
        (
            quantile(sorted_spend, self.low_quantile),
            quantile(sorted_spend, self.high_quantile),
        )
    }
}

/// One customer's tier
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerSegment {
    pub customer_id: String,
    pub total_spend: f64,
    pub segment: Segment,
}

/// Assign every customer to `low`, `medium` or `high`
///
/// Thresholds come from the current spend distribution. Boundaries are
/// inclusive on the lower tier: `low` is spend at or below the low quantile,
/// `medium` at or below the high quantile, `high` above it. When every
/// customer spent the same amount all of them are `medium`.
///
/// # Returns
/// * One row per input customer, in input order
pub fn segment_customers(
    customers: &[CustomerSpend],
    policy: &SegmentationPolicy,
) -> Vec<CustomerSegment> {
    if customers.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<f64> = customers.iter().map(|c| c.total_spend).collect();
    sorted.sort_by(f64::total_cmp);

    let uniform = sorted.first() == sorted.last();
    let (low, high) = policy.thresholds(&sorted);
    debug!(low, high, uniform, "segmentation thresholds");

    customers
        .iter()
        .map(|customer| {
            let spend = customer.total_spend;
            let segment = if uniform {
                Segment::Medium
            } else if spend <= low {
                Segment::Low
            } else if spend <= high {
                Segment::Medium
            } else {
                Segment::High
            };
            CustomerSegment {
                customer_id: customer.customer_id.clone(),
                total_spend: spend,
                segment,
            }
        })
        .collect()
}

/// Linear interpolation between the order statistics around `q * (n - 1)`
fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted {
        [] => 0.0,
        [only] => *only,
        _ => {
            let mut position = q * (sorted.len() - 1) as f64;
            // 1/3 * 999 lands a hair below 333
            if (position - position.round()).abs() < 1e-9 {
                position = position.round();
            }
            let lower = position.floor() as usize;
            let upper = position.ceil() as usize;
            let fraction = position - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        }
    }
}
