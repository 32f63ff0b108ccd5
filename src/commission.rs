// 💰 Commission Resolver - tier matching + aggregation
//
// Pure functions over an ordered tier snapshot and a list of sales.
// Callers supply active tiers sorted by min_amount ascending; the resolver
// never re-sorts, so the order it receives is the order it honors:
//   - overlapping tiers: the first one in the sequence wins
//   - amount outside every range: the LAST tier in the sequence applies
// Both rules depend on sequence order, not on numeric range properties.

use crate::entities::{CommissionTier, Sale};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommissionError {
    #[error("no commission tiers configured")]
    NoTiersConfigured,
}

// ============================================================================
// RESULTS
// ============================================================================

/// Outcome of resolving one amount against the tier list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierMatch {
    pub commission: f64,
    pub rate: f64,
    pub tier_name: String,
}

/// Per-sale commission detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionResult {
    pub sale_id: String,
    pub amount: f64,
    pub commission: f64,
    pub rate: f64,
    pub tier_name: String,
}

/// Totals over a collection of sales. `details[i]` corresponds to the i-th
/// input sale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommissionAggregate {
    pub total_sales_amount: f64,
    pub total_commission: f64,
    pub sale_count: usize,
    pub details: Vec<CommissionResult>,
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Match `amount` to a tier and compute its commission.
///
/// First tier (in the given order) whose inclusive range contains the amount
/// wins. When none does, the last tier of the sequence is applied, even if
/// another tier has a higher `max_amount`.
pub fn resolve_tier_for_amount(
    amount: f64,
    tiers: &[CommissionTier],
) -> Result<TierMatch, CommissionError> {
    let tier = tiers
        .iter()
        .find(|tier| tier.contains(amount))
        .or_else(|| tiers.last())
        .ok_or(CommissionError::NoTiersConfigured)?;

    Ok(TierMatch {
        commission: tier.commission_for(amount),
        rate: tier.rate,
        tier_name: tier.name.clone(),
    })
}

/// Resolve every sale and accumulate totals. All-or-nothing: the first
/// failure aborts the whole aggregation.
pub fn aggregate_commissions(
    sales: &[Sale],
    tiers: &[CommissionTier],
) -> Result<CommissionAggregate, CommissionError> {
    let mut total_sales_amount = 0.0;
    let mut total_commission = 0.0;
    let mut details = Vec::with_capacity(sales.len());

    for sale in sales {
        let matched = resolve_tier_for_amount(sale.amount, tiers)?;
        total_sales_amount += sale.amount;
        total_commission += matched.commission;

        details.push(CommissionResult {
            sale_id: sale.id.clone(),
            amount: sale.amount,
            commission: matched.commission,
            rate: matched.rate,
            tier_name: matched.tier_name,
        });
    }

    Ok(CommissionAggregate {
        total_sales_amount,
        total_commission,
        sale_count: sales.len(),
        details,
    })
}

// ============================================================================
// TESTS
// ============================================================================
