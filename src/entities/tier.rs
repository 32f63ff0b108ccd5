// 📶 Commission Tier - an amount range paired with a percentage
//
// Tiers are edited by an administrative process and read by the resolver.
// A well-formed tier set covers the non-negative amounts with contiguous,
// non-overlapping ranges, but nothing here enforces that.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionTier {
    /// Stable identity (UUID)
    pub id: String,

    /// Display name, e.g. "Comisión Básica"
    pub name: String,

    /// Inclusive lower bound
    pub min_amount: f64,

    /// Inclusive upper bound
    pub max_amount: f64,

    /// Percentage applied to the sale amount (0 - 100)
    pub rate: f64,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl CommissionTier {
    /// Create an active tier with a fresh UUID
    pub fn new(name: &str, min_amount: f64, max_amount: f64, rate: f64) -> Self {
        CommissionTier {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            min_amount,
            max_amount,
            rate,
            active: true,
        }
    }

    /// Both bounds are inclusive.
    pub fn contains(&self, amount: f64) -> bool {
        amount >= self.min_amount && amount <= self.max_amount
    }

    /// Commission owed on `amount` at this tier's rate, unrounded.
    pub fn commission_for(&self, amount: f64) -> f64 {
        amount * self.rate / 100.0
    }
}
