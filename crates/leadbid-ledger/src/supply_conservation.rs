//! Supply conservation invariant checker.
//!
//! ```text
//! Σ(available + locked) + Σ(escrow custody) == Σ(credits) - Σ(withdrawals)
//! ```
//!
//! Deposit locks, escrow funding, payouts and refunds only move value
//! between buckets. Only `credit` and `withdraw` change the total.

use leadbid_types::{LeadbidError, Result};
use rust_decimal::Decimal;

/// Where the ledger's value sits at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplySnapshot {
    /// Sum of every account's available and locked balance.
    pub balances: Decimal,
    /// Sum of value held for escrows.
    pub custody: Decimal,
}

impl SupplySnapshot {
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.balances + self.custody
    }
}

/// Running totals of external inflow and outflow.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    credits: Decimal,
    withdrawals: Decimal,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_credit(&mut self, amount: Decimal) {
        self.credits += amount;
    }

    pub fn record_withdrawal(&mut self, amount: Decimal) {
        self.withdrawals += amount;
    }

    #[must_use]
    pub fn expected_supply(&self) -> Decimal {
        self.credits - self.withdrawals
    }

    /// Check a snapshot against the external flows seen so far.
    ///
    /// # Errors
    /// Returns [`LeadbidError::SupplyInvariantViolation`] if value was
    /// created or destroyed.
    pub fn verify(&self, snapshot: SupplySnapshot) -> Result<()> {
        let expected = self.expected_supply();
        let actual = snapshot.total();
        if actual != expected {
            tracing::error!(%actual, %expected, balances = %snapshot.balances, custody = %snapshot.custody, "Supply drift");
            return Err(LeadbidError::SupplyInvariantViolation {
                reason: format!(
                    "balances {} + custody {} = {actual}, expected {expected} \
                     (credited {}, withdrawn {})",
                    snapshot.balances, snapshot.custody, self.credits, self.withdrawals,
                ),
            });
        }
        Ok(())
    }
}
