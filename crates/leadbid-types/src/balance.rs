//! Per-account balances held by the deposit ledger.
//!
//! `available` funds can be locked as bid deposits, moved into escrow
//! custody or withdrawn. `locked` is the sum of the account's open bid
//! deposits and only leaves through a deposit release or conversion.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{LeadbidError, Result};

/// One account's balances.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceEntry {
    pub available: Decimal,
    /// Bid deposits on listings that have not released them yet.
    pub locked: Decimal,
}

impl BalanceEntry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn total(&self) -> Decimal {
        self.available + self.locked
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.total().is_zero()
    }

    /// Whether `available` can pay `needed` on its own. Locked deposits
    /// never count toward a payment.
    #[must_use]
    pub fn covers(&self, needed: Decimal) -> bool {
        self.available >= needed
    }

    /// Like [`covers`](Self::covers), as an error.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if `available < needed`.
    pub fn ensure_covers(&self, needed: Decimal) -> Result<()> {
        if self.covers(needed) {
            Ok(())
        } else {
            Err(LeadbidError::InsufficientBalance {
                needed,
                available: self.available,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_funds_do_not_cover_payments() {
        let entry = BalanceEntry {
            available: Decimal::new(40, 0),
            locked: Decimal::new(60, 0),
        };
        assert_eq!(entry.total(), Decimal::new(100, 0));
        assert!(entry.covers(Decimal::new(40, 0)));
        assert!(!entry.covers(Decimal::new(41, 0)));
        let err = entry.ensure_covers(Decimal::new(100, 0)).unwrap_err();
        assert!(matches!(
            err,
            LeadbidError::InsufficientBalance { available, .. } if available == Decimal::new(40, 0)
        ));
    }

    #[test]
    fn empty_entry() {
        let entry = BalanceEntry::new();
        assert!(entry.is_zero());
        assert!(entry.covers(Decimal::ZERO));
    }
}
