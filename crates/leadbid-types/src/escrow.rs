//! # Escrow: custodial holding between a buyer and a seller
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐ fund  ┌────────┐ releaseDelay elapsed ┌──────────┐
//!   │ CREATED ├──────▶│ FUNDED ├─────────────────────▶│ RELEASED │
//!   └─────────┘       └───┬────┘                      └──────────┘
//!                         │ dispute (payer | payee)
//!                         ▼
//!                    ┌──────────┐ refund (adjudicator) ┌──────────┐
//!                    │ DISPUTED ├─────────────────────▶│ REFUNDED │
//!                    └──────────┘                      └──────────┘
//! ```
//!
//! `RELEASED` and `REFUNDED` are mutually exclusive terminal states: the
//! only edges into them start from different states, and every transition
//! checks the current state first.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, EscrowId, LeadbidError, ListingId, Result};

/// Lifecycle state of an escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowState {
    Created,
    Funded,
    Disputed,
    Released,
    Refunded,
}

impl EscrowState {
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Funded)
                | (Self::Funded, Self::Released | Self::Disputed)
                | (Self::Disputed, Self::Refunded)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Released | Self::Refunded)
    }
}

impl fmt::Display for EscrowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::Funded => write!(f, "FUNDED"),
            Self::Disputed => write!(f, "DISPUTED"),
            Self::Released => write!(f, "RELEASED"),
            Self::Refunded => write!(f, "REFUNDED"),
        }
    }
}

/// A custodial holding of `amount` from `payer` to `payee`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escrow {
    pub id: EscrowId,
    pub listing_id: ListingId,
    pub payer: AccountId,
    pub payee: AccountId,
    pub amount: Decimal,
    /// Portion of `amount` already in custody (e.g. the winner's deposit).
    pub funded: Decimal,
    pub state: EscrowState,
    pub created_at: DateTime<Utc>,
    pub funded_at: Option<DateTime<Utc>>,
    pub release_delay_secs: u64,
}

impl Escrow {
    /// Amount the payer still has to supply before the escrow is funded.
    #[must_use]
    pub fn outstanding(&self) -> Decimal {
        self.amount - self.funded
    }

    /// Instant after which the escrow may be released, once funded.
    #[must_use]
    pub fn release_due_at(&self) -> Option<DateTime<Utc>> {
        let delay = i64::try_from(self.release_delay_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX);
        self.funded_at
            .map(|at| at.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    /// Whether the account is the payer or payee.
    #[must_use]
    pub fn is_party(&self, account: AccountId) -> bool {
        account == self.payer || account == self.payee
    }

    /// Move to `target`, enforcing the state machine.
    ///
    /// # Errors
    /// Returns the error matching the operation that was refused:
    /// `AlreadyFunded` for funding, `NotFunded` for release/dispute,
    /// `NotDisputed` for refund.
    pub fn transition(&mut self, target: EscrowState) -> Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(match target {
                EscrowState::Funded => LeadbidError::AlreadyFunded {
                    escrow_id: self.id,
                    state: self.state,
                },
                EscrowState::Refunded => LeadbidError::NotDisputed {
                    escrow_id: self.id,
                    state: self.state,
                },
                EscrowState::Released | EscrowState::Disputed | EscrowState::Created => {
                    LeadbidError::NotFunded {
                        escrow_id: self.id,
                        state: self.state,
                    }
                }
            });
        }
        self.state = target;
        Ok(())
    }
}
