//! Sealed bids and their deposits.
//!
//! ## State Machine
//!
//! ```text
//!   ┌───────────┐ reveal ┌──────────┐ resolve (winner) ┌──────────┐
//!   │ COMMITTED ├───────▶│ REVEALED ├─────────────────▶│ ACCEPTED │
//!   └─────┬─────┘        └────┬─────┘                  └──────────┘
//!         │ resolve/buy-now   │ below reserve / lost / buy-now
//!         ▼                   ▼
//!   ┌──────────────────────────────┐
//!   │           REJECTED           │  deposit withdrawable
//!   └──────────────────────────────┘
//! ```
//!
//! The deposit has its own small lifecycle ([`DepositState`]) so that a
//! withdrawal is a state check on the bid record, never a side table.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, Commitment, LeadbidError, ListingId, Result};

/// Lifecycle of a bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BidStatus {
    Committed,
    Revealed,
    Accepted,
    Rejected,
}

impl BidStatus {
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Committed, Self::Revealed | Self::Rejected)
                | (Self::Revealed, Self::Accepted | Self::Rejected)
        )
    }
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Committed => write!(f, "COMMITTED"),
            Self::Revealed => write!(f, "REVEALED"),
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Where the bid was placed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BidOrigin {
    /// Placed through the marketplace itself.
    OnPlatform,
    /// Placed from an off-site integration (partner API, agent).
    External,
}

/// What happened to the deposit locked at commit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepositState {
    /// Held by the ledger.
    Locked,
    /// Given back to the bidder via withdrawal.
    Returned,
    /// Converted into the winner's escrow contribution.
    Applied,
}

/// One bidder's sealed bid on one listing. Keyed by `(listing_id, bidder)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub listing_id: ListingId,
    pub bidder: AccountId,
    pub commitment: Commitment,
    pub origin: BidOrigin,
    /// Set only after a successful reveal.
    pub revealed_amount: Option<Decimal>,
    pub deposit: Decimal,
    pub deposit_state: DepositState,
    pub status: BidStatus,
    pub committed_at: DateTime<Utc>,
    pub revealed_at: Option<DateTime<Utc>>,
    /// Global order in which reveals were accepted. Lower wins ties.
    pub reveal_sequence: Option<u64>,
}

impl Bid {
    /// A freshly committed bid with its deposit locked.
    #[must_use]
    pub fn committed(
        listing_id: ListingId,
        bidder: AccountId,
        commitment: Commitment,
        origin: BidOrigin,
        deposit: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            listing_id,
            bidder,
            commitment,
            origin,
            revealed_amount: None,
            deposit,
            deposit_state: DepositState::Locked,
            status: BidStatus::Committed,
            committed_at: now,
            revealed_at: None,
            reveal_sequence: None,
        }
    }

    /// Whether the deposit can be withdrawn: the bid lost (or was never
    /// eligible) and the deposit is still held.
    #[must_use]
    pub fn is_withdrawable(&self) -> bool {
        self.status == BidStatus::Rejected && self.deposit_state == DepositState::Locked
    }

    /// Move to `target`, enforcing the state machine.
    ///
    /// # Errors
    /// Returns `NotEligible` if the transition is not allowed.
    pub fn transition(&mut self, target: BidStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(LeadbidError::NotEligible {
                reason: format!(
                    "bid by {} on {} cannot move from {} to {target}",
                    self.bidder, self.listing_id, self.status
                ),
            });
        }
        self.status = target;
        Ok(())
    }
}
