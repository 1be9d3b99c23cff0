//! # Listing: a seller's sale offer for one lead record
//!
//! ## State Machine
//!
//! ```text
//!   ┌────────┐ biddingEnd ┌─────────────┐ resolve (valid reveals) ┌──────────┐
//!   │ ACTIVE ├───────────▶│ REVEAL_PHASE├────────────────────────▶│ RESOLVED │
//!   └───┬────┘            └──────┬──────┘                         └──────────┘
//!       │ buy-now                │ resolve (no valid reveals)          ▲
//!       │                        ▼                                     │
//!       │                   ┌─────────┐                                │
//!       │                   │ EXPIRED │                                │
//!       │                   └─────────┘                                │
//!       └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `ACTIVE → REVEAL_PHASE` edge is time-driven and applied lazily:
//! [`Listing::phase_at`] reports the effective state for a given instant
//! and [`Listing::advance`] persists it. There is no timer.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{AccountId, AssetRef, EscrowId, LeadbidError, ListingId, Result, constants};

/// Lifecycle state of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingState {
    /// Accepting sealed commitments (and buy-now, if offered).
    Active,
    /// Bidding closed; accepting reveals until `reveal_end`.
    RevealPhase,
    /// A winner (or buy-now buyer) was determined and the asset reassigned.
    Resolved,
    /// No valid reveal; asset returned to the seller.
    Expired,
}

impl ListingState {
    /// Resolved and Expired listings accept no further commits or reveals.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Expired)
    }

    /// Can this listing transition to the given target state?
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Active, Self::RevealPhase | Self::Resolved)
                | (Self::RevealPhase, Self::Resolved | Self::Expired)
        )
    }
}

impl fmt::Display for ListingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::RevealPhase => write!(f, "REVEAL_PHASE"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// How a listing left the bidding lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Sealed-bid auction resolved to the highest valid reveal.
    Auction {
        winner: AccountId,
        amount: Decimal,
        escrow_id: EscrowId,
    },
    /// A buyer took the buy-now price before bidding closed.
    BuyNow {
        buyer: AccountId,
        price: Decimal,
        escrow_id: EscrowId,
    },
    /// Zero valid reveals; the asset went back to the seller.
    NoSale,
}

/// Attributes of the lead consumed by buyers' standing filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadAttributes {
    /// Region the lead originates from (e.g. ISO country or state code).
    pub geo: String,
    /// How the lead was captured (e.g. "web_form", "call_center").
    pub source_type: String,
}

impl LeadAttributes {
    #[must_use]
    pub fn new(geo: impl Into<String>, source_type: impl Into<String>) -> Self {
        Self {
            geo: geo.into(),
            source_type: source_type.into(),
        }
    }
}

/// Seller request to open a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingParams {
    pub asset_ref: AssetRef,
    pub reserve_price: Decimal,
    pub buy_now_price: Option<Decimal>,
    pub bidding_duration: std::time::Duration,
    pub reveal_duration: std::time::Duration,
    pub accepts_external_origin: bool,
    pub lead: LeadAttributes,
}

/// A sale offer. Retained as an immutable record after resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub asset_ref: AssetRef,
    pub seller: AccountId,
    pub reserve_price: Decimal,
    pub buy_now_price: Option<Decimal>,
    /// Commits are accepted strictly before this instant.
    pub bidding_end: DateTime<Utc>,
    /// Reveals are accepted from `bidding_end` up to, not including, this instant.
    pub reveal_end: DateTime<Utc>,
    pub accepts_external_origin: bool,
    pub lead: LeadAttributes,
    pub state: ListingState,
    pub resolution: Option<Resolution>,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Effective lifecycle state at `now`, applying the time-driven
    /// `Active → RevealPhase` edge without mutating.
    #[must_use]
    pub fn phase_at(&self, now: DateTime<Utc>) -> ListingState {
        match self.state {
            ListingState::Active if now >= self.bidding_end => ListingState::RevealPhase,
            state => state,
        }
    }

    /// Persist the effective state for `now`. Returns the new state.
    pub fn advance(&mut self, now: DateTime<Utc>) -> ListingState {
        self.state = self.phase_at(now);
        self.state
    }

    /// Whether a commit submitted at `now` is inside the bidding window.
    #[must_use]
    pub fn accepts_commits_at(&self, now: DateTime<Utc>) -> bool {
        self.phase_at(now) == ListingState::Active
    }

    /// Whether a reveal submitted at `now` is inside the reveal window.
    #[must_use]
    pub fn accepts_reveals_at(&self, now: DateTime<Utc>) -> bool {
        self.phase_at(now) == ListingState::RevealPhase && now < self.reveal_end
    }

    /// Whether `resolve_auction` may run at `now`.
    #[must_use]
    pub fn is_resolvable_at(&self, now: DateTime<Utc>) -> bool {
        !self.state.is_terminal() && now >= self.reveal_end
    }

    /// Deposit locked from each bidder: `reserve_price * bps / 10_000`,
    /// rounded down to the ledger scale.
    ///
    /// # Errors
    /// Returns `InvalidPrice` if the reserve is too large to take a
    /// fraction of.
    pub fn required_deposit(&self, deposit_bps: u32) -> Result<Decimal> {
        self.reserve_price
            .checked_mul(Decimal::from(deposit_bps))
            .and_then(|scaled| scaled.checked_div(Decimal::from(constants::BPS_DENOMINATOR)))
            .map(|deposit| {
                deposit.round_dp_with_strategy(constants::AMOUNT_SCALE, RoundingStrategy::ToZero)
            })
            .ok_or_else(|| LeadbidError::InvalidPrice {
                reason: format!(
                    "deposit of {deposit_bps} bps on reserve {} overflows",
                    self.reserve_price
                ),
            })
    }

    /// Move to a terminal state, recording how the listing ended.
    ///
    /// # Errors
    /// Returns `AlreadyResolved` if the listing is already terminal, or
    /// `Internal` if the transition is not part of the state machine.
    pub fn finish(&mut self, target: ListingState, resolution: Resolution) -> Result<()> {
        if self.state.is_terminal() {
            return Err(LeadbidError::AlreadyResolved(self.id));
        }
        if !target.is_terminal() || !self.state.can_transition_to(target) {
            return Err(LeadbidError::Internal(format!(
                "Cannot transition listing {} from {} to {target}",
                self.id, self.state
            )));
        }
        self.state = target;
        self.resolution = Some(resolution);
        Ok(())
    }
}

/// Dummy listing for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Listing {
    /// Create a listing with a 1h bidding and 1h reveal window starting at `start`.
    pub fn dummy(seller: AccountId, reserve_price: Decimal, start: DateTime<Utc>) -> Self {
        Self {
            id: ListingId::new(),
            asset_ref: AssetRef::new(format!("lead-{}", ListingId::new().0)),
            seller,
            reserve_price,
            buy_now_price: None,
            bidding_end: start + chrono::Duration::hours(1),
            reveal_end: start + chrono::Duration::hours(2),
            accepts_external_origin: true,
            lead: LeadAttributes::new("US-CA", "web_form"),
            state: ListingState::Active,
            resolution: None,
            created_at: start,
        }
    }
}
