//! Events emitted for off-core consumers (UI, indexers, CRM export).
//!
//! Every accepted state transition appends one [`EventRecord`] to the
//! engine's log. Records are sequenced so an indexer can resume from the
//! last `seq` it saw.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, Commitment, EscrowId, ListingId};

/// A state transition observable outside the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MarketEvent {
    ListingCreated {
        listing_id: ListingId,
        seller: AccountId,
        reserve_price: Decimal,
        bidding_end: DateTime<Utc>,
        reveal_end: DateTime<Utc>,
    },
    BidCommitted {
        listing_id: ListingId,
        bidder: AccountId,
        commitment: Commitment,
    },
    BidRevealed {
        listing_id: ListingId,
        bidder: AccountId,
        amount: Decimal,
    },
    DepositWithdrawn {
        listing_id: ListingId,
        bidder: AccountId,
        amount: Decimal,
    },
    AuctionResolved {
        listing_id: ListingId,
        winner: AccountId,
        amount: Decimal,
        /// Hex digest over every bid verdict, for audit.
        bid_root: String,
    },
    ListingExpired {
        listing_id: ListingId,
        bid_root: String,
    },
    BuyNowExecuted {
        listing_id: ListingId,
        buyer: AccountId,
        price: Decimal,
    },
    EscrowCreated {
        escrow_id: EscrowId,
        listing_id: ListingId,
        payer: AccountId,
        payee: AccountId,
        amount: Decimal,
    },
    EscrowFunded {
        escrow_id: EscrowId,
        amount: Decimal,
    },
    EscrowDisputed {
        escrow_id: EscrowId,
        by: AccountId,
    },
    EscrowReleased {
        escrow_id: EscrowId,
        payee: AccountId,
        payout: Decimal,
        fee: Decimal,
    },
    EscrowRefunded {
        escrow_id: EscrowId,
        payer: AccountId,
        amount: Decimal,
    },
}

impl MarketEvent {
    /// Stable event name, as used in logs and indexer topics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ListingCreated { .. } => "LISTING_CREATED",
            Self::BidCommitted { .. } => "BID_COMMITTED",
            Self::BidRevealed { .. } => "BID_REVEALED",
            Self::DepositWithdrawn { .. } => "DEPOSIT_WITHDRAWN",
            Self::AuctionResolved { .. } => "AUCTION_RESOLVED",
            Self::ListingExpired { .. } => "LISTING_EXPIRED",
            Self::BuyNowExecuted { .. } => "BUY_NOW_EXECUTED",
            Self::EscrowCreated { .. } => "ESCROW_CREATED",
            Self::EscrowFunded { .. } => "ESCROW_FUNDED",
            Self::EscrowDisputed { .. } => "ESCROW_DISPUTED",
            Self::EscrowReleased { .. } => "ESCROW_RELEASED",
            Self::EscrowRefunded { .. } => "ESCROW_REFUNDED",
        }
    }
}

impl fmt::Display for MarketEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A sequenced, timestamped event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub event: MarketEvent,
}
