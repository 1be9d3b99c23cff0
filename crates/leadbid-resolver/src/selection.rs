//! Pure deterministic winner selection.
//!
//! Takes the reserve price and every bid on a listing and returns the
//! outcome plus one verdict per bid. No side effects, no ledger access:
//! the engine applies the verdicts.
//!
//! ```text
//! select_winner(reserve, bids) -> Selection { outcome, verdicts, bid_root }
//! ```
//!
//! ## Tie-Break
//!
//! Among equal highest amounts, the bid with the lowest global
//! `reveal_sequence` wins (first revealed). Nothing else is compared.

use leadbid_types::{AccountId, Bid, BidStatus, ListingId};
use rust_decimal::Decimal;

use crate::determinism::compute_bid_root;

/// Why a bid ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerdictReason {
    /// Highest valid reveal.
    Winner,
    /// Valid reveal, but another bid won.
    Outbid,
    /// Revealed below the reserve price.
    BelowReserve,
    /// Never revealed; eligibility silently forfeited.
    NotRevealed,
}

impl VerdictReason {
    /// Stable tag folded into the bid root.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Winner => 0,
            Self::Outbid => 1,
            Self::BelowReserve => 2,
            Self::NotRevealed => 3,
        }
    }
}

/// Resolution verdict for one bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidVerdict {
    pub bidder: AccountId,
    pub amount: Option<Decimal>,
    pub reveal_sequence: Option<u64>,
    pub reason: VerdictReason,
}

impl BidVerdict {
    /// Final bid status this verdict maps to.
    #[must_use]
    pub fn status(&self) -> BidStatus {
        match self.reason {
            VerdictReason::Winner => BidStatus::Accepted,
            _ => BidStatus::Rejected,
        }
    }
}

/// Result of winner selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner {
        bidder: AccountId,
        amount: Decimal,
        reveal_sequence: u64,
    },
    NoValidBids,
}

/// Outcome plus the per-bid verdicts, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub outcome: Outcome,
    pub verdicts: Vec<BidVerdict>,
    pub bid_root: [u8; 32],
}

impl Selection {
    #[must_use]
    pub fn winner(&self) -> Option<AccountId> {
        match self.outcome {
            Outcome::Winner { bidder, .. } => Some(bidder),
            Outcome::NoValidBids => None,
        }
    }

    #[must_use]
    pub fn bid_root_hex(&self) -> String {
        hex::encode(self.bid_root)
    }
}

/// Select the winning bid.
///
/// ## Algorithm
///
/// 1. A bid is a candidate if it was revealed and its amount is at least
///    `reserve`. Bids already `Rejected` at reveal are never candidates.
/// 2. The candidate with the strictly highest amount wins; ties go to the
///    lowest `reveal_sequence`.
/// 3. Every bid gets a verdict; the bid root is computed over the
///    verdicts in input order.
///
/// Given the same bids in the same order, the output is identical.
#[must_use]
pub fn select_winner(listing_id: ListingId, reserve: Decimal, bids: &[&Bid]) -> Selection {
    let mut best: Option<(AccountId, Decimal, u64)> = None;
    let mut reasons = Vec::with_capacity(bids.len());

    for bid in bids {
        let reason = match (bid.revealed_amount, bid.reveal_sequence) {
            (Some(amount), Some(seq)) => {
                if amount < reserve || bid.status == BidStatus::Rejected {
                    VerdictReason::BelowReserve
                } else {
                    let beats = match best {
                        None => true,
                        Some((_, best_amount, best_seq)) => {
                            amount > best_amount || (amount == best_amount && seq < best_seq)
                        }
                    };
                    if beats {
                        best = Some((bid.bidder, amount, seq));
                    }
                    VerdictReason::Outbid
                }
            }
            _ => VerdictReason::NotRevealed,
        };
        reasons.push(reason);
    }

    let verdicts: Vec<BidVerdict> = bids
        .iter()
        .zip(reasons)
        .map(|(bid, reason)| {
            let reason = match best {
                Some((winner, ..)) if winner == bid.bidder => VerdictReason::Winner,
                _ => reason,
            };
            BidVerdict {
                bidder: bid.bidder,
                amount: bid.revealed_amount,
                reveal_sequence: bid.reveal_sequence,
                reason,
            }
        })
        .collect();

    let outcome = match best {
        Some((bidder, amount, reveal_sequence)) => Outcome::Winner {
            bidder,
            amount,
            reveal_sequence,
        },
        None => Outcome::NoValidBids,
    };
    let bid_root = compute_bid_root(listing_id, &verdicts);

    Selection {
        outcome,
        verdicts,
        bid_root,
    }
}
