//! Commit-reveal bid store.
//!
//! Holds one sealed bid per `(listing, bidder)`. A commit locks the
//! bidder's deposit through the [`DepositLedger`]. A reveal opens the
//! commitment and stamps it with a global reveal sequence, which is the
//! tie-break key at resolution. Bids that end up `Rejected` keep their
//! deposit locked until the bidder withdraws it.
//!
//! Every operation validates completely before it mutates, so a failed
//! call leaves both the store and the ledger untouched.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use leadbid_ledger::DepositLedger;
use leadbid_types::{
    AccountId, Bid, BidOrigin, BidStatus, Commitment, DepositState, LeadbidError, Listing,
    ListingId, Result, Salt, constants,
};
use rust_decimal::Decimal;

use crate::preference_filter::PreferenceFilter;

/// In-memory store of sealed and revealed bids.
pub struct BidStore {
    bids: HashMap<(ListingId, AccountId), Bid>,
    /// Bidders per listing, in commit order.
    order: HashMap<ListingId, Vec<AccountId>>,
    /// Next reveal sequence number, global across listings.
    next_reveal_seq: u64,
}

impl BidStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bids: HashMap::new(),
            order: HashMap::new(),
            next_reveal_seq: 0,
        }
    }

    /// Accept a sealed bid and lock its deposit.
    ///
    /// Returns the deposit that was locked.
    ///
    /// # Errors
    /// - `WindowClosed` outside the bidding window
    /// - `DuplicateCommit` if the bidder already committed on this listing
    /// - `NotEligible` if the bidder is the seller
    /// - `PreferenceRejected` from the filter (no deposit is locked)
    /// - `InsufficientBalance` if the bidder cannot cover the deposit
    #[allow(clippy::too_many_arguments)]
    pub fn commit_bid(
        &mut self,
        ledger: &mut DepositLedger,
        filter: &PreferenceFilter,
        listing: &Listing,
        bidder: AccountId,
        commitment: Commitment,
        origin: BidOrigin,
        deposit_bps: u32,
        now: DateTime<Utc>,
    ) -> Result<Decimal> {
        if !listing.accepts_commits_at(now) {
            return Err(LeadbidError::WindowClosed {
                listing_id: listing.id,
                operation: "commit_bid",
                state: listing.phase_at(now),
            });
        }
        let key = (listing.id, bidder);
        if self.bids.contains_key(&key) {
            return Err(LeadbidError::DuplicateCommit {
                listing_id: listing.id,
                bidder,
            });
        }
        if bidder == listing.seller {
            return Err(LeadbidError::NotEligible {
                reason: "seller cannot bid on their own listing".into(),
            });
        }
        filter.check(listing, bidder, origin)?;

        let deposit = listing.required_deposit(deposit_bps)?;
        ledger.lock_deposit(listing.id, bidder, deposit)?;

        let bid = Bid::committed(listing.id, bidder, commitment, origin, deposit, now);
        tracing::info!(
            listing = %listing.id,
            bidder = %bidder,
            commitment = %commitment,
            %deposit,
            "Bid committed"
        );
        self.bids.insert(key, bid);
        self.order.entry(listing.id).or_default().push(bidder);
        Ok(deposit)
    }

    /// Open a commitment.
    ///
    /// A reveal below the reserve price is accepted but the bid is marked
    /// `Rejected` straight away; its deposit stays withdrawable.
    ///
    /// # Errors
    /// - `WindowClosed` outside the reveal window
    /// - `BidNotFound` if the bidder never committed
    /// - `AlreadyRevealed` if the commitment was already opened
    /// - `InvalidReveal` if `(amount, salt)` does not hash to the commitment
    /// - `InvalidBidAmount` if the committed amount is not positive or is
    ///   above [`constants::MAX_AMOUNT`]
    pub fn reveal_bid(
        &mut self,
        listing: &Listing,
        bidder: AccountId,
        amount: Decimal,
        salt: &Salt,
        now: DateTime<Utc>,
    ) -> Result<&Bid> {
        if !listing.accepts_reveals_at(now) {
            return Err(LeadbidError::WindowClosed {
                listing_id: listing.id,
                operation: "reveal_bid",
                state: listing.phase_at(now),
            });
        }
        let bid = self
            .bids
            .get_mut(&(listing.id, bidder))
            .ok_or(LeadbidError::BidNotFound {
                listing_id: listing.id,
                bidder,
            })?;
        if bid.status != BidStatus::Committed {
            return Err(LeadbidError::AlreadyRevealed {
                listing_id: listing.id,
                bidder,
            });
        }
        if !bid.commitment.verify(listing.id, bidder, amount, salt) {
            tracing::warn!(listing = %listing.id, bidder = %bidder, "Reveal does not match commitment");
            return Err(LeadbidError::InvalidReveal {
                listing_id: listing.id,
                bidder,
            });
        }
        if amount <= Decimal::ZERO || amount > constants::MAX_AMOUNT {
            return Err(LeadbidError::InvalidBidAmount { amount });
        }

        bid.transition(BidStatus::Revealed)?;
        bid.revealed_amount = Some(amount);
        bid.revealed_at = Some(now);
        bid.reveal_sequence = Some(self.next_reveal_seq);
        self.next_reveal_seq += 1;

        if amount < listing.reserve_price {
            bid.transition(BidStatus::Rejected)?;
            tracing::info!(
                listing = %listing.id,
                bidder = %bidder,
                %amount,
                reserve = %listing.reserve_price,
                "Bid revealed below reserve"
            );
        } else {
            tracing::info!(listing = %listing.id, bidder = %bidder, %amount, "Bid revealed");
        }
        Ok(bid)
    }

    /// Return a losing bid's deposit to the bidder.
    ///
    /// Returns the amount released.
    ///
    /// # Errors
    /// - `NotEligible` if the listing is still open or the bid is not a
    ///   withdrawable loser
    /// - `BidNotFound` if the bidder never committed
    pub fn withdraw_bid(
        &mut self,
        ledger: &mut DepositLedger,
        listing: &Listing,
        bidder: AccountId,
    ) -> Result<Decimal> {
        if !listing.state.is_terminal() {
            return Err(LeadbidError::NotEligible {
                reason: format!("listing {} is still {}", listing.id, listing.state),
            });
        }
        let bid = self
            .bids
            .get_mut(&(listing.id, bidder))
            .ok_or(LeadbidError::BidNotFound {
                listing_id: listing.id,
                bidder,
            })?;
        if !bid.is_withdrawable() {
            return Err(LeadbidError::NotEligible {
                reason: format!(
                    "bid is {} with deposit {:?}",
                    bid.status, bid.deposit_state
                ),
            });
        }
        let amount = ledger.release_deposit(listing.id, bidder)?;
        bid.deposit_state = DepositState::Returned;
        tracing::info!(listing = %listing.id, bidder = %bidder, %amount, "Deposit withdrawn");
        Ok(amount)
    }

    /// Finalize every bid on a listing: the winner (if any) becomes
    /// `Accepted`, every other non-rejected bid becomes `Rejected`.
    ///
    /// Returns the bidders that were newly rejected.
    ///
    /// # Errors
    /// Returns `BidNotFound` if `winner` has no bid, or `NotEligible` if the
    /// winner's bid was never revealed. Nothing changes on error.
    pub fn settle(&mut self, listing_id: ListingId, winner: Option<AccountId>) -> Result<Vec<AccountId>> {
        if let Some(winner) = winner {
            let bid = self.get(listing_id, winner).ok_or(LeadbidError::BidNotFound {
                listing_id,
                bidder: winner,
            })?;
            if !bid.status.can_transition_to(BidStatus::Accepted) {
                return Err(LeadbidError::NotEligible {
                    reason: format!("winning bid by {winner} is {}", bid.status),
                });
            }
        }

        let mut rejected = Vec::new();
        for bidder in self.order.get(&listing_id).cloned().unwrap_or_default() {
            let Some(bid) = self.bids.get_mut(&(listing_id, bidder)) else {
                continue;
            };
            if Some(bidder) == winner {
                bid.transition(BidStatus::Accepted)?;
            } else if bid.status.can_transition_to(BidStatus::Rejected) {
                bid.transition(BidStatus::Rejected)?;
                rejected.push(bidder);
            }
        }
        tracing::debug!(listing = %listing_id, rejected = rejected.len(), "Bids settled");
        Ok(rejected)
    }

    /// Record that a bid's deposit was converted into escrow funding.
    ///
    /// # Errors
    /// Returns `BidNotFound`, or `DepositNotLocked` if the deposit already
    /// left the lock.
    pub fn mark_deposit_applied(&mut self, listing_id: ListingId, bidder: AccountId) -> Result<()> {
        let bid = self
            .bids
            .get_mut(&(listing_id, bidder))
            .ok_or(LeadbidError::BidNotFound { listing_id, bidder })?;
        if bid.deposit_state != DepositState::Locked {
            return Err(LeadbidError::DepositNotLocked { listing_id, bidder });
        }
        bid.deposit_state = DepositState::Applied;
        Ok(())
    }

    #[must_use]
    pub fn get(&self, listing_id: ListingId, bidder: AccountId) -> Option<&Bid> {
        self.bids.get(&(listing_id, bidder))
    }

    /// All bids on a listing, in commit order.
    #[must_use]
    pub fn bids_for(&self, listing_id: ListingId) -> Vec<&Bid> {
        self.order
            .get(&listing_id)
            .map(|bidders| {
                bidders
                    .iter()
                    .filter_map(|bidder| self.bids.get(&(listing_id, *bidder)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sum of deposits on a listing still held in the ledger lock.
    #[must_use]
    pub fn locked_deposits(&self, listing_id: ListingId) -> Decimal {
        self.bids_for(listing_id)
            .into_iter()
            .filter(|bid| bid.deposit_state == DepositState::Locked)
            .map(|bid| bid.deposit)
            .sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }
}

impl Default for BidStore {
    fn default() -> Self {
        Self::new()
    }
}
