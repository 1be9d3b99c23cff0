//! The marketplace: one owner for every piece of state.
//!
//! `Marketplace` wires the listing registry, bid store, preference filter,
//! deposit ledger, escrow engine and asset registry together and runs the
//! cross-component operations (resolution, buy-now). Every operation takes
//! `&mut self`, so operations are totally ordered; each one validates
//! before it mutates and either applies completely or not at all.
//!
//! ## Resolution
//!
//! ```text
//! resolve_auction
//!   → select_winner(reserve, bids)            (pure)
//!   → Winner:  asset → winner, escrow created, deposit → escrow,
//!              bids settled, listing Resolved, escrow funded if possible
//!   → NoValid: asset → seller, bids rejected, listing Expired
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use leadbid_bidding::{
    AssetRegistry, BidStore, ComplianceGate, InMemoryAssetRegistry, ListingRegistry,
    PreferenceFilter,
};
use leadbid_ledger::DepositLedger;
use leadbid_resolver::{Outcome, select_winner};
use leadbid_settlement::{EscrowEngine, ReleaseReceipt};
use leadbid_types::{
    AccountId, BalanceEntry, Bid, BidOrigin, BidStatus, BuyerPreferences, Commitment, DepositState,
    Escrow, EscrowId, EscrowState, EventRecord, LeadbidError, Listing, ListingId, ListingParams,
    ListingState, MarketConfig, MarketEvent, Resolution, Result, Salt,
};
use rust_decimal::Decimal;

use crate::clock::Clock;

/// How a resolved listing's deposits were accounted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingAudit {
    pub listing_id: ListingId,
    /// Every deposit locked during bidding.
    pub deposits_locked: Decimal,
    /// Returned to losers so far.
    pub deposits_returned: Decimal,
    /// Forwarded into the sale escrow (winner only).
    pub deposits_applied: Decimal,
    /// Still locked, waiting for the loser to withdraw.
    pub deposits_awaiting_withdrawal: Decimal,
    pub escrow: Option<EscrowId>,
}

/// Single owner of all engine state.
pub struct Marketplace<A: AssetRegistry = InMemoryAssetRegistry> {
    config: MarketConfig,
    ledger: DepositLedger,
    listings: ListingRegistry,
    bids: BidStore,
    filter: PreferenceFilter,
    escrows: EscrowEngine,
    assets: A,
    clock: Arc<dyn Clock>,
    events: Vec<EventRecord>,
    next_event_seq: u64,
}

impl<A: AssetRegistry> Marketplace<A> {
    /// Build a marketplace from a validated config.
    ///
    /// # Errors
    /// Returns `Configuration` if the config is invalid.
    pub fn new(
        config: MarketConfig,
        assets: A,
        compliance: Box<dyn ComplianceGate>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            deposit_bps = config.deposit_bps,
            fee_bps = config.fee_bps,
            release_delay_secs = config.release_delay_secs,
            "Marketplace initialized"
        );
        Ok(Self {
            ledger: DepositLedger::new(),
            listings: ListingRegistry::new(&config),
            bids: BidStore::new(),
            filter: PreferenceFilter::new(compliance),
            escrows: EscrowEngine::new(&config),
            assets,
            clock,
            events: Vec::new(),
            next_event_seq: 0,
            config,
        })
    }

    // ---------------------------------------------------------------
    // Accounts
    // ---------------------------------------------------------------

    /// External inflow into an account.
    ///
    /// # Errors
    /// Returns `InvalidAmount` for non-positive amounts.
    pub fn credit(&mut self, account: AccountId, amount: Decimal) -> Result<()> {
        self.ledger.credit(account, amount)?;
        tracing::debug!(account = %account, %amount, "Account credited");
        Ok(())
    }

    /// External outflow from an account's available balance.
    ///
    /// # Errors
    /// Returns `InvalidAmount` or `InsufficientBalance`.
    pub fn withdraw(&mut self, account: AccountId, amount: Decimal) -> Result<()> {
        self.ledger.withdraw(account, amount)?;
        tracing::debug!(account = %account, %amount, "Account withdrawn");
        Ok(())
    }

    /// Replace a buyer's standing filters.
    pub fn set_preferences(&mut self, buyer: AccountId, preferences: BuyerPreferences) {
        self.filter.set_preferences(buyer, preferences);
    }

    // ---------------------------------------------------------------
    // Listings and bids
    // ---------------------------------------------------------------

    /// Create a listing; the asset moves into custody.
    ///
    /// # Errors
    /// `NotOwner`, `InvalidWindow`, `InvalidPrice`.
    pub fn create_listing(&mut self, seller: AccountId, params: ListingParams) -> Result<ListingId> {
        let now = self.clock.now();
        let id = self
            .listings
            .create_listing(&mut self.assets, seller, params, now)?;
        let listing = self.listings.get(id)?;
        let event = MarketEvent::ListingCreated {
            listing_id: id,
            seller,
            reserve_price: listing.reserve_price,
            bidding_end: listing.bidding_end,
            reveal_end: listing.reveal_end,
        };
        self.emit(now, event);
        Ok(id)
    }

    /// Submit a sealed bid. Returns the deposit locked.
    ///
    /// # Errors
    /// `ListingNotFound`, `WindowClosed`, `DuplicateCommit`, `NotEligible`,
    /// `PreferenceRejected`, `InsufficientBalance`.
    pub fn commit_bid(
        &mut self,
        listing_id: ListingId,
        bidder: AccountId,
        commitment: Commitment,
        origin: BidOrigin,
    ) -> Result<Decimal> {
        let now = self.clock.now();
        let listing = self.listings.refresh(listing_id, now)?;
        let deposit = self.bids.commit_bid(
            &mut self.ledger,
            &self.filter,
            listing,
            bidder,
            commitment,
            origin,
            self.config.deposit_bps,
            now,
        )?;
        self.emit(
            now,
            MarketEvent::BidCommitted {
                listing_id,
                bidder,
                commitment,
            },
        );
        Ok(deposit)
    }

    /// Open a sealed bid. Returns the bid's status afterwards (`Rejected`
    /// if it revealed below the reserve).
    ///
    /// # Errors
    /// `ListingNotFound`, `WindowClosed`, `BidNotFound`, `AlreadyRevealed`,
    /// `InvalidReveal`, `InvalidBidAmount`.
    pub fn reveal_bid(
        &mut self,
        listing_id: ListingId,
        bidder: AccountId,
        amount: Decimal,
        salt: &Salt,
    ) -> Result<BidStatus> {
        let now = self.clock.now();
        let listing = self.listings.refresh(listing_id, now)?;
        let status = self
            .bids
            .reveal_bid(listing, bidder, amount, salt, now)?
            .status;
        self.emit(
            now,
            MarketEvent::BidRevealed {
                listing_id,
                bidder,
                amount,
            },
        );
        Ok(status)
    }

    /// Withdraw a losing bid's deposit after the listing ended.
    ///
    /// # Errors
    /// `ListingNotFound`, `BidNotFound`, `NotEligible`.
    pub fn withdraw_bid(&mut self, listing_id: ListingId, bidder: AccountId) -> Result<Decimal> {
        let now = self.clock.now();
        let listing = self.listings.get(listing_id)?;
        let amount = self.bids.withdraw_bid(&mut self.ledger, listing, bidder)?;
        self.emit(
            now,
            MarketEvent::DepositWithdrawn {
                listing_id,
                bidder,
                amount,
            },
        );
        Ok(amount)
    }

    /// Resolve a listing whose reveal window has closed. Anyone may call.
    ///
    /// # Errors
    /// - `AlreadyResolved` on every call after the first success
    /// - `RevealWindowOpen` before `reveal_end`
    /// - asset registry errors if custody was lost (nothing changes)
    pub fn resolve_auction(&mut self, listing_id: ListingId) -> Result<Resolution> {
        let now = self.clock.now();
        let listing = self.listings.refresh(listing_id, now)?;
        if listing.state.is_terminal() {
            return Err(LeadbidError::AlreadyResolved(listing_id));
        }
        if !listing.is_resolvable_at(now) {
            return Err(LeadbidError::RevealWindowOpen(listing_id));
        }
        let (seller, reserve) = (listing.seller, listing.reserve_price);

        let selection = select_winner(listing_id, reserve, &self.bids.bids_for(listing_id));
        let bid_root = selection.bid_root_hex();

        match selection.outcome {
            Outcome::Winner {
                bidder: winner,
                amount,
                ..
            } => {
                self.listings
                    .release_asset(&mut self.assets, listing_id, winner)?;
                let escrow_id = self.escrows.create(listing_id, winner, seller, amount, now)?;
                self.escrows.contribute_deposit(&mut self.ledger, escrow_id)?;
                self.bids.mark_deposit_applied(listing_id, winner)?;
                self.bids.settle(listing_id, Some(winner))?;
                let resolution = Resolution::Auction {
                    winner,
                    amount,
                    escrow_id,
                };
                self.listings
                    .finish(listing_id, ListingState::Resolved, resolution.clone(), now)?;

                tracing::info!(
                    listing = %listing_id,
                    winner = %winner,
                    %amount,
                    bid_root = %bid_root,
                    "Auction resolved"
                );
                self.emit(
                    now,
                    MarketEvent::AuctionResolved {
                        listing_id,
                        winner,
                        amount,
                        bid_root,
                    },
                );
                self.emit(
                    now,
                    MarketEvent::EscrowCreated {
                        escrow_id,
                        listing_id,
                        payer: winner,
                        payee: seller,
                        amount,
                    },
                );
                if self.escrows.try_fund(&mut self.ledger, escrow_id, now)? {
                    self.emit(now, MarketEvent::EscrowFunded { escrow_id, amount });
                }
                self.ledger.verify_supply()?;
                Ok(resolution)
            }
            Outcome::NoValidBids => {
                self.listings
                    .release_asset(&mut self.assets, listing_id, seller)?;
                self.bids.settle(listing_id, None)?;
                self.listings
                    .finish(listing_id, ListingState::Expired, Resolution::NoSale, now)?;
                tracing::info!(listing = %listing_id, bid_root = %bid_root, "Listing expired without a valid bid");
                self.emit(
                    now,
                    MarketEvent::ListingExpired {
                        listing_id,
                        bid_root,
                    },
                );
                Ok(Resolution::NoSale)
            }
        }
    }

    /// Buy a listing outright at its buy-now price. The payment is fully
    /// funded into escrow and every open bid is rejected.
    ///
    /// # Errors
    /// `AlreadyResolved`, `WindowClosed`, `BuyNowUnavailable`,
    /// `NotEligible`, `InsufficientBalance`.
    pub fn buy_now(&mut self, listing_id: ListingId, buyer: AccountId) -> Result<EscrowId> {
        let now = self.clock.now();
        let price = self.listings.buy_now_quote(listing_id, buyer, now)?;
        self.ledger.balance(buyer).ensure_covers(price)?;
        let seller = self.listings.get(listing_id)?.seller;

        self.listings
            .release_asset(&mut self.assets, listing_id, buyer)?;
        let escrow_id = self.escrows.create(listing_id, buyer, seller, price, now)?;
        self.escrows
            .fund(&mut self.ledger, escrow_id, buyer, price, now)?;
        let rejected = self.bids.settle(listing_id, None)?;
        self.listings.finish(
            listing_id,
            ListingState::Resolved,
            Resolution::BuyNow {
                buyer,
                price,
                escrow_id,
            },
            now,
        )?;

        tracing::info!(
            listing = %listing_id,
            buyer = %buyer,
            %price,
            rejected_bids = rejected.len(),
            "Buy-now executed"
        );
        self.emit(
            now,
            MarketEvent::BuyNowExecuted {
                listing_id,
                buyer,
                price,
            },
        );
        self.emit(
            now,
            MarketEvent::EscrowCreated {
                escrow_id,
                listing_id,
                payer: buyer,
                payee: seller,
                amount: price,
            },
        );
        self.emit(
            now,
            MarketEvent::EscrowFunded {
                escrow_id,
                amount: price,
            },
        );
        self.ledger.verify_supply()?;
        Ok(escrow_id)
    }

    // ---------------------------------------------------------------
    // Escrow
    // ---------------------------------------------------------------

    /// Payer covers the escrow's outstanding balance.
    ///
    /// # Errors
    /// `EscrowNotFound`, `Unauthorized`, `AlreadyFunded`, `FundingMismatch`,
    /// `InsufficientBalance`.
    pub fn fund_escrow(&mut self, escrow_id: EscrowId, caller: AccountId, amount: Decimal) -> Result<()> {
        let now = self.clock.now();
        self.escrows
            .fund(&mut self.ledger, escrow_id, caller, amount, now)?;
        let total = self.escrows.get(escrow_id)?.amount;
        self.emit(
            now,
            MarketEvent::EscrowFunded {
                escrow_id,
                amount: total,
            },
        );
        Ok(())
    }

    /// Pay out a funded escrow after the release delay. Anyone may call.
    ///
    /// # Errors
    /// `EscrowNotFound`, `NotFunded`, `ReleaseNotDue`.
    pub fn release_escrow(&mut self, escrow_id: EscrowId) -> Result<ReleaseReceipt> {
        let now = self.clock.now();
        let receipt = self.escrows.release(&mut self.ledger, escrow_id, now)?;
        self.emit(
            now,
            MarketEvent::EscrowReleased {
                escrow_id,
                payee: receipt.payee,
                payout: receipt.payout,
                fee: receipt.fee,
            },
        );
        self.ledger.verify_supply()?;
        Ok(receipt)
    }

    /// Payer or payee disputes a funded escrow before release.
    ///
    /// # Errors
    /// `EscrowNotFound`, `NotFunded`, `Unauthorized`, `DisputeWindowClosed`.
    pub fn dispute_escrow(&mut self, escrow_id: EscrowId, caller: AccountId) -> Result<()> {
        let now = self.clock.now();
        self.escrows.dispute(escrow_id, caller, now)?;
        self.emit(now, MarketEvent::EscrowDisputed { escrow_id, by: caller });
        Ok(())
    }

    /// Adjudicator refunds a disputed escrow to the payer.
    ///
    /// # Errors
    /// `EscrowNotFound`, `Unauthorized`, `NotDisputed`.
    pub fn refund_escrow(&mut self, escrow_id: EscrowId, caller: AccountId) -> Result<Decimal> {
        let now = self.clock.now();
        let amount = self.escrows.refund(&mut self.ledger, escrow_id, caller)?;
        let payer = self.escrows.get(escrow_id)?.payer;
        self.emit(
            now,
            MarketEvent::EscrowRefunded {
                escrow_id,
                payer,
                amount,
            },
        );
        self.ledger.verify_supply()?;
        Ok(amount)
    }

    // ---------------------------------------------------------------
    // Audit
    // ---------------------------------------------------------------

    /// Check that every deposit locked on a finished listing is accounted
    /// for: returned to a loser, applied to the sale escrow, or still
    /// locked awaiting withdrawal, with the ledger agreeing on each.
    ///
    /// # Errors
    /// - `NotEligible` if the listing has not finished
    /// - `DepositAccountingViolation` if anything does not add up
    pub fn audit_listing(&self, listing_id: ListingId) -> Result<ListingAudit> {
        let listing = self.listings.get(listing_id)?;
        if !listing.state.is_terminal() {
            return Err(LeadbidError::NotEligible {
                reason: format!("listing {listing_id} has not finished"),
            });
        }
        let violation = |reason: String| LeadbidError::DepositAccountingViolation { listing_id, reason };

        let (buyer, escrow_id) = match &listing.resolution {
            Some(Resolution::Auction {
                winner, escrow_id, ..
            }) => (Some(*winner), Some(*escrow_id)),
            Some(Resolution::BuyNow { buyer, escrow_id, .. }) => (Some(*buyer), Some(*escrow_id)),
            Some(Resolution::NoSale) => (None, None),
            None => return Err(violation("terminal listing has no resolution".into())),
        };

        let mut audit = ListingAudit {
            listing_id,
            deposits_locked: Decimal::ZERO,
            deposits_returned: Decimal::ZERO,
            deposits_applied: Decimal::ZERO,
            deposits_awaiting_withdrawal: Decimal::ZERO,
            escrow: escrow_id,
        };

        for bid in self.bids.bids_for(listing_id) {
            audit.deposits_locked += bid.deposit;
            let held = self.ledger.locked_deposit(listing_id, bid.bidder);
            match bid.deposit_state {
                DepositState::Locked => {
                    if held != Some(bid.deposit) {
                        return Err(violation(format!(
                            "bid by {} records {} locked, ledger holds {held:?}",
                            bid.bidder, bid.deposit
                        )));
                    }
                    audit.deposits_awaiting_withdrawal += bid.deposit;
                }
                DepositState::Returned => {
                    if held.is_some() {
                        return Err(violation(format!("returned deposit of {} still locked", bid.bidder)));
                    }
                    audit.deposits_returned += bid.deposit;
                }
                DepositState::Applied => {
                    if held.is_some() || Some(bid.bidder) != buyer || bid.status != BidStatus::Accepted {
                        return Err(violation(format!(
                            "deposit of {} applied but bid is not the accepted winner",
                            bid.bidder
                        )));
                    }
                    audit.deposits_applied += bid.deposit;
                }
            }
        }

        let accounted =
            audit.deposits_returned + audit.deposits_applied + audit.deposits_awaiting_withdrawal;
        if accounted != audit.deposits_locked {
            return Err(violation(format!(
                "locked {} but accounted {accounted}",
                audit.deposits_locked
            )));
        }

        if let Some(escrow_id) = escrow_id {
            let escrow = self.escrows.get(escrow_id)?;
            let custody = self.ledger.escrow_custody(escrow_id);
            let expected = match escrow.state {
                EscrowState::Created => escrow.funded,
                EscrowState::Funded | EscrowState::Disputed => escrow.amount,
                EscrowState::Released | EscrowState::Refunded => Decimal::ZERO,
            };
            if custody != expected {
                return Err(violation(format!(
                    "escrow {escrow_id} in {} holds {custody}, expected {expected}",
                    escrow.state
                )));
            }
            if escrow.state == EscrowState::Created && escrow.funded != audit.deposits_applied {
                return Err(violation(format!(
                    "escrow {escrow_id} credited {} but {} deposit applied",
                    escrow.funded, audit.deposits_applied
                )));
            }
        }

        tracing::debug!(listing = %listing_id, ?audit, "Listing audit passed");
        Ok(audit)
    }

    /// Check global supply conservation.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` on drift.
    pub fn verify_supply(&self) -> Result<()> {
        self.ledger.verify_supply()
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// A listing with its phase evaluated at the current time.
    ///
    /// # Errors
    /// Returns `ListingNotFound`.
    pub fn listing(&self, id: ListingId) -> Result<Listing> {
        let mut listing = self.listings.get(id)?.clone();
        listing.advance(self.clock.now());
        Ok(listing)
    }

    #[must_use]
    pub fn bid(&self, listing_id: ListingId, bidder: AccountId) -> Option<Bid> {
        self.bids.get(listing_id, bidder).cloned()
    }

    /// All bids on a listing, in commit order.
    #[must_use]
    pub fn bids(&self, listing_id: ListingId) -> Vec<Bid> {
        self.bids
            .bids_for(listing_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// # Errors
    /// Returns `EscrowNotFound`.
    pub fn escrow(&self, id: EscrowId) -> Result<Escrow> {
        self.escrows.get(id).cloned()
    }

    #[must_use]
    pub fn balance(&self, account: AccountId) -> BalanceEntry {
        self.ledger.balance(account)
    }

    #[must_use]
    pub fn total_supply(&self) -> Decimal {
        self.ledger.total_supply()
    }

    #[must_use]
    pub fn asset_owner(&self, asset: &leadbid_types::AssetRef) -> Option<AccountId> {
        self.assets.owner_of(asset)
    }

    #[must_use]
    pub fn assets(&self) -> &A {
        &self.assets
    }

    /// Direct access to the asset registry, e.g. to register new leads.
    pub fn assets_mut(&mut self) -> &mut A {
        &mut self.assets
    }

    #[must_use]
    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Events recorded since the last drain.
    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Take all recorded events. Sequence numbers keep counting.
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, at: DateTime<Utc>, event: MarketEvent) {
        let seq = self.next_event_seq;
        self.next_event_seq += 1;
        tracing::debug!(seq, event = %event, "Event recorded");
        self.events.push(EventRecord { seq, at, event });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;
    use leadbid_bidding::AllowAll;
    use leadbid_types::*;

    use super::*;
    use crate::clock::ManualClock;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    struct Fixture {
        market: Marketplace,
        clock: ManualClock,
        seller: AccountId,
        listing: ListingId,
        asset: AssetRef,
    }

    fn fixture(buy_now: Option<i64>) -> Fixture {
        let clock = ManualClock::new(t0());
        let config = MarketConfig::new(AccountId::new(), AccountId::new(), AccountId::new());
        let mut market = Marketplace::new(
            config,
            InMemoryAssetRegistry::new(),
            Box::new(AllowAll),
            Arc::new(clock.clone()),
        )
        .unwrap();
        let seller = AccountId::new();
        let asset = AssetRef::new("lead-7");
        market.assets_mut().register(asset.clone(), seller);
        let listing = market
            .create_listing(
                seller,
                ListingParams {
                    asset_ref: asset.clone(),
                    reserve_price: Decimal::new(50, 0),
                    buy_now_price: buy_now.map(|p| Decimal::new(p, 0)),
                    bidding_duration: Duration::from_secs(3600),
                    reveal_duration: Duration::from_secs(3600),
                    accepts_external_origin: true,
                    lead: LeadAttributes::new("US-NY", "web_form"),
                },
            )
            .unwrap();
        Fixture {
            market,
            clock,
            seller,
            listing,
            asset,
        }
    }

    fn bidder(market: &mut Marketplace, funds: i64) -> AccountId {
        let account = AccountId::new();
        market.credit(account, Decimal::new(funds, 0)).unwrap();
        account
    }

    fn place(f: &mut Fixture, who: AccountId, amount: i64) -> Salt {
        let salt = Salt::random();
        let commitment = Commitment::compute(f.listing, who, Decimal::new(amount, 0), &salt);
        f.market
            .commit_bid(f.listing, who, commitment, BidOrigin::OnPlatform)
            .unwrap();
        salt
    }

    #[test]
    fn resolve_before_reveal_end_is_refused() {
        let mut f = fixture(None);
        f.clock.advance(chrono::Duration::minutes(90));
        assert!(matches!(
            f.market.resolve_auction(f.listing),
            Err(LeadbidError::RevealWindowOpen(_))
        ));
    }

    #[test]
    fn winner_escrow_absorbs_deposit() {
        let mut f = fixture(None);
        let alice = bidder(&mut f.market, 500);
        let salt = place(&mut f, alice, 150);
        f.clock.advance(chrono::Duration::hours(1));
        f.market
            .reveal_bid(f.listing, alice, Decimal::new(150, 0), &salt)
            .unwrap();
        f.clock.advance(chrono::Duration::hours(1));

        let resolution = f.market.resolve_auction(f.listing).unwrap();
        let Resolution::Auction { escrow_id, .. } = resolution else {
            panic!("expected auction resolution");
        };
        let escrow = f.market.escrow(escrow_id).unwrap();
        assert_eq!(escrow.state, EscrowState::Funded);
        assert_eq!(escrow.amount, Decimal::new(150, 0));
        assert_eq!(f.market.balance(alice).available, Decimal::new(350, 0));
        assert_eq!(f.market.balance(alice).locked, Decimal::ZERO);
        assert_eq!(f.market.asset_owner(&f.asset), Some(alice));

        let audit = f.market.audit_listing(f.listing).unwrap();
        assert_eq!(audit.deposits_applied, Decimal::new(5, 0));
        f.market.verify_supply().unwrap();
    }

    #[test]
    fn short_winner_leaves_escrow_created_until_funded() {
        let mut f = fixture(None);
        let alice = bidder(&mut f.market, 20);
        let salt = place(&mut f, alice, 150);
        f.clock.advance(chrono::Duration::hours(1));
        f.market
            .reveal_bid(f.listing, alice, Decimal::new(150, 0), &salt)
            .unwrap();
        f.clock.advance(chrono::Duration::hours(1));
        f.market.resolve_auction(f.listing).unwrap();

        let escrow_id = EscrowId::for_listing(f.listing);
        let escrow = f.market.escrow(escrow_id).unwrap();
        assert_eq!(escrow.state, EscrowState::Created);
        assert_eq!(escrow.funded, Decimal::new(5, 0));
        f.market.audit_listing(f.listing).unwrap();

        f.market.credit(alice, Decimal::new(200, 0)).unwrap();
        f.market
            .fund_escrow(escrow_id, alice, Decimal::new(145, 0))
            .unwrap();
        assert_eq!(
            f.market.escrow(escrow_id).unwrap().state,
            EscrowState::Funded
        );
        f.market.audit_listing(f.listing).unwrap();
    }

    #[test]
    fn buy_now_rejects_open_bids() {
        let mut f = fixture(Some(300));
        let alice = bidder(&mut f.market, 500);
        let bob = bidder(&mut f.market, 500);
        place(&mut f, alice, 120);

        let escrow_id = f.market.buy_now(f.listing, bob).unwrap();
        assert_eq!(
            f.market.escrow(escrow_id).unwrap().state,
            EscrowState::Funded
        );
        assert_eq!(f.market.asset_owner(&f.asset), Some(bob));
        assert_eq!(
            f.market.bid(f.listing, alice).unwrap().status,
            BidStatus::Rejected
        );
        assert_eq!(
            f.market.withdraw_bid(f.listing, alice).unwrap(),
            Decimal::new(5, 0)
        );
        assert!(matches!(
            f.market.buy_now(f.listing, alice),
            Err(LeadbidError::AlreadyResolved(_))
        ));
        assert!(matches!(
            f.market.resolve_auction(f.listing),
            Err(LeadbidError::AlreadyResolved(_))
        ));
        f.market.audit_listing(f.listing).unwrap();
    }

    #[test]
    fn buy_now_needs_funds() {
        let mut f = fixture(Some(300));
        let poor = bidder(&mut f.market, 10);
        assert!(matches!(
            f.market.buy_now(f.listing, poor),
            Err(LeadbidError::InsufficientBalance { .. })
        ));
        assert_eq!(f.market.listing(f.listing).unwrap().state, ListingState::Active);
        assert_ne!(f.market.asset_owner(&f.asset), Some(poor));
    }

    #[test]
    fn events_are_sequenced() {
        let mut f = fixture(None);
        let alice = bidder(&mut f.market, 500);
        place(&mut f, alice, 80);
        let events = f.market.drain_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event.name(), "LISTING_CREATED");
        assert_eq!(events[1].event.name(), "BID_COMMITTED");
        assert_eq!(events[1].seq, 1);
        assert!(f.market.events().is_empty());
    }

    #[test]
    fn expired_listing_returns_asset() {
        let mut f = fixture(None);
        f.clock.advance(chrono::Duration::hours(2));
        assert_eq!(f.market.resolve_auction(f.listing).unwrap(), Resolution::NoSale);
        assert_eq!(f.market.asset_owner(&f.asset), Some(f.seller));
        assert_eq!(
            f.market.listing(f.listing).unwrap().state,
            ListingState::Expired
        );
    }

    #[test]
    fn audit_requires_finished_listing() {
        let f = fixture(None);
        assert!(matches!(
            f.market.audit_listing(f.listing),
            Err(LeadbidError::NotEligible { .. })
        ));
    }
}
