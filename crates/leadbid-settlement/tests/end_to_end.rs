//! End-to-end tests across the bidding, resolver and settlement crates.
//!
//! The pipeline below wires the components by hand, without the engine
//! crate, to check that deposits flow from bid locks into escrow custody
//! and out to the payee or back to the payer while supply is conserved.

use chrono::{DateTime, Duration, TimeZone, Utc};
use leadbid_bidding::{AssetRegistry, BidStore, InMemoryAssetRegistry, ListingRegistry, PreferenceFilter};
use leadbid_ledger::DepositLedger;
use leadbid_resolver::{Outcome, select_winner, verify_bid_root};
use leadbid_settlement::EscrowEngine;
use leadbid_types::*;
use rust_decimal::Decimal;

/// Helper: one listing's full lifecycle, driven step by step.
struct Pipeline {
    config: MarketConfig,
    ledger: DepositLedger,
    assets: InMemoryAssetRegistry,
    listings: ListingRegistry,
    bids: BidStore,
    filter: PreferenceFilter,
    escrows: EscrowEngine,
    start: DateTime<Utc>,
}

impl Pipeline {
    fn new() -> Self {
        let config = MarketConfig::new(AccountId::new(), AccountId::new(), AccountId::new());
        Self {
            ledger: DepositLedger::new(),
            assets: InMemoryAssetRegistry::new(),
            listings: ListingRegistry::new(&config),
            bids: BidStore::new(),
            filter: PreferenceFilter::default(),
            escrows: EscrowEngine::new(&config),
            start: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
            config,
        }
    }

    fn at(&self, minutes: i64) -> DateTime<Utc> {
        self.start + Duration::minutes(minutes)
    }

    /// List an asset with a 60 minute bidding window and 60 minute reveal
    /// window.
    fn list(&mut self, seller: AccountId, reserve: i64) -> ListingId {
        let asset = AssetRef::new(format!("lead-{}", self.listings.len()));
        self.assets.register(asset.clone(), seller);
        self.listings
            .create_listing(
                &mut self.assets,
                seller,
                ListingParams {
                    asset_ref: asset,
                    reserve_price: Decimal::new(reserve, 0),
                    buy_now_price: None,
                    bidding_duration: std::time::Duration::from_secs(3600),
                    reveal_duration: std::time::Duration::from_secs(3600),
                    accepts_external_origin: false,
                    lead: LeadAttributes::new("US-WA", "web_form"),
                },
                self.start,
            )
            .unwrap()
    }

    fn commit(&mut self, listing_id: ListingId, bidder: AccountId, amount: Decimal) -> Salt {
        let now = self.at(10);
        let salt = Salt::random();
        let listing = self.listings.refresh(listing_id, now).unwrap();
        self.bids
            .commit_bid(
                &mut self.ledger,
                &self.filter,
                listing,
                bidder,
                Commitment::compute(listing_id, bidder, amount, &salt),
                BidOrigin::OnPlatform,
                self.config.deposit_bps,
                now,
            )
            .unwrap();
        salt
    }

    fn reveal(&mut self, listing_id: ListingId, bidder: AccountId, amount: Decimal, salt: &Salt) {
        let now = self.at(70);
        let listing = self.listings.refresh(listing_id, now).unwrap();
        self.bids
            .reveal_bid(listing, bidder, amount, salt, now)
            .unwrap();
    }

    /// Resolve the listing and, if there is a winner, open and fund the
    /// escrow. Returns the escrow id when one was created.
    fn resolve(&mut self, listing_id: ListingId) -> Option<EscrowId> {
        let now = self.at(130);
        let listing = self.listings.refresh(listing_id, now).unwrap();
        let (seller, reserve) = (listing.seller, listing.reserve_price);
        let selection = select_winner(listing_id, reserve, &self.bids.bids_for(listing_id));
        assert!(verify_bid_root(
            listing_id,
            &selection.verdicts,
            &selection.bid_root
        ));

        match selection.outcome {
            Outcome::Winner { bidder, amount, .. } => {
                self.listings
                    .release_asset(&mut self.assets, listing_id, bidder)
                    .unwrap();
                let id = self
                    .escrows
                    .create(listing_id, bidder, seller, amount, now)
                    .unwrap();
                self.escrows
                    .contribute_deposit(&mut self.ledger, id)
                    .unwrap();
                self.bids.mark_deposit_applied(listing_id, bidder).unwrap();
                self.bids.settle(listing_id, Some(bidder)).unwrap();
                self.listings
                    .finish(
                        listing_id,
                        ListingState::Resolved,
                        Resolution::Auction {
                            winner: bidder,
                            amount,
                            escrow_id: id,
                        },
                        now,
                    )
                    .unwrap();
                self.escrows.try_fund(&mut self.ledger, id, now).unwrap();
                Some(id)
            }
            Outcome::NoValidBids => {
                self.listings
                    .release_asset(&mut self.assets, listing_id, seller)
                    .unwrap();
                self.bids.settle(listing_id, None).unwrap();
                self.listings
                    .finish(listing_id, ListingState::Expired, Resolution::NoSale, now)
                    .unwrap();
                None
            }
        }
    }
}

#[test]
fn winner_pays_seller_through_escrow() {
    let mut p = Pipeline::new();
    let seller = AccountId::new();
    let winner = AccountId::new();
    let loser = AccountId::new();
    p.ledger.credit(winner, Decimal::new(1000, 0)).unwrap();
    p.ledger.credit(loser, Decimal::new(1000, 0)).unwrap();

    let listing = p.list(seller, 100);
    let s_win = p.commit(listing, winner, Decimal::new(400, 0));
    let s_lose = p.commit(listing, loser, Decimal::new(300, 0));
    p.reveal(listing, loser, Decimal::new(300, 0), &s_lose);
    p.reveal(listing, winner, Decimal::new(400, 0), &s_win);

    let escrow_id = p.resolve(listing).unwrap();
    assert_eq!(p.escrows.get(escrow_id).unwrap().state, EscrowState::Funded);
    assert_eq!(p.ledger.escrow_custody(escrow_id), Decimal::new(400, 0));
    assert_eq!(p.assets.owner_of(&p.listings.get(listing).unwrap().asset_ref), Some(winner));

    let listing_ref = p.listings.get(listing).unwrap();
    p.bids
        .withdraw_bid(&mut p.ledger, listing_ref, loser)
        .unwrap();
    assert_eq!(p.ledger.balance(loser).available, Decimal::new(1000, 0));

    let due = p.at(130) + Duration::seconds(i64::try_from(p.config.release_delay_secs).unwrap());
    let receipt = p.escrows.release(&mut p.ledger, escrow_id, due).unwrap();
    assert_eq!(receipt.fee, Decimal::new(10, 0));
    assert_eq!(p.ledger.balance(seller).available, Decimal::new(390, 0));
    assert_eq!(
        p.ledger.balance(p.config.fee_recipient).available,
        Decimal::new(10, 0)
    );
    assert_eq!(p.ledger.escrow_custody(escrow_id), Decimal::ZERO);
    p.ledger.verify_supply().unwrap();
}

#[test]
fn short_winner_funds_later() {
    let mut p = Pipeline::new();
    let seller = AccountId::new();
    let winner = AccountId::new();
    p.ledger.credit(winner, Decimal::new(50, 0)).unwrap();

    let listing = p.list(seller, 100);
    let salt = p.commit(listing, winner, Decimal::new(250, 0));
    p.reveal(listing, winner, Decimal::new(250, 0), &salt);

    let escrow_id = p.resolve(listing).unwrap();
    let escrow = p.escrows.get(escrow_id).unwrap();
    assert_eq!(escrow.state, EscrowState::Created);
    assert_eq!(escrow.funded, Decimal::new(10, 0));
    assert_eq!(escrow.outstanding(), Decimal::new(240, 0));

    p.ledger.credit(winner, Decimal::new(200, 0)).unwrap();
    let now = p.at(200);
    assert!(matches!(
        p.escrows
            .fund(&mut p.ledger, escrow_id, winner, Decimal::new(250, 0), now),
        Err(LeadbidError::FundingMismatch { .. })
    ));
    assert!(matches!(
        p.escrows
            .fund(&mut p.ledger, escrow_id, seller, Decimal::new(240, 0), now),
        Err(LeadbidError::Unauthorized { .. })
    ));
    p.escrows
        .fund(&mut p.ledger, escrow_id, winner, Decimal::new(240, 0), now)
        .unwrap();

    let escrow = p.escrows.get(escrow_id).unwrap();
    assert_eq!(escrow.state, EscrowState::Funded);
    assert_eq!(escrow.funded_at, Some(now));
    assert_eq!(p.ledger.escrow_custody(escrow_id), Decimal::new(250, 0));
    assert_eq!(p.ledger.balance(winner).total(), Decimal::ZERO);
    p.ledger.verify_supply().unwrap();
}

#[test]
fn disputed_sale_refunds_buyer() {
    let mut p = Pipeline::new();
    let seller = AccountId::new();
    let buyer = AccountId::new();
    p.ledger.credit(buyer, Decimal::new(500, 0)).unwrap();

    let listing = p.list(seller, 100);
    let salt = p.commit(listing, buyer, Decimal::new(120, 0));
    p.reveal(listing, buyer, Decimal::new(120, 0), &salt);
    let escrow_id = p.resolve(listing).unwrap();

    p.escrows.dispute(escrow_id, seller, p.at(140)).unwrap();
    assert!(matches!(
        p.escrows.refund(&mut p.ledger, escrow_id, buyer),
        Err(LeadbidError::Unauthorized { .. })
    ));
    let adjudicator = p.config.adjudicator;
    let refunded = p
        .escrows
        .refund(&mut p.ledger, escrow_id, adjudicator)
        .unwrap();
    assert_eq!(refunded, Decimal::new(120, 0));
    assert_eq!(p.ledger.balance(buyer).available, Decimal::new(500, 0));
    assert_eq!(p.ledger.balance(seller).total(), Decimal::ZERO);
    p.ledger.verify_supply().unwrap();
}

#[test]
fn no_valid_bids_returns_everything() {
    let mut p = Pipeline::new();
    let seller = AccountId::new();
    let shy = AccountId::new();
    let cheap = AccountId::new();
    p.ledger.credit(shy, Decimal::new(100, 0)).unwrap();
    p.ledger.credit(cheap, Decimal::new(100, 0)).unwrap();

    let listing = p.list(seller, 100);
    p.commit(listing, shy, Decimal::new(150, 0));
    let salt = p.commit(listing, cheap, Decimal::new(20, 0));
    p.reveal(listing, cheap, Decimal::new(20, 0), &salt);

    assert!(p.resolve(listing).is_none());
    assert_eq!(p.escrows.len(), 0);
    let asset = p.listings.get(listing).unwrap().asset_ref.clone();
    assert_eq!(p.assets.owner_of(&asset), Some(seller));

    for bidder in [shy, cheap] {
        let listing_ref = p.listings.get(listing).unwrap();
        assert_eq!(
            p.bids
                .withdraw_bid(&mut p.ledger, listing_ref, bidder)
                .unwrap(),
            Decimal::new(10, 0)
        );
        assert_eq!(p.ledger.balance(bidder).available, Decimal::new(100, 0));
    }
    assert!(p.bids.locked_deposits(listing).is_zero());
    p.ledger.verify_supply().unwrap();
}
