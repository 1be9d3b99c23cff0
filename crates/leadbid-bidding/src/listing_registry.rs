//! Listing registry. Owns the lifecycle of every sale offer.
//!
//! A listing is created `Active`, drifts into `RevealPhase` once its
//! bidding window closes (computed lazily from `now`), and ends in one of
//! the terminal states `Resolved` or `Expired`. While a listing is open
//! the asset sits with the registry's custodian account; it leaves
//! custody exactly once, to the winner, the buy-now buyer, or back to the
//! seller.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use leadbid_types::{
    AccountId, LeadbidError, Listing, ListingId, ListingParams, ListingState, MarketConfig,
    Resolution, Result, constants,
};
use rust_decimal::Decimal;

use crate::asset_registry::AssetRegistry;

/// In-memory store of listings plus the custody account that holds
/// listed assets.
pub struct ListingRegistry {
    listings: HashMap<ListingId, Listing>,
    custodian: AccountId,
    max_bidding: std::time::Duration,
    max_reveal: std::time::Duration,
}

impl ListingRegistry {
    #[must_use]
    pub fn new(config: &MarketConfig) -> Self {
        Self {
            listings: HashMap::new(),
            custodian: config.custodian,
            max_bidding: std::time::Duration::from_secs(config.max_bidding_secs),
            max_reveal: std::time::Duration::from_secs(config.max_reveal_secs),
        }
    }

    /// Account holding listed assets.
    #[must_use]
    pub fn custodian(&self) -> AccountId {
        self.custodian
    }

    /// Create a listing and take the asset into custody.
    ///
    /// All parameters are validated before the asset registry is touched.
    ///
    /// # Errors
    /// - `InvalidWindow` if a duration is zero or above the configured maximum
    /// - `InvalidPrice` if the reserve is not positive or buy-now < reserve
    /// - `NotOwner` if `seller` does not hold the asset
    pub fn create_listing(
        &mut self,
        assets: &mut dyn AssetRegistry,
        seller: AccountId,
        params: ListingParams,
        now: DateTime<Utc>,
    ) -> Result<ListingId> {
        let bidding = window("bidding", params.bidding_duration, self.max_bidding)?;
        let reveal = window("reveal", params.reveal_duration, self.max_reveal)?;
        validate_prices(params.reserve_price, params.buy_now_price)?;

        if assets.owner_of(&params.asset_ref) != Some(seller) {
            return Err(LeadbidError::NotOwner {
                caller: seller,
                asset: params.asset_ref,
            });
        }
        assets.reassign(&params.asset_ref, seller, self.custodian)?;

        let bidding_end = now + bidding;
        let listing = Listing {
            id: ListingId::new(),
            asset_ref: params.asset_ref,
            seller,
            reserve_price: params.reserve_price,
            buy_now_price: params.buy_now_price,
            bidding_end,
            reveal_end: bidding_end + reveal,
            accepts_external_origin: params.accepts_external_origin,
            lead: params.lead,
            state: ListingState::Active,
            resolution: None,
            created_at: now,
        };
        let id = listing.id;

        tracing::info!(
            listing = %id,
            seller = %seller,
            asset = %listing.asset_ref,
            reserve = %listing.reserve_price,
            bidding_end = %listing.bidding_end,
            reveal_end = %listing.reveal_end,
            "Listing created"
        );
        self.listings.insert(id, listing);
        Ok(id)
    }

    /// Look up a listing.
    ///
    /// # Errors
    /// Returns `ListingNotFound` if the id is unknown.
    pub fn get(&self, id: ListingId) -> Result<&Listing> {
        self.listings
            .get(&id)
            .ok_or(LeadbidError::ListingNotFound(id))
    }

    /// Persist the time-driven phase for `now` and return the listing.
    ///
    /// # Errors
    /// Returns `ListingNotFound` if the id is unknown.
    pub fn refresh(&mut self, id: ListingId, now: DateTime<Utc>) -> Result<&Listing> {
        let listing = self
            .listings
            .get_mut(&id)
            .ok_or(LeadbidError::ListingNotFound(id))?;
        let before = listing.state;
        let after = listing.advance(now);
        if before != after {
            tracing::info!(listing = %id, from = %before, to = %after, "Listing phase advanced");
        }
        Ok(listing)
    }

    /// Check that `buyer` may buy the listing outright at `now` and return
    /// the price. Changes nothing.
    ///
    /// # Errors
    /// - `AlreadyResolved` if the listing is terminal
    /// - `WindowClosed` once the bidding window has closed
    /// - `BuyNowUnavailable` if no buy-now price is set
    /// - `NotEligible` if the buyer is the seller
    pub fn buy_now_quote(&self, id: ListingId, buyer: AccountId, now: DateTime<Utc>) -> Result<Decimal> {
        let listing = self.get(id)?;
        if listing.state.is_terminal() {
            return Err(LeadbidError::AlreadyResolved(id));
        }
        if !listing.accepts_commits_at(now) {
            return Err(LeadbidError::WindowClosed {
                listing_id: id,
                operation: "buy_now",
                state: listing.phase_at(now),
            });
        }
        let price = listing
            .buy_now_price
            .ok_or_else(|| LeadbidError::BuyNowUnavailable {
                listing_id: id,
                reason: "listing has no buy-now price".into(),
            })?;
        if buyer == listing.seller {
            return Err(LeadbidError::NotEligible {
                reason: "seller cannot buy their own listing".into(),
            });
        }
        Ok(price)
    }

    /// Move a listing to a terminal state.
    ///
    /// # Errors
    /// Returns `ListingNotFound` or `AlreadyResolved`.
    pub fn finish(
        &mut self,
        id: ListingId,
        target: ListingState,
        resolution: Resolution,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let listing = self
            .listings
            .get_mut(&id)
            .ok_or(LeadbidError::ListingNotFound(id))?;
        listing.advance(now);
        listing.finish(target, resolution)?;
        tracing::info!(listing = %id, state = %target, "Listing finished");
        Ok(())
    }

    /// Hand a listed asset out of custody.
    ///
    /// # Errors
    /// Returns `ListingNotFound`, or the asset registry's error if custody
    /// was lost.
    pub fn release_asset(
        &self,
        assets: &mut dyn AssetRegistry,
        id: ListingId,
        to: AccountId,
    ) -> Result<()> {
        let listing = self.get(id)?;
        assets.reassign(&listing.asset_ref, self.custodian, to)?;
        tracing::debug!(listing = %id, asset = %listing.asset_ref, to = %to, "Asset released from custody");
        Ok(())
    }

    /// Iterate all listings (unordered).
    pub fn iter(&self) -> impl Iterator<Item = &Listing> {
        self.listings.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

fn window(
    name: &str,
    requested: std::time::Duration,
    max: std::time::Duration,
) -> Result<chrono::Duration> {
    if requested.is_zero() {
        return Err(LeadbidError::InvalidWindow {
            reason: format!("{name} duration must be positive"),
        });
    }
    if requested > max {
        return Err(LeadbidError::InvalidWindow {
            reason: format!(
                "{name} duration {}s exceeds maximum {}s",
                requested.as_secs(),
                max.as_secs()
            ),
        });
    }
    chrono::Duration::from_std(requested).map_err(|_| LeadbidError::InvalidWindow {
        reason: format!("{name} duration out of range"),
    })
}

fn validate_prices(reserve: Decimal, buy_now: Option<Decimal>) -> Result<()> {
    if reserve <= Decimal::ZERO {
        return Err(LeadbidError::InvalidPrice {
            reason: format!("reserve price {reserve} must be positive"),
        });
    }
    if let Some(price) = std::iter::once(reserve)
        .chain(buy_now)
        .find(|price| *price > constants::MAX_AMOUNT)
    {
        return Err(LeadbidError::InvalidPrice {
            reason: format!("price {price} exceeds maximum {}", constants::MAX_AMOUNT),
        });
    }
    if let Some(price) = buy_now.filter(|price| *price < reserve) {
        return Err(LeadbidError::InvalidPrice {
            reason: format!("buy-now price {price} is below reserve {reserve}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;
    use leadbid_types::*;

    use super::*;
    use crate::asset_registry::InMemoryAssetRegistry;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn setup() -> (ListingRegistry, InMemoryAssetRegistry, AccountId, AssetRef) {
        let config = MarketConfig::new(AccountId::new(), AccountId::new(), AccountId::new());
        let registry = ListingRegistry::new(&config);
        let mut assets = InMemoryAssetRegistry::new();
        let seller = AccountId::new();
        let asset = AssetRef::new("lead-42");
        assets.register(asset.clone(), seller);
        (registry, assets, seller, asset)
    }

    fn params(asset: AssetRef) -> ListingParams {
        ListingParams {
            asset_ref: asset,
            reserve_price: Decimal::new(50, 0),
            buy_now_price: Some(Decimal::new(200, 0)),
            bidding_duration: Duration::from_secs(3600),
            reveal_duration: Duration::from_secs(1800),
            accepts_external_origin: true,
            lead: LeadAttributes::new("US-TX", "web_form"),
        }
    }

    #[test]
    fn create_takes_custody() {
        let (mut registry, mut assets, seller, asset) = setup();
        let id = registry
            .create_listing(&mut assets, seller, params(asset.clone()), t0())
            .unwrap();
        let listing = registry.get(id).unwrap();
        assert_eq!(listing.state, ListingState::Active);
        assert_eq!(listing.bidding_end, t0() + chrono::Duration::hours(1));
        assert_eq!(listing.reveal_end, t0() + chrono::Duration::minutes(90));
        assert_eq!(assets.owner_of(&asset), Some(registry.custodian()));
    }

    #[test]
    fn non_owner_cannot_list() {
        let (mut registry, mut assets, _seller, asset) = setup();
        let err = registry
            .create_listing(&mut assets, AccountId::new(), params(asset), t0())
            .unwrap_err();
        assert!(matches!(err, LeadbidError::NotOwner { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn asset_cannot_be_listed_twice() {
        let (mut registry, mut assets, seller, asset) = setup();
        registry
            .create_listing(&mut assets, seller, params(asset.clone()), t0())
            .unwrap();
        let err = registry
            .create_listing(&mut assets, seller, params(asset), t0())
            .unwrap_err();
        assert!(matches!(err, LeadbidError::NotOwner { .. }));
    }

    #[test]
    fn zero_and_oversized_windows_rejected() {
        let (mut registry, mut assets, seller, asset) = setup();
        let mut p = params(asset.clone());
        p.bidding_duration = Duration::ZERO;
        let err = registry
            .create_listing(&mut assets, seller, p, t0())
            .unwrap_err();
        assert!(matches!(err, LeadbidError::InvalidWindow { .. }));

        let mut p = params(asset.clone());
        p.reveal_duration = Duration::from_secs(365 * 24 * 3600);
        let err = registry
            .create_listing(&mut assets, seller, p, t0())
            .unwrap_err();
        assert!(matches!(err, LeadbidError::InvalidWindow { .. }));

        // nothing moved
        assert_eq!(assets.owner_of(&asset), Some(seller));
    }

    #[test]
    fn invalid_prices_rejected() {
        let (mut registry, mut assets, seller, asset) = setup();
        let mut p = params(asset.clone());
        p.reserve_price = Decimal::ZERO;
        assert!(matches!(
            registry.create_listing(&mut assets, seller, p, t0()),
            Err(LeadbidError::InvalidPrice { .. })
        ));

        let mut p = params(asset);
        p.buy_now_price = Some(Decimal::new(10, 0));
        assert!(matches!(
            registry.create_listing(&mut assets, seller, p, t0()),
            Err(LeadbidError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn oversized_prices_rejected() {
        let (mut registry, mut assets, seller, asset) = setup();
        let mut p = params(asset.clone());
        p.reserve_price = Decimal::from_i128_with_scale(10_i128.pow(26), 0);
        assert!(matches!(
            registry.create_listing(&mut assets, seller, p, t0()),
            Err(LeadbidError::InvalidPrice { .. })
        ));

        let mut p = params(asset.clone());
        p.buy_now_price = Some(constants::MAX_AMOUNT + Decimal::ONE);
        assert!(matches!(
            registry.create_listing(&mut assets, seller, p, t0()),
            Err(LeadbidError::InvalidPrice { .. })
        ));
        assert!(registry.is_empty());
        assert_eq!(assets.owner_of(&asset), Some(seller));

        let mut p = params(asset);
        p.reserve_price = constants::MAX_AMOUNT;
        p.buy_now_price = Some(constants::MAX_AMOUNT);
        registry
            .create_listing(&mut assets, seller, p, t0())
            .unwrap();
    }

    #[test]
    fn refresh_advances_phase() {
        let (mut registry, mut assets, seller, asset) = setup();
        let id = registry
            .create_listing(&mut assets, seller, params(asset), t0())
            .unwrap();
        let at_end = t0() + chrono::Duration::hours(1);
        assert_eq!(
            registry.refresh(id, at_end).unwrap().state,
            ListingState::RevealPhase
        );
    }

    #[test]
    fn buy_now_quote_rules() {
        let (mut registry, mut assets, seller, asset) = setup();
        let id = registry
            .create_listing(&mut assets, seller, params(asset), t0())
            .unwrap();
        let buyer = AccountId::new();
        assert_eq!(
            registry.buy_now_quote(id, buyer, t0()).unwrap(),
            Decimal::new(200, 0)
        );
        assert!(matches!(
            registry.buy_now_quote(id, seller, t0()),
            Err(LeadbidError::NotEligible { .. })
        ));
        let late = t0() + chrono::Duration::hours(1);
        assert!(matches!(
            registry.buy_now_quote(id, buyer, late),
            Err(LeadbidError::WindowClosed { .. })
        ));

        registry
            .finish(
                id,
                ListingState::Resolved,
                Resolution::BuyNow {
                    buyer,
                    price: Decimal::new(200, 0),
                    escrow_id: EscrowId::for_listing(id),
                },
                t0(),
            )
            .unwrap();
        assert!(matches!(
            registry.buy_now_quote(id, buyer, t0()),
            Err(LeadbidError::AlreadyResolved(_))
        ));
    }

    #[test]
    fn buy_now_requires_price() {
        let (mut registry, mut assets, seller, asset) = setup();
        let mut p = params(asset);
        p.buy_now_price = None;
        let id = registry
            .create_listing(&mut assets, seller, p, t0())
            .unwrap();
        assert!(matches!(
            registry.buy_now_quote(id, AccountId::new(), t0()),
            Err(LeadbidError::BuyNowUnavailable { .. })
        ));
    }

    #[test]
    fn release_asset_returns_to_seller() {
        let (mut registry, mut assets, seller, asset) = setup();
        let id = registry
            .create_listing(&mut assets, seller, params(asset.clone()), t0())
            .unwrap();
        registry.release_asset(&mut assets, id, seller).unwrap();
        assert_eq!(assets.owner_of(&asset), Some(seller));
    }

    #[test]
    fn unknown_listing() {
        let (registry, ..) = setup();
        assert!(matches!(
            registry.get(ListingId::new()),
            Err(LeadbidError::ListingNotFound(_))
        ));
    }
}
