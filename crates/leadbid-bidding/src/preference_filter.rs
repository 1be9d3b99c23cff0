//! Preference filter: the gate applied to every commit.
//!
//! Evaluates a prospective bidder against a listing and either allows the
//! commit or names the first check that failed. The filter holds standing
//! buyer preferences but each evaluation is a pure lookup: it never
//! mutates anything.
//!
//! ## Check Order
//!
//! 1. Buyer geo exclusion list
//! 2. Buyer source-type exclusion list
//! 3. Listing's `accepts_external_origin` against the bid's declared origin
//! 4. External compliance gate (KYC / jurisdiction)
//!
//! The order is fixed so rejection reasons are deterministic.

use std::collections::{HashMap, HashSet};

use leadbid_types::{
    AccountId, BidOrigin, BuyerPreferences, FilterDecision, LeadbidError, Listing, RejectionReason,
    Result,
};

/// Black-box KYC / jurisdiction check.
pub trait ComplianceGate: Send {
    fn is_allowed(&self, actor: AccountId, listing: &Listing) -> bool;
}

/// Gate that admits everyone.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl ComplianceGate for AllowAll {
    fn is_allowed(&self, _actor: AccountId, _listing: &Listing) -> bool {
        true
    }
}

/// Gate that blocks a fixed set of accounts.
#[derive(Debug, Default, Clone)]
pub struct DenyList {
    denied: HashSet<AccountId>,
}

impl DenyList {
    #[must_use]
    pub fn new(denied: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            denied: denied.into_iter().collect(),
        }
    }
}

impl ComplianceGate for DenyList {
    fn is_allowed(&self, actor: AccountId, _listing: &Listing) -> bool {
        !self.denied.contains(&actor)
    }
}

/// Evaluates buyers' standing filters and the compliance gate.
pub struct PreferenceFilter {
    preferences: HashMap<AccountId, BuyerPreferences>,
    compliance: Box<dyn ComplianceGate>,
}

impl PreferenceFilter {
    /// Create a filter backed by the given compliance gate.
    #[must_use]
    pub fn new(compliance: Box<dyn ComplianceGate>) -> Self {
        Self {
            preferences: HashMap::new(),
            compliance,
        }
    }

    /// Replace a buyer's standing preferences.
    pub fn set_preferences(&mut self, buyer: AccountId, preferences: BuyerPreferences) {
        self.preferences.insert(buyer, preferences);
    }

    /// A buyer's standing preferences (empty if never set).
    #[must_use]
    pub fn preferences(&self, buyer: AccountId) -> BuyerPreferences {
        self.preferences.get(&buyer).cloned().unwrap_or_default()
    }

    /// Evaluate every check in order; the first failure short-circuits.
    #[must_use]
    pub fn evaluate(&self, listing: &Listing, bidder: AccountId, origin: BidOrigin) -> FilterDecision {
        if let Some(prefs) = self.preferences.get(&bidder) {
            // 1. Geo exclusion
            if prefs.excluded_geos.contains(&listing.lead.geo) {
                return FilterDecision::Deny(RejectionReason::GeoExcluded {
                    geo: listing.lead.geo.clone(),
                });
            }
            // 2. Source-type exclusion
            if prefs.excluded_source_types.contains(&listing.lead.source_type) {
                return FilterDecision::Deny(RejectionReason::SourceTypeExcluded {
                    source_type: listing.lead.source_type.clone(),
                });
            }
        }

        // 3. Off-site origin
        if origin == BidOrigin::External && !listing.accepts_external_origin {
            return FilterDecision::Deny(RejectionReason::ExternalOriginNotAccepted);
        }

        // 4. Compliance gate
        if !self.compliance.is_allowed(bidder, listing) {
            return FilterDecision::Deny(RejectionReason::ComplianceDenied);
        }

        FilterDecision::Allow
    }

    /// [`Self::evaluate`] as a `Result`.
    ///
    /// # Errors
    /// Returns `PreferenceRejected` carrying the first failing check.
    pub fn check(&self, listing: &Listing, bidder: AccountId, origin: BidOrigin) -> Result<()> {
        match self.evaluate(listing, bidder, origin) {
            FilterDecision::Allow => Ok(()),
            FilterDecision::Deny(reason) => {
                tracing::warn!(
                    listing = %listing.id,
                    bidder = %bidder,
                    %reason,
                    "Bidder rejected by preference filter"
                );
                Err(LeadbidError::PreferenceRejected(reason))
            }
        }
    }
}

impl Default for PreferenceFilter {
    fn default() -> Self {
        Self::new(Box::new(AllowAll))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use leadbid_types::*;
    use rust_decimal::Decimal;

    use super::*;

    fn make_listing() -> Listing {
        Listing::dummy(AccountId::new(), Decimal::new(50, 0), Utc::now())
    }

    #[test]
    fn no_preferences_allows() {
        let filter = PreferenceFilter::default();
        let listing = make_listing();
        assert!(
            filter
                .evaluate(&listing, AccountId::new(), BidOrigin::OnPlatform)
                .is_allowed()
        );
    }

    #[test]
    fn geo_exclusion_rejects() {
        let mut filter = PreferenceFilter::default();
        let buyer = AccountId::new();
        filter.set_preferences(buyer, BuyerPreferences::new().exclude_geo("US-CA"));
        let listing = make_listing();
        let err = filter
            .check(&listing, buyer, BidOrigin::OnPlatform)
            .unwrap_err();
        assert!(matches!(
            err,
            LeadbidError::PreferenceRejected(RejectionReason::GeoExcluded { ref geo }) if geo == "US-CA"
        ));
        assert_eq!(err.class(), ErrorClass::PolicyRejection);
    }

    #[test]
    fn source_type_exclusion_rejects() {
        let mut filter = PreferenceFilter::default();
        let buyer = AccountId::new();
        filter.set_preferences(
            buyer,
            BuyerPreferences::new().exclude_source_type("web_form"),
        );
        let listing = make_listing();
        assert_eq!(
            filter.evaluate(&listing, buyer, BidOrigin::OnPlatform),
            FilterDecision::Deny(RejectionReason::SourceTypeExcluded {
                source_type: "web_form".into()
            })
        );
    }

    #[test]
    fn external_origin_rejected_when_not_accepted() {
        let filter = PreferenceFilter::default();
        let mut listing = make_listing();
        listing.accepts_external_origin = false;
        let buyer = AccountId::new();
        assert_eq!(
            filter.evaluate(&listing, buyer, BidOrigin::External),
            FilterDecision::Deny(RejectionReason::ExternalOriginNotAccepted)
        );
        assert!(
            filter
                .evaluate(&listing, buyer, BidOrigin::OnPlatform)
                .is_allowed()
        );
    }

    #[test]
    fn compliance_gate_consulted() {
        let blocked = AccountId::new();
        let filter = PreferenceFilter::new(Box::new(DenyList::new([blocked])));
        let listing = make_listing();
        assert_eq!(
            filter.evaluate(&listing, blocked, BidOrigin::OnPlatform),
            FilterDecision::Deny(RejectionReason::ComplianceDenied)
        );
        assert!(
            filter
                .evaluate(&listing, AccountId::new(), BidOrigin::OnPlatform)
                .is_allowed()
        );
    }

    #[test]
    fn first_failing_check_wins() {
        let buyer = AccountId::new();
        let mut filter = PreferenceFilter::new(Box::new(DenyList::new([buyer])));
        filter.set_preferences(
            buyer,
            BuyerPreferences::new()
                .exclude_geo("US-CA")
                .exclude_source_type("web_form"),
        );
        let mut listing = make_listing();
        listing.accepts_external_origin = false;
        // every check would fail; geo is reported
        assert_eq!(
            filter.evaluate(&listing, buyer, BidOrigin::External),
            FilterDecision::Deny(RejectionReason::GeoExcluded {
                geo: "US-CA".into()
            })
        );
    }
}
