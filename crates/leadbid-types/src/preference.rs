//! Buyer standing filters and the reasons a bidder can be turned away.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

/// A buyer's standing filters, applied to every listing they bid on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerPreferences {
    /// Lead regions this buyer never buys.
    pub excluded_geos: BTreeSet<String>,
    /// Lead capture channels this buyer never buys.
    pub excluded_source_types: BTreeSet<String>,
}

impl BuyerPreferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn exclude_geo(mut self, geo: impl Into<String>) -> Self {
        self.excluded_geos.insert(geo.into());
        self
    }

    #[must_use]
    pub fn exclude_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.excluded_source_types.insert(source_type.into());
        self
    }
}

/// Why the preference filter denied a bidder. Checks run in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    /// The lead's region is on the buyer's exclusion list.
    GeoExcluded { geo: String },
    /// The lead's capture channel is on the buyer's exclusion list.
    SourceTypeExcluded { source_type: String },
    /// The bid came from off-site but the listing only accepts on-platform bids.
    ExternalOriginNotAccepted,
    /// The compliance gate (KYC / jurisdiction) said no.
    ComplianceDenied,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GeoExcluded { geo } => write!(f, "GEO_EXCLUDED({geo})"),
            Self::SourceTypeExcluded { source_type } => {
                write!(f, "SOURCE_TYPE_EXCLUDED({source_type})")
            }
            Self::ExternalOriginNotAccepted => write!(f, "EXTERNAL_ORIGIN_NOT_ACCEPTED"),
            Self::ComplianceDenied => write!(f, "COMPLIANCE_DENIED"),
        }
    }
}

/// Outcome of evaluating the filter for one (listing, bidder) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterDecision {
    Allow,
    Deny(RejectionReason),
}

impl FilterDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}
