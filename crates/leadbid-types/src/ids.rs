//! Globally unique identifiers used throughout Leadbid.
//!
//! Listing, escrow and account IDs use UUIDv7 for time-ordered sorting.
//! Escrows created by an auction or buy-now derive their ID from the
//! listing so that a listing can own at most one settlement escrow.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ListingId
// ---------------------------------------------------------------------------

/// Unique identifier for a sale offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ListingId(pub Uuid);

impl ListingId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for ListingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lst:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// A participant: seller, bidder, adjudicator, fee recipient or custodian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl AccountId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EscrowId
// ---------------------------------------------------------------------------

/// Unique identifier for an escrow holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EscrowId(pub Uuid);

impl EscrowId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Deterministic `EscrowId` for the settlement escrow of a listing.
    ///
    /// Resolving or buying a listing always yields the same escrow ID, so a
    /// second settlement attempt collides with the first instead of minting
    /// a parallel holding.
    #[must_use]
    pub fn for_listing(listing_id: ListingId) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"leadbid:escrow_id:v1:");
        hasher.update(listing_id.0.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash[..16]);
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for EscrowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EscrowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "esc:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AssetRef
// ---------------------------------------------------------------------------

/// Opaque handle to the traded lead record in the external asset registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AssetRef(pub String);

impl AssetRef {
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_id_uniqueness() {
        let a = ListingId::new();
        let b = ListingId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn listing_id_ordering() {
        let a = ListingId::new();
        let b = ListingId::new();
        assert!(a < b);
    }

    #[test]
    fn escrow_id_for_listing_is_deterministic() {
        let listing = ListingId::from_bytes([7; 16]);
        assert_eq!(EscrowId::for_listing(listing), EscrowId::for_listing(listing));
        let other = ListingId::from_bytes([8; 16]);
        assert_ne!(EscrowId::for_listing(listing), EscrowId::for_listing(other));
    }

    #[test]
    fn display_prefixes() {
        let listing = ListingId::from_bytes([1; 16]);
        assert!(listing.to_string().starts_with("lst:"));
        assert!(EscrowId::for_listing(listing).to_string().starts_with("esc:"));
        assert_eq!(AssetRef::new("lead-42").to_string(), "asset:lead-42");
    }

    #[test]
    fn serde_roundtrips() {
        let lid = ListingId::new();
        let json = serde_json::to_string(&lid).unwrap();
        let back: ListingId = serde_json::from_str(&json).unwrap();
        assert_eq!(lid, back);

        let asset = AssetRef::new("lead-1");
        let json = serde_json::to_string(&asset).unwrap();
        let back: AssetRef = serde_json::from_str(&json).unwrap();
        assert_eq!(asset, back);
    }
}
