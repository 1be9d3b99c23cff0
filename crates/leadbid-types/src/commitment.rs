//! Sealed-bid commitments.
//!
//! A bidder commits to `SHA-256(domain || listing_id || bidder || amount || salt)`
//! during the bidding window and later reveals `(amount, salt)`. The listing
//! and bidder are part of the preimage, so a copied commitment can never be
//! opened by anyone but its author, nor on any other listing.
//!
//! The amount is hashed in normalized form: `100`, `100.0` and `100.00`
//! produce the same commitment.

use std::fmt;

use rand::RngCore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{AccountId, ListingId, constants};

/// Secret blinding value chosen by the bidder.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Salt(pub [u8; constants::SALT_LEN]);

impl Salt {
    /// Fresh random salt from the thread-local CSPRNG.
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0u8; constants::SALT_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

// Salts are secrets until revealed; keep them out of logs.
impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt(..)")
    }
}

/// Binding, hiding hash of a bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(pub [u8; 32]);

impl Commitment {
    /// Compute the commitment a bidder submits for `(amount, salt)`.
    #[must_use]
    pub fn compute(listing_id: ListingId, bidder: AccountId, amount: Decimal, salt: &Salt) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(constants::COMMITMENT_DOMAIN);
        hasher.update(listing_id.0.as_bytes());
        hasher.update(bidder.0.as_bytes());
        hasher.update(amount.normalize().to_string().as_bytes());
        hasher.update(b":");
        hasher.update(salt.0);
        let result = hasher.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        Self(hash)
    }

    /// Whether `(amount, salt)` opens this commitment.
    #[must_use]
    pub fn verify(
        &self,
        listing_id: ListingId,
        bidder: AccountId,
        amount: Decimal,
        salt: &Salt,
    ) -> bool {
        Self::compute(listing_id, bidder, amount, salt) == *self
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}
