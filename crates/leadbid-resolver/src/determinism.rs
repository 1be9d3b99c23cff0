//! Deterministic resolution digest.
//!
//! The `bid_root` is a hash over every verdict of a resolution, in order.
//! Anyone replaying the same bids gets the same root, so an auditor can
//! check a resolution without comparing full payloads.

use leadbid_types::ListingId;
use sha2::{Digest, Sha256};

use crate::selection::BidVerdict;

/// Compute the bid root for a listing's verdicts.
///
/// Depends on:
/// - the listing id
/// - each verdict's bidder, amount, reveal sequence and reason (in order)
#[must_use]
pub fn compute_bid_root(listing_id: ListingId, verdicts: &[BidVerdict]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"leadbid:bid_root:v1:");
    hasher.update(listing_id.0.as_bytes());
    hasher.update((verdicts.len() as u64).to_le_bytes());

    for verdict in verdicts {
        hasher.update(verdict.bidder.0.as_bytes());
        match verdict.amount {
            Some(amount) => {
                hasher.update([1u8]);
                hasher.update(amount.normalize().to_string().as_bytes());
                hasher.update(b":");
            }
            None => hasher.update([0u8]),
        }
        hasher.update(verdict.reveal_sequence.unwrap_or(u64::MAX).to_le_bytes());
        hasher.update([verdict.reason.tag()]);
    }

    let result = hasher.finalize();
    let mut root = [0u8; 32];
    root.copy_from_slice(&result);
    root
}

/// Recompute the root and compare.
#[must_use]
pub fn verify_bid_root(listing_id: ListingId, verdicts: &[BidVerdict], expected: &[u8; 32]) -> bool {
    compute_bid_root(listing_id, verdicts) == *expected
}

#[cfg(test)]
mod tests {
    use leadbid_types::AccountId;
    use rust_decimal::Decimal;

    use super::*;
    use crate::selection::VerdictReason;

    fn verdict(bidder: u8, amount: Option<i64>, reason: VerdictReason) -> BidVerdict {
        BidVerdict {
            bidder: AccountId::from_bytes([bidder; 16]),
            amount: amount.map(|a| Decimal::new(a, 0)),
            reveal_sequence: amount.map(|_| u64::from(bidder)),
            reason,
        }
    }

    fn listing() -> ListingId {
        ListingId::from_bytes([9; 16])
    }

    #[test]
    fn empty_is_stable() {
        assert_eq!(compute_bid_root(listing(), &[]), compute_bid_root(listing(), &[]));
    }

    #[test]
    fn listing_id_matters() {
        assert_ne!(
            compute_bid_root(listing(), &[]),
            compute_bid_root(ListingId::from_bytes([8; 16]), &[])
        );
    }

    #[test]
    fn order_matters() {
        let a = verdict(1, Some(100), VerdictReason::Outbid);
        let b = verdict(2, Some(150), VerdictReason::Winner);
        assert_ne!(
            compute_bid_root(listing(), &[a.clone(), b.clone()]),
            compute_bid_root(listing(), &[b, a])
        );
    }

    #[test]
    fn equivalent_amounts_hash_identically() {
        let mut a = verdict(1, Some(100), VerdictReason::Winner);
        let root = compute_bid_root(listing(), std::slice::from_ref(&a));
        a.amount = Some(Decimal::new(10000, 2));
        assert!(verify_bid_root(listing(), &[a], &root));
    }

    #[test]
    fn reason_matters() {
        let a = verdict(1, Some(100), VerdictReason::Winner);
        let b = verdict(1, Some(100), VerdictReason::Outbid);
        assert_ne!(
            compute_bid_root(listing(), &[a]),
            compute_bid_root(listing(), &[b])
        );
    }
}
