//! # leadbid-bidding
//!
//! **Bid intake**: everything that happens to a listing before it is
//! resolved.
//!
//! 1. **ListingRegistry**: creates listings, takes the asset into custody,
//!    tracks the `Active → RevealPhase → Resolved | Expired` lifecycle
//! 2. **PreferenceFilter**: hard gate on every commit (buyer exclusions,
//!    off-site origin, compliance)
//! 3. **BidStore**: sealed commitments, reveals, deposit withdrawal
//! 4. **AssetRegistry**: seam to whatever system owns the lead records
//!
//! ## Bid Flow
//!
//! ```text
//! commit_bid → PreferenceFilter.check() → DepositLedger.lock_deposit() → Committed
//! reveal_bid → Commitment.verify() → Revealed (or Rejected below reserve)
//! resolve    → BidStore.settle() → Accepted | Rejected
//! withdraw   → DepositLedger.release_deposit() → deposit Returned
//! ```

pub mod asset_registry;
pub mod bid_store;
pub mod listing_registry;
pub mod preference_filter;

pub use asset_registry::{AssetRegistry, InMemoryAssetRegistry};
pub use bid_store::BidStore;
pub use listing_registry::ListingRegistry;
pub use preference_filter::{AllowAll, ComplianceGate, DenyList, PreferenceFilter};
