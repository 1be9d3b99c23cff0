//! # leadbid-types
//!
//! Shared types, errors, and configuration for the **Leadbid** sealed-bid
//! auction and escrow engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`ListingId`], [`AccountId`], [`EscrowId`], [`AssetRef`]
//! - **Listing model**: [`Listing`], [`ListingState`], [`ListingParams`], [`Resolution`], [`LeadAttributes`]
//! - **Bid model**: [`Bid`], [`BidStatus`], [`BidOrigin`], [`DepositState`]
//! - **Commitments**: [`Commitment`], [`Salt`]
//! - **Escrow model**: [`Escrow`], [`EscrowState`]
//! - **Preferences**: [`BuyerPreferences`], [`FilterDecision`], [`RejectionReason`]
//! - **Balance model**: [`BalanceEntry`]
//! - **Events**: [`MarketEvent`], [`EventRecord`]
//! - **Configuration**: [`MarketConfig`]
//! - **Errors**: [`LeadbidError`] with `LB_ERR_` prefix codes and [`ErrorClass`]
//! - **Constants**: system-wide limits and defaults

pub mod balance;
pub mod bid;
pub mod commitment;
pub mod config;
pub mod constants;
pub mod error;
pub mod escrow;
pub mod event;
pub mod ids;
pub mod listing;
pub mod preference;

// Re-export all primary types at crate root for ergonomic imports:
//   use leadbid_types::{Listing, Bid, Escrow, ...};

pub use balance::*;
pub use bid::*;
pub use commitment::*;
pub use config::*;
pub use error::*;
pub use escrow::*;
pub use event::*;
pub use ids::*;
pub use listing::*;
pub use preference::*;

// Constants are accessed via `leadbid_types::constants::FOO`
// (not re-exported to avoid name collisions).
