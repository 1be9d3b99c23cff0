//! # leadbid-resolver
//!
//! **Pure deterministic winner selection.**
//!
//! The resolver takes every bid on a listing and decides the outcome. It
//! has:
//!
//! - **Zero side effects**: no ledger writes, no escrow, no asset moves
//! - **Deterministic output**: same bids in the same order → same verdicts
//!   and the same `bid_root`
//! - **First-revealed tie-break**: equal amounts resolve by global reveal
//!   sequence

pub mod determinism;
pub mod selection;

pub use determinism::{compute_bid_root, verify_bid_root};
pub use selection::{BidVerdict, Outcome, Selection, VerdictReason, select_winner};
