//! # leadbid-settlement
//!
//! **Finality**: holds the payment for a sale until it can be released.
//!
//! The escrow engine receives a winning amount (or a buy-now price) and:
//! 1. Opens exactly one escrow per listing
//! 2. Absorbs the winner's bid deposit as a partial contribution
//! 3. Funds the remainder from the payer's available balance
//! 4. Releases to the payee, minus the platform fee, after the delay
//! 5. Lets either party dispute before the delay elapses; the adjudicator
//!    refunds disputed escrows
//!
//! All value moves go through the [`DepositLedger`](leadbid_ledger::DepositLedger),
//! so supply conservation is checked in one place.

pub mod escrow_engine;
pub mod fee;

pub use escrow_engine::{EscrowEngine, ReleaseReceipt};
pub use fee::{platform_fee, split_release};
