//! # leadbid-ledger
//!
//! **Deposit Ledger**: the one resource shared by the bid store and the
//! escrow engine.
//!
//! ## Value Flow
//!
//! ```text
//! credit → available ─lock_deposit→ locked ─release_deposit→ available
//!                │                    └─convert_deposit_to_escrow→ custody
//!                └─fund_escrow_from_available→ custody
//! custody ─pay_out_escrow→ payee + fee recipient
//! custody ─refund_escrow→ payer
//! ```
//!
//! Every arrow is a single atomic call. [`SupplyConservation`] checks that
//! no arrow creates or destroys value.

pub mod deposit_ledger;
pub mod supply_conservation;

pub use deposit_ledger::DepositLedger;
pub use supply_conservation::{SupplyConservation, SupplySnapshot};
