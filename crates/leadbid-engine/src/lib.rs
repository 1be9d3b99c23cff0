//! # leadbid-engine
//!
//! **Orchestration** for the Leadbid sealed-bid auction and escrow engine.
//!
//! ## Architecture
//!
//! ```text
//! EngineHandle (async, cloneable)
//!      │  mpsc
//!      ▼
//! engine task ── owns ──▶ Marketplace
//!                          ├── ListingRegistry + AssetRegistry
//!                          ├── PreferenceFilter
//!                          ├── BidStore ───────┐
//!                          ├── select_winner   │ DepositLedger
//!                          ├── EscrowEngine ───┘
//!                          └── event log
//! ```
//!
//! Nothing runs on a timer. Windows are evaluated against the [`Clock`]
//! whenever a command arrives, so `resolve_auction` and `release_escrow`
//! must be called by someone once they are due.

pub mod actor;
pub mod clock;
pub mod marketplace;
pub mod telemetry;

pub use actor::EngineHandle;
#[cfg(any(test, feature = "test-helpers"))]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use marketplace::{ListingAudit, Marketplace};
pub use telemetry::{LogFormat, init_tracing};
