//! Error types for the Leadbid auction and escrow engine.
//!
//! All errors use the `LB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Listing errors
//! - 2xx: Bid errors
//! - 3xx: Deposit ledger errors
//! - 4xx: Escrow errors
//! - 5xx: Policy rejections
//! - 6xx: Asset registry errors
//! - 8xx: Invariant violations
//! - 9xx: General / internal errors
//!
//! Every variant belongs to exactly one [`ErrorClass`], which lets a
//! retrying caller tell "fix your input" apart from "you are not eligible".

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AccountId, AssetRef, EscrowId, EscrowState, ListingId, ListingState, RejectionReason};

/// The taxonomy a rejection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Bad input or wrong state for the operation. Fix the request.
    CallerError,
    /// The caller is not eligible (preference filter or compliance gate).
    PolicyRejection,
    /// A safety invariant would have been broken. Never expected in practice.
    InvariantViolation,
    /// Infrastructure failure (configuration, I/O, engine shut down).
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CallerError => write!(f, "CALLER_ERROR"),
            Self::PolicyRejection => write!(f, "POLICY_REJECTION"),
            Self::InvariantViolation => write!(f, "INVARIANT_VIOLATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Central error enum for all Leadbid operations.
#[derive(Debug, Error)]
pub enum LeadbidError {
    // =================================================================
    // Listing Errors (1xx)
    // =================================================================
    /// The requested listing does not exist.
    #[error("LB_ERR_100: Listing not found: {0}")]
    ListingNotFound(ListingId),

    /// The caller does not control the asset it tried to list.
    #[error("LB_ERR_101: {caller} does not own {asset}")]
    NotOwner { caller: AccountId, asset: AssetRef },

    /// Bidding or reveal duration is zero or exceeds the configured maximum.
    #[error("LB_ERR_102: Invalid window: {reason}")]
    InvalidWindow { reason: String },

    /// The listing already reached a terminal state.
    #[error("LB_ERR_103: Listing already resolved: {0}")]
    AlreadyResolved(ListingId),

    /// Buy-now is not offered on this listing or no longer available.
    #[error("LB_ERR_104: Buy-now unavailable on {listing_id}: {reason}")]
    BuyNowUnavailable { listing_id: ListingId, reason: String },

    /// A reserve or buy-now price is not acceptable.
    #[error("LB_ERR_105: Invalid price: {reason}")]
    InvalidPrice { reason: String },

    // =================================================================
    // Bid Errors (2xx)
    // =================================================================
    /// The operation's time window is not open.
    #[error("LB_ERR_200: Window closed for {operation} on {listing_id} (listing is {state})")]
    WindowClosed {
        listing_id: ListingId,
        operation: &'static str,
        state: ListingState,
    },

    /// The bidder already holds a commitment on this listing.
    #[error("LB_ERR_201: Duplicate commit by {bidder} on {listing_id}")]
    DuplicateCommit {
        listing_id: ListingId,
        bidder: AccountId,
    },

    /// `hash(amount, salt)` does not match the stored commitment.
    #[error("LB_ERR_202: Reveal does not match commitment for {bidder} on {listing_id}")]
    InvalidReveal {
        listing_id: ListingId,
        bidder: AccountId,
    },

    /// No bid exists for this (listing, bidder).
    #[error("LB_ERR_203: No bid by {bidder} on {listing_id}")]
    BidNotFound {
        listing_id: ListingId,
        bidder: AccountId,
    },

    /// The bid is not in a state that permits this operation.
    #[error("LB_ERR_204: Not eligible: {reason}")]
    NotEligible { reason: String },

    /// A commitment can only be revealed once.
    #[error("LB_ERR_205: Bid by {bidder} on {listing_id} already revealed")]
    AlreadyRevealed {
        listing_id: ListingId,
        bidder: AccountId,
    },

    /// The reveal window has not elapsed yet, resolution must wait.
    #[error("LB_ERR_206: Reveal window still open on {0}")]
    RevealWindowOpen(ListingId),

    /// A revealed amount must be positive.
    #[error("LB_ERR_207: Invalid bid amount: {amount}")]
    InvalidBidAmount { amount: Decimal },

    // =================================================================
    // Deposit Ledger Errors (3xx)
    // =================================================================
    /// Not enough available balance to perform the operation.
    #[error("LB_ERR_300: Insufficient available balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    /// No locked deposit exists for this (listing, bidder).
    #[error("LB_ERR_301: No deposit locked by {bidder} on {listing_id}")]
    DepositNotLocked {
        listing_id: ListingId,
        bidder: AccountId,
    },

    /// A deposit for this (listing, bidder) is already locked.
    #[error("LB_ERR_302: Deposit already locked by {bidder} on {listing_id}")]
    DuplicateDeposit {
        listing_id: ListingId,
        bidder: AccountId,
    },

    /// Escrow custody does not hold the amount being paid out.
    #[error("LB_ERR_303: Escrow custody mismatch for {escrow_id}: expected {expected}, held {held}")]
    EscrowCustodyMismatch {
        escrow_id: EscrowId,
        expected: Decimal,
        held: Decimal,
    },

    /// Amounts moved through the ledger must be positive.
    #[error("LB_ERR_304: Invalid ledger amount: {0}")]
    InvalidAmount(Decimal),

    // =================================================================
    // Escrow Errors (4xx)
    // =================================================================
    /// The requested escrow does not exist.
    #[error("LB_ERR_400: Escrow not found: {0}")]
    EscrowNotFound(EscrowId),

    /// The escrow is not in the `Funded` state.
    #[error("LB_ERR_401: Escrow {escrow_id} not funded (state {state})")]
    NotFunded {
        escrow_id: EscrowId,
        state: EscrowState,
    },

    /// The escrow is not in the `Disputed` state.
    #[error("LB_ERR_402: Escrow {escrow_id} not disputed (state {state})")]
    NotDisputed {
        escrow_id: EscrowId,
        state: EscrowState,
    },

    /// The caller is not allowed to perform this escrow operation.
    #[error("LB_ERR_403: Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// The escrow has already been funded (or moved past funding).
    #[error("LB_ERR_404: Escrow {escrow_id} already funded (state {state})")]
    AlreadyFunded {
        escrow_id: EscrowId,
        state: EscrowState,
    },

    /// Funding must cover exactly the outstanding balance.
    #[error("LB_ERR_405: Escrow {escrow_id} expects {expected}, got {offered}")]
    FundingMismatch {
        escrow_id: EscrowId,
        expected: Decimal,
        offered: Decimal,
    },

    /// The release delay has not elapsed yet.
    #[error("LB_ERR_406: Escrow {escrow_id} not releasable before {due_at}")]
    ReleaseNotDue {
        escrow_id: EscrowId,
        due_at: chrono::DateTime<chrono::Utc>,
    },

    /// The dispute window closed when the release delay elapsed.
    #[error("LB_ERR_407: Dispute window closed for escrow {0}")]
    DisputeWindowClosed(EscrowId),

    /// An escrow with this ID already exists.
    #[error("LB_ERR_408: Escrow already exists: {0}")]
    DuplicateEscrow(EscrowId),

    // =================================================================
    // Policy Rejections (5xx)
    // =================================================================
    /// The preference filter or compliance gate denied the bidder.
    #[error("LB_ERR_500: Preference rejected: {0}")]
    PreferenceRejected(RejectionReason),

    // =================================================================
    // Asset Registry Errors (6xx)
    // =================================================================
    /// The asset is unknown to the registry.
    #[error("LB_ERR_600: Asset not found: {0}")]
    AssetNotFound(AssetRef),

    /// The caller is not the asset's current custodian.
    #[error("LB_ERR_601: {caller} is not custodian of {asset}")]
    NotCustodian { caller: AccountId, asset: AssetRef },

    // =================================================================
    // Invariant Violations (8xx)
    // =================================================================
    /// Supply conservation invariant violated.
    #[error("LB_ERR_800: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    /// Deposits locked on a listing are not fully accounted for.
    #[error("LB_ERR_801: Deposit accounting violation on {listing_id}: {reason}")]
    DepositAccountingViolation {
        listing_id: ListingId,
        reason: String,
    },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("LB_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("LB_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, bad values, etc.).
    #[error("LB_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, network).
    #[error("LB_ERR_903: I/O error: {0}")]
    Io(String),

    /// The engine task is gone; the command was not applied.
    #[error("LB_ERR_904: Engine unavailable")]
    EngineUnavailable,
}

impl LeadbidError {
    /// Which part of the error taxonomy this rejection belongs to.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::PreferenceRejected(_) => ErrorClass::PolicyRejection,
            Self::SupplyInvariantViolation { .. } | Self::DepositAccountingViolation { .. } => {
                ErrorClass::InvariantViolation
            }
            Self::Internal(_)
            | Self::Serialization(_)
            | Self::Configuration(_)
            | Self::Io(_)
            | Self::EngineUnavailable => ErrorClass::Internal,
            _ => ErrorClass::CallerError,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LeadbidError>;

impl From<std::io::Error> for LeadbidError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LeadbidError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
