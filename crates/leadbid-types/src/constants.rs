//! System-wide constants for the Leadbid engine.

use rust_decimal::Decimal;

/// Basis-point denominator (100% = 10,000 bps).
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Default bid deposit, as a fraction of the reserve price (10%).
pub const DEFAULT_DEPOSIT_BPS: u32 = 1_000;

/// Default platform fee charged on escrow release (2.5%).
pub const DEFAULT_FEE_BPS: u32 = 250;

/// Default escrow release delay: 72 hours.
pub const DEFAULT_RELEASE_DELAY_SECS: u64 = 72 * 60 * 60;

/// Default maximum bidding window: 30 days.
pub const DEFAULT_MAX_BIDDING_SECS: u64 = 30 * 24 * 60 * 60;

/// Default maximum reveal window: 30 days.
pub const DEFAULT_MAX_REVEAL_SECS: u64 = 30 * 24 * 60 * 60;

/// Largest price, revealed bid or single credit the engine accepts
/// (10^15). Far enough below `Decimal::MAX` that deposit and fee
/// arithmetic on any accepted amount cannot overflow.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Decimal places amounts are rounded to when a fraction is taken
/// (deposits, fees).
pub const AMOUNT_SCALE: u32 = 2;

/// Size of a commitment salt in bytes.
pub const SALT_LEN: usize = 32;

/// Domain separator for bid commitments.
pub const COMMITMENT_DOMAIN: &[u8] = b"leadbid:commit:v1:";

/// Default capacity of the engine's command channel.
pub const DEFAULT_COMMAND_BUFFER: usize = 1_024;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Leadbid";
