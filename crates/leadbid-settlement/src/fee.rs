//! Platform fee on escrow release.

use leadbid_types::constants::{AMOUNT_SCALE, BPS_DENOMINATOR};
use leadbid_types::{LeadbidError, Result};
use rust_decimal::{Decimal, RoundingStrategy};

/// `amount * fee_bps / 10_000`, rounded down to the ledger scale.
///
/// # Errors
/// Returns `InvalidAmount` if the product overflows `Decimal`.
pub fn platform_fee(amount: Decimal, fee_bps: u32) -> Result<Decimal> {
    amount
        .checked_mul(Decimal::from(fee_bps))
        .and_then(|scaled| scaled.checked_div(Decimal::from(BPS_DENOMINATOR)))
        .map(|fee| fee.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::ToZero))
        .ok_or(LeadbidError::InvalidAmount(amount))
}

/// Split a release into `(payout, fee)`. The parts always sum to `amount`.
///
/// # Errors
/// Propagates overflow from [`platform_fee`].
pub fn split_release(amount: Decimal, fee_bps: u32) -> Result<(Decimal, Decimal)> {
    let fee = platform_fee(amount, fee_bps)?;
    Ok((amount - fee, fee))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fee() {
        assert_eq!(platform_fee(Decimal::new(150, 0), 250).unwrap(), Decimal::new(375, 2));
    }

    #[test]
    fn rounds_down() {
        // 0.99 * 2.5% = 0.02475
        assert_eq!(platform_fee(Decimal::new(99, 2), 250).unwrap(), Decimal::new(2, 2));
        // 0.01 * 2.5% = 0.00025
        assert_eq!(platform_fee(Decimal::new(1, 2), 250).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn zero_bps_is_free() {
        assert_eq!(platform_fee(Decimal::new(1000, 0), 0).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn split_sums_to_amount() {
        let amount = Decimal::new(123_457, 2);
        let (payout, fee) = split_release(amount, 250).unwrap();
        assert_eq!(payout + fee, amount);
        assert_eq!(fee, Decimal::new(3086, 2));
    }

    #[test]
    fn overflow_is_an_error() {
        let err = platform_fee(Decimal::MAX, 250).unwrap_err();
        assert!(matches!(err, LeadbidError::InvalidAmount(a) if a == Decimal::MAX));
        assert!(split_release(Decimal::MAX, 250).is_err());

        let cap = leadbid_types::constants::MAX_AMOUNT;
        let (payout, fee) = split_release(cap, 10_000).unwrap();
        assert_eq!((payout, fee), (Decimal::ZERO, cap));
    }
}
