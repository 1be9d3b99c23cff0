//! The deposit ledger.
//!
//! Tracks three kinds of holdings:
//! - per-account `available` / `locked` balances,
//! - per-(listing, bidder) bid deposits (the breakdown of `locked`),
//! - per-escrow custody (value that belongs to neither party until settled).
//!
//! All mutations are atomic: every check runs before the first balance is
//! touched, so an operation either fully applies or leaves the ledger
//! unchanged. The ledger is the only resource shared by the bid store and
//! the escrow engine.

use std::collections::HashMap;

use leadbid_types::{
    AccountId, BalanceEntry, EscrowId, LeadbidError, ListingId, Result, constants,
};
use rust_decimal::Decimal;

use crate::supply_conservation::{SupplyConservation, SupplySnapshot};

/// Manages account balances, bid deposits and escrow custody.
pub struct DepositLedger {
    /// Per-account balances.
    balances: HashMap<AccountId, BalanceEntry>,
    /// Locked bid deposits, keyed by (listing, bidder).
    deposits: HashMap<(ListingId, AccountId), Decimal>,
    /// Value held on behalf of each escrow.
    custody: HashMap<EscrowId, Decimal>,
    /// External inflow/outflow tracker.
    supply: SupplyConservation,
}

impl DepositLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
            deposits: HashMap::new(),
            custody: HashMap::new(),
            supply: SupplyConservation::new(),
        }
    }

    /// External inflow: increases the account's available balance.
    ///
    /// # Errors
    /// Returns `InvalidAmount` if `amount` is not positive or above
    /// [`constants::MAX_AMOUNT`].
    pub fn credit(&mut self, account: AccountId, amount: Decimal) -> Result<()> {
        ensure_transferable(amount)?;
        self.balances.entry(account).or_default().available += amount;
        self.supply.record_credit(amount);
        Ok(())
    }

    /// External outflow: decreases the account's available balance.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if available < amount.
    pub fn withdraw(&mut self, account: AccountId, amount: Decimal) -> Result<()> {
        ensure_transferable(amount)?;
        self.debit_available(account, amount)?;
        self.supply.record_withdrawal(amount);
        Ok(())
    }

    /// Lock a bid deposit (available → locked).
    ///
    /// # Errors
    /// - `DuplicateDeposit` if this bidder already has a deposit on the listing
    /// - `InsufficientBalance` if available < amount
    pub fn lock_deposit(
        &mut self,
        listing_id: ListingId,
        bidder: AccountId,
        amount: Decimal,
    ) -> Result<()> {
        if amount.is_sign_negative() {
            return Err(LeadbidError::InvalidAmount(amount));
        }
        if self.deposits.contains_key(&(listing_id, bidder)) {
            return Err(LeadbidError::DuplicateDeposit { listing_id, bidder });
        }
        self.debit_available(bidder, amount)?;
        self.balances.entry(bidder).or_default().locked += amount;
        self.deposits.insert((listing_id, bidder), amount);
        Ok(())
    }

    /// Return a locked deposit to the bidder (locked → available).
    ///
    /// # Errors
    /// Returns `DepositNotLocked` if no deposit is held.
    pub fn release_deposit(&mut self, listing_id: ListingId, bidder: AccountId) -> Result<Decimal> {
        let amount = self.take_deposit(listing_id, bidder)?;
        self.balances.entry(bidder).or_default().available += amount;
        Ok(amount)
    }

    /// Convert a locked deposit into an escrow funding contribution
    /// (locked → escrow custody) in one step.
    ///
    /// # Errors
    /// Returns `DepositNotLocked` if no deposit is held.
    pub fn convert_deposit_to_escrow(
        &mut self,
        listing_id: ListingId,
        bidder: AccountId,
        escrow_id: EscrowId,
    ) -> Result<Decimal> {
        let amount = self.take_deposit(listing_id, bidder)?;
        *self.custody.entry(escrow_id).or_insert(Decimal::ZERO) += amount;
        tracing::debug!(
            listing = %listing_id,
            bidder = %bidder,
            escrow = %escrow_id,
            %amount,
            "Deposit converted into escrow contribution"
        );
        Ok(amount)
    }

    /// Move funds from the payer's available balance into escrow custody.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if available < amount.
    pub fn fund_escrow_from_available(
        &mut self,
        payer: AccountId,
        escrow_id: EscrowId,
        amount: Decimal,
    ) -> Result<()> {
        if amount.is_sign_negative() {
            return Err(LeadbidError::InvalidAmount(amount));
        }
        self.debit_available(payer, amount)?;
        *self.custody.entry(escrow_id).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    /// Pay an escrow out: `expected - fee` to the payee, `fee` to the fee
    /// recipient. Custody must hold exactly `expected`.
    ///
    /// # Errors
    /// Returns `EscrowCustodyMismatch` if custody ≠ expected, or
    /// `InvalidAmount` if the fee is negative or exceeds the amount.
    pub fn pay_out_escrow(
        &mut self,
        escrow_id: EscrowId,
        expected: Decimal,
        payee: AccountId,
        fee_recipient: AccountId,
        fee: Decimal,
    ) -> Result<()> {
        if fee.is_sign_negative() || fee > expected {
            return Err(LeadbidError::InvalidAmount(fee));
        }
        self.take_custody(escrow_id, expected)?;
        self.balances.entry(payee).or_default().available += expected - fee;
        if !fee.is_zero() {
            self.balances.entry(fee_recipient).or_default().available += fee;
        }
        tracing::debug!(escrow = %escrow_id, payee = %payee, %expected, %fee, "Escrow custody paid out");
        Ok(())
    }

    /// Return an escrow's full custody to the payer.
    ///
    /// # Errors
    /// Returns `EscrowCustodyMismatch` if custody ≠ expected.
    pub fn refund_escrow(
        &mut self,
        escrow_id: EscrowId,
        expected: Decimal,
        payer: AccountId,
    ) -> Result<()> {
        self.take_custody(escrow_id, expected)?;
        self.balances.entry(payer).or_default().available += expected;
        Ok(())
    }

    /// Get the balance for an account.
    #[must_use]
    pub fn balance(&self, account: AccountId) -> BalanceEntry {
        self.balances.get(&account).cloned().unwrap_or_default()
    }

    /// The deposit currently locked by `bidder` on `listing_id`, if any.
    #[must_use]
    pub fn locked_deposit(&self, listing_id: ListingId, bidder: AccountId) -> Option<Decimal> {
        self.deposits.get(&(listing_id, bidder)).copied()
    }

    /// Value held in custody for an escrow.
    #[must_use]
    pub fn escrow_custody(&self, escrow_id: EscrowId) -> Decimal {
        self.custody.get(&escrow_id).copied().unwrap_or(Decimal::ZERO)
    }

    /// Where all value in the ledger currently sits.
    #[must_use]
    pub fn snapshot(&self) -> SupplySnapshot {
        SupplySnapshot {
            balances: self.balances.values().map(BalanceEntry::total).sum(),
            custody: self.custody.values().copied().sum(),
        }
    }

    /// Total value in the ledger: all balances plus all escrow custody.
    #[must_use]
    pub fn total_supply(&self) -> Decimal {
        self.snapshot().total()
    }

    /// Verify the supply conservation invariant.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` if value was created or destroyed.
    pub fn verify_supply(&self) -> Result<()> {
        self.supply.verify(self.snapshot())
    }

    fn debit_available(&mut self, account: AccountId, amount: Decimal) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let entry = self
            .balances
            .get_mut(&account)
            .ok_or(LeadbidError::InsufficientBalance {
                needed: amount,
                available: Decimal::ZERO,
            })?;

        entry.ensure_covers(amount)?;
        entry.available -= amount;
        Ok(())
    }

    fn take_deposit(&mut self, listing_id: ListingId, bidder: AccountId) -> Result<Decimal> {
        let amount = self
            .deposits
            .remove(&(listing_id, bidder))
            .ok_or(LeadbidError::DepositNotLocked { listing_id, bidder })?;
        // `locked` is the sum of the account's deposits, so it covers `amount`.
        self.balances.entry(bidder).or_default().locked -= amount;
        Ok(amount)
    }

    fn take_custody(&mut self, escrow_id: EscrowId, expected: Decimal) -> Result<()> {
        let held = self.escrow_custody(escrow_id);
        if held != expected {
            return Err(LeadbidError::EscrowCustodyMismatch {
                escrow_id,
                expected,
                held,
            });
        }
        self.custody.remove(&escrow_id);
        Ok(())
    }
}

impl Default for DepositLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_transferable(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO || amount > constants::MAX_AMOUNT {
        return Err(LeadbidError::InvalidAmount(amount));
    }
    Ok(())
}
