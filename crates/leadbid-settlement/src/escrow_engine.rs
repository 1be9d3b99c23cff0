//! Escrow settlement engine.
//!
//! Holds the payment for a sale between payer and payee until the
//! release delay elapses, then pays the payee minus the platform fee.
//! Either party may dispute while the delay is running; a disputed escrow
//! can only be refunded by the adjudicator.
//!
//! ```text
//! Created ──fund──▶ Funded ──release──▶ Released
//!                     │
//!                     └──dispute──▶ Disputed ──refund──▶ Refunded
//! ```
//!
//! Double release and double refund are refused by the state check alone:
//! a second call finds the escrow in a terminal state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use leadbid_ledger::DepositLedger;
use leadbid_types::{
    AccountId, Escrow, EscrowId, EscrowState, LeadbidError, ListingId, MarketConfig, Result,
};
use rust_decimal::Decimal;

use crate::fee::split_release;

/// Amounts moved by a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseReceipt {
    pub payee: AccountId,
    pub payout: Decimal,
    pub fee: Decimal,
}

/// Owns every escrow and drives its state machine.
pub struct EscrowEngine {
    escrows: HashMap<EscrowId, Escrow>,
    fee_bps: u32,
    fee_recipient: AccountId,
    adjudicator: AccountId,
    release_delay_secs: u64,
}

impl EscrowEngine {
    #[must_use]
    pub fn new(config: &MarketConfig) -> Self {
        Self {
            escrows: HashMap::new(),
            fee_bps: config.fee_bps,
            fee_recipient: config.fee_recipient,
            adjudicator: config.adjudicator,
            release_delay_secs: config.release_delay_secs,
        }
    }

    /// Open an escrow for a listing's sale. The id is derived from the
    /// listing, so a listing can only ever have one.
    ///
    /// # Errors
    /// - `InvalidAmount` if the amount is not positive
    /// - `DuplicateEscrow` if the listing already has an escrow
    pub fn create(
        &mut self,
        listing_id: ListingId,
        payer: AccountId,
        payee: AccountId,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<EscrowId> {
        if amount <= Decimal::ZERO {
            return Err(LeadbidError::InvalidAmount(amount));
        }
        let id = EscrowId::for_listing(listing_id);
        if self.escrows.contains_key(&id) {
            return Err(LeadbidError::DuplicateEscrow(id));
        }
        let escrow = Escrow {
            id,
            listing_id,
            payer,
            payee,
            amount,
            funded: Decimal::ZERO,
            state: EscrowState::Created,
            created_at: now,
            funded_at: None,
            release_delay_secs: self.release_delay_secs,
        };
        tracing::info!(escrow = %id, listing = %listing_id, payer = %payer, payee = %payee, %amount, "Escrow created");
        self.escrows.insert(id, escrow);
        Ok(id)
    }

    /// Move the payer's locked bid deposit into the escrow as a partial
    /// contribution. Returns the amount contributed.
    ///
    /// # Errors
    /// - `AlreadyFunded` if the escrow is past `Created`
    /// - `DepositNotLocked` if the payer holds no deposit on the listing
    /// - `FundingMismatch` if the deposit exceeds the outstanding balance
    pub fn contribute_deposit(&mut self, ledger: &mut DepositLedger, id: EscrowId) -> Result<Decimal> {
        let escrow = self
            .escrows
            .get_mut(&id)
            .ok_or(LeadbidError::EscrowNotFound(id))?;
        if escrow.state != EscrowState::Created {
            return Err(LeadbidError::AlreadyFunded {
                escrow_id: id,
                state: escrow.state,
            });
        }
        let deposit = ledger
            .locked_deposit(escrow.listing_id, escrow.payer)
            .ok_or(LeadbidError::DepositNotLocked {
                listing_id: escrow.listing_id,
                bidder: escrow.payer,
            })?;
        if deposit > escrow.outstanding() {
            return Err(LeadbidError::FundingMismatch {
                escrow_id: id,
                expected: escrow.outstanding(),
                offered: deposit,
            });
        }
        let moved = ledger.convert_deposit_to_escrow(escrow.listing_id, escrow.payer, id)?;
        escrow.funded += moved;
        Ok(moved)
    }

    /// Fund the escrow's outstanding balance from the payer's available
    /// funds.
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not the payer
    /// - `AlreadyFunded` if the escrow is past `Created`
    /// - `FundingMismatch` if `amount` ≠ outstanding
    /// - `InsufficientBalance` if the payer cannot cover it
    pub fn fund(
        &mut self,
        ledger: &mut DepositLedger,
        id: EscrowId,
        caller: AccountId,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let escrow = self
            .escrows
            .get_mut(&id)
            .ok_or(LeadbidError::EscrowNotFound(id))?;
        if caller != escrow.payer {
            return Err(LeadbidError::Unauthorized {
                reason: format!("only the payer can fund escrow {id}"),
            });
        }
        if escrow.state != EscrowState::Created {
            return Err(LeadbidError::AlreadyFunded {
                escrow_id: id,
                state: escrow.state,
            });
        }
        if amount != escrow.outstanding() {
            return Err(LeadbidError::FundingMismatch {
                escrow_id: id,
                expected: escrow.outstanding(),
                offered: amount,
            });
        }
        ledger.fund_escrow_from_available(escrow.payer, id, amount)?;
        escrow.funded += amount;
        escrow.transition(EscrowState::Funded)?;
        escrow.funded_at = Some(now);
        tracing::info!(escrow = %id, funded = %escrow.funded, "Escrow funded");
        Ok(())
    }

    /// Fund the escrow on the payer's behalf if their available balance
    /// covers the outstanding amount. Returns whether it was funded; a
    /// short payer leaves the escrow `Created`.
    ///
    /// # Errors
    /// Returns `EscrowNotFound`, or `AlreadyFunded` if past `Created`.
    pub fn try_fund(&mut self, ledger: &mut DepositLedger, id: EscrowId, now: DateTime<Utc>) -> Result<bool> {
        let escrow = self.get(id)?;
        let (payer, outstanding) = (escrow.payer, escrow.outstanding());
        if !ledger.balance(payer).covers(outstanding) {
            tracing::warn!(
                escrow = %id,
                payer = %payer,
                %outstanding,
                "Payer cannot cover escrow yet; left unfunded"
            );
            return Ok(false);
        }
        self.fund(ledger, id, payer, outstanding, now)?;
        Ok(true)
    }

    /// Pay the payee once the release delay has elapsed.
    ///
    /// # Errors
    /// - `NotFunded` unless the escrow is `Funded`
    /// - `ReleaseNotDue` before `funded_at + release_delay`
    pub fn release(&mut self, ledger: &mut DepositLedger, id: EscrowId, now: DateTime<Utc>) -> Result<ReleaseReceipt> {
        let escrow = self
            .escrows
            .get_mut(&id)
            .ok_or(LeadbidError::EscrowNotFound(id))?;
        if escrow.state != EscrowState::Funded {
            return Err(LeadbidError::NotFunded {
                escrow_id: id,
                state: escrow.state,
            });
        }
        let due_at = escrow.release_due_at().ok_or_else(|| {
            LeadbidError::Internal(format!("funded escrow {id} has no funding time"))
        })?;
        if now < due_at {
            return Err(LeadbidError::ReleaseNotDue {
                escrow_id: id,
                due_at,
            });
        }

        let (payout, fee) = split_release(escrow.amount, self.fee_bps)?;
        ledger.pay_out_escrow(id, escrow.amount, escrow.payee, self.fee_recipient, fee)?;
        escrow.transition(EscrowState::Released)?;
        tracing::info!(escrow = %id, payee = %escrow.payee, %payout, %fee, "Escrow released");
        Ok(ReleaseReceipt {
            payee: escrow.payee,
            payout,
            fee,
        })
    }

    /// Freeze a funded escrow pending adjudication.
    ///
    /// State is checked before the caller, so any caller sees `NotFunded`
    /// on an escrow that cannot be disputed.
    ///
    /// # Errors
    /// - `NotFunded` unless the escrow is `Funded`
    /// - `Unauthorized` if `caller` is neither payer nor payee
    /// - `DisputeWindowClosed` once the release delay has elapsed
    pub fn dispute(&mut self, id: EscrowId, caller: AccountId, now: DateTime<Utc>) -> Result<()> {
        let escrow = self
            .escrows
            .get_mut(&id)
            .ok_or(LeadbidError::EscrowNotFound(id))?;
        if escrow.state != EscrowState::Funded {
            return Err(LeadbidError::NotFunded {
                escrow_id: id,
                state: escrow.state,
            });
        }
        if !escrow.is_party(caller) {
            return Err(LeadbidError::Unauthorized {
                reason: format!("{caller} is not a party to escrow {id}"),
            });
        }
        if escrow.release_due_at().is_some_and(|due| now >= due) {
            return Err(LeadbidError::DisputeWindowClosed(id));
        }
        escrow.transition(EscrowState::Disputed)?;
        tracing::warn!(escrow = %id, by = %caller, "Escrow disputed");
        Ok(())
    }

    /// Return a disputed escrow's funds to the payer. Adjudicator only.
    ///
    /// Returns the amount refunded.
    ///
    /// # Errors
    /// - `Unauthorized` if `caller` is not the adjudicator
    /// - `NotDisputed` unless the escrow is `Disputed`
    pub fn refund(&mut self, ledger: &mut DepositLedger, id: EscrowId, caller: AccountId) -> Result<Decimal> {
        let escrow = self
            .escrows
            .get_mut(&id)
            .ok_or(LeadbidError::EscrowNotFound(id))?;
        if caller != self.adjudicator {
            return Err(LeadbidError::Unauthorized {
                reason: format!("only the adjudicator can refund escrow {id}"),
            });
        }
        if escrow.state != EscrowState::Disputed {
            return Err(LeadbidError::NotDisputed {
                escrow_id: id,
                state: escrow.state,
            });
        }
        ledger.refund_escrow(id, escrow.amount, escrow.payer)?;
        escrow.transition(EscrowState::Refunded)?;
        tracing::info!(escrow = %id, payer = %escrow.payer, amount = %escrow.amount, "Escrow refunded");
        Ok(escrow.amount)
    }

    /// Look up an escrow.
    ///
    /// # Errors
    /// Returns `EscrowNotFound` if the id is unknown.
    pub fn get(&self, id: EscrowId) -> Result<&Escrow> {
        self.escrows.get(&id).ok_or(LeadbidError::EscrowNotFound(id))
    }

    /// Iterate all escrows (unordered).
    pub fn iter(&self) -> impl Iterator<Item = &Escrow> {
        self.escrows.values()
    }

    #[must_use]
    pub fn fee_recipient(&self) -> AccountId {
        self.fee_recipient
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.escrows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.escrows.is_empty()
    }
}
