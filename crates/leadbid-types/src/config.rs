//! Configuration for a Leadbid marketplace instance.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{AccountId, LeadbidError, Result, constants};

/// Marketplace-wide settings read by the registry, bid store and escrow engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Bid deposit as a fraction of the reserve price, in basis points.
    #[serde(default = "default_deposit_bps")]
    pub deposit_bps: u32,
    /// Platform fee taken on escrow release, in basis points.
    #[serde(default = "default_fee_bps")]
    pub fee_bps: u32,
    /// Account that receives platform fees.
    pub fee_recipient: AccountId,
    /// The only account allowed to refund a disputed escrow.
    pub adjudicator: AccountId,
    /// Account that holds listed assets between listing and resolution.
    pub custodian: AccountId,
    /// Delay between funding and release, during which either party may dispute.
    #[serde(default = "default_release_delay_secs")]
    pub release_delay_secs: u64,
    /// Longest bidding window a seller may request.
    #[serde(default = "default_max_bidding_secs")]
    pub max_bidding_secs: u64,
    /// Longest reveal window a seller may request.
    #[serde(default = "default_max_reveal_secs")]
    pub max_reveal_secs: u64,
}

fn default_deposit_bps() -> u32 {
    constants::DEFAULT_DEPOSIT_BPS
}

fn default_fee_bps() -> u32 {
    constants::DEFAULT_FEE_BPS
}

fn default_release_delay_secs() -> u64 {
    constants::DEFAULT_RELEASE_DELAY_SECS
}

fn default_max_bidding_secs() -> u64 {
    constants::DEFAULT_MAX_BIDDING_SECS
}

fn default_max_reveal_secs() -> u64 {
    constants::DEFAULT_MAX_REVEAL_SECS
}

/// Upper bound on any configured duration: 10 years.
const MAX_CONFIG_SECS: u64 = 10 * 365 * 24 * 60 * 60;

impl MarketConfig {
    /// Defaults for every tunable, with the given role accounts.
    #[must_use]
    pub fn new(fee_recipient: AccountId, adjudicator: AccountId, custodian: AccountId) -> Self {
        Self {
            deposit_bps: constants::DEFAULT_DEPOSIT_BPS,
            fee_bps: constants::DEFAULT_FEE_BPS,
            fee_recipient,
            adjudicator,
            custodian,
            release_delay_secs: constants::DEFAULT_RELEASE_DELAY_SECS,
            max_bidding_secs: constants::DEFAULT_MAX_BIDDING_SECS,
            max_reveal_secs: constants::DEFAULT_MAX_REVEAL_SECS,
        }
    }

    /// Parse and validate a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| LeadbidError::Configuration(format!("invalid config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Reject configurations the engine cannot run safely with.
    pub fn validate(&self) -> Result<()> {
        if self.deposit_bps == 0 || self.deposit_bps > constants::BPS_DENOMINATOR {
            return Err(LeadbidError::Configuration(format!(
                "deposit_bps must be in 1..={}, got {}",
                constants::BPS_DENOMINATOR,
                self.deposit_bps
            )));
        }
        if self.fee_bps >= constants::BPS_DENOMINATOR {
            return Err(LeadbidError::Configuration(format!(
                "fee_bps must be below {}, got {}",
                constants::BPS_DENOMINATOR,
                self.fee_bps
            )));
        }
        for (name, secs) in [
            ("max_bidding_secs", self.max_bidding_secs),
            ("max_reveal_secs", self.max_reveal_secs),
        ] {
            if secs == 0 || secs > MAX_CONFIG_SECS {
                return Err(LeadbidError::Configuration(format!(
                    "{name} must be in 1..={MAX_CONFIG_SECS}, got {secs}"
                )));
            }
        }
        if self.release_delay_secs > MAX_CONFIG_SECS {
            return Err(LeadbidError::Configuration(format!(
                "release_delay_secs must be at most {MAX_CONFIG_SECS}, got {}",
                self.release_delay_secs
            )));
        }
        if self.custodian == self.fee_recipient || self.custodian == self.adjudicator {
            return Err(LeadbidError::Configuration(
                "custodian must be distinct from fee_recipient and adjudicator".into(),
            ));
        }
        Ok(())
    }
}
