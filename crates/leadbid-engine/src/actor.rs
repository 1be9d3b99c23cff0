//! Single-writer actor around the [`Marketplace`].
//!
//! One tokio task owns the marketplace and applies commands one at a time
//! in the order they arrive on its channel. Callers hold a cheap,
//! cloneable [`EngineHandle`] and get each result back over a oneshot.
//! Concurrent callers therefore never observe a half-applied operation,
//! and racing duplicate calls (two `release_escrow`s, say) are simply
//! applied one after the other, the second one failing on the state check.

use leadbid_bidding::AssetRegistry;
use leadbid_settlement::ReleaseReceipt;
use leadbid_types::{
    AccountId, BalanceEntry, Bid, BidOrigin, BidStatus, BuyerPreferences, Commitment, Escrow,
    EscrowId, EventRecord, LeadbidError, Listing, ListingId, ListingParams, Resolution, Result,
    Salt, constants,
};
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};

use crate::marketplace::{ListingAudit, Marketplace};

type Reply<T> = oneshot::Sender<Result<T>>;

/// Requests understood by the engine task.
enum Command {
    Credit {
        account: AccountId,
        amount: Decimal,
        reply: Reply<()>,
    },
    Withdraw {
        account: AccountId,
        amount: Decimal,
        reply: Reply<()>,
    },
    SetPreferences {
        buyer: AccountId,
        preferences: BuyerPreferences,
        reply: Reply<()>,
    },
    CreateListing {
        seller: AccountId,
        params: ListingParams,
        reply: Reply<ListingId>,
    },
    CommitBid {
        listing_id: ListingId,
        bidder: AccountId,
        commitment: Commitment,
        origin: BidOrigin,
        reply: Reply<Decimal>,
    },
    RevealBid {
        listing_id: ListingId,
        bidder: AccountId,
        amount: Decimal,
        salt: Salt,
        reply: Reply<BidStatus>,
    },
    WithdrawBid {
        listing_id: ListingId,
        bidder: AccountId,
        reply: Reply<Decimal>,
    },
    ResolveAuction {
        listing_id: ListingId,
        reply: Reply<Resolution>,
    },
    BuyNow {
        listing_id: ListingId,
        buyer: AccountId,
        reply: Reply<EscrowId>,
    },
    FundEscrow {
        escrow_id: EscrowId,
        caller: AccountId,
        amount: Decimal,
        reply: Reply<()>,
    },
    ReleaseEscrow {
        escrow_id: EscrowId,
        reply: Reply<ReleaseReceipt>,
    },
    DisputeEscrow {
        escrow_id: EscrowId,
        caller: AccountId,
        reply: Reply<()>,
    },
    RefundEscrow {
        escrow_id: EscrowId,
        caller: AccountId,
        reply: Reply<Decimal>,
    },
    AuditListing {
        listing_id: ListingId,
        reply: Reply<ListingAudit>,
    },
    GetListing {
        listing_id: ListingId,
        reply: Reply<Listing>,
    },
    GetBid {
        listing_id: ListingId,
        bidder: AccountId,
        reply: Reply<Option<Bid>>,
    },
    GetEscrow {
        escrow_id: EscrowId,
        reply: Reply<Escrow>,
    },
    Balance {
        account: AccountId,
        reply: Reply<BalanceEntry>,
    },
    VerifySupply {
        reply: Reply<()>,
    },
    DrainEvents {
        reply: Reply<Vec<EventRecord>>,
    },
}

impl Command {
    /// Apply to the marketplace and answer the caller. A caller that gave
    /// up waiting is ignored.
    fn apply<A: AssetRegistry>(self, market: &mut Marketplace<A>) {
        match self {
            Self::Credit {
                account,
                amount,
                reply,
            } => {
                let _ = reply.send(market.credit(account, amount));
            }
            Self::Withdraw {
                account,
                amount,
                reply,
            } => {
                let _ = reply.send(market.withdraw(account, amount));
            }
            Self::SetPreferences {
                buyer,
                preferences,
                reply,
            } => {
                market.set_preferences(buyer, preferences);
                let _ = reply.send(Ok(()));
            }
            Self::CreateListing {
                seller,
                params,
                reply,
            } => {
                let _ = reply.send(market.create_listing(seller, params));
            }
            Self::CommitBid {
                listing_id,
                bidder,
                commitment,
                origin,
                reply,
            } => {
                let _ = reply.send(market.commit_bid(listing_id, bidder, commitment, origin));
            }
            Self::RevealBid {
                listing_id,
                bidder,
                amount,
                salt,
                reply,
            } => {
                let _ = reply.send(market.reveal_bid(listing_id, bidder, amount, &salt));
            }
            Self::WithdrawBid {
                listing_id,
                bidder,
                reply,
            } => {
                let _ = reply.send(market.withdraw_bid(listing_id, bidder));
            }
            Self::ResolveAuction { listing_id, reply } => {
                let _ = reply.send(market.resolve_auction(listing_id));
            }
            Self::BuyNow {
                listing_id,
                buyer,
                reply,
            } => {
                let _ = reply.send(market.buy_now(listing_id, buyer));
            }
            Self::FundEscrow {
                escrow_id,
                caller,
                amount,
                reply,
            } => {
                let _ = reply.send(market.fund_escrow(escrow_id, caller, amount));
            }
            Self::ReleaseEscrow { escrow_id, reply } => {
                let _ = reply.send(market.release_escrow(escrow_id));
            }
            Self::DisputeEscrow {
                escrow_id,
                caller,
                reply,
            } => {
                let _ = reply.send(market.dispute_escrow(escrow_id, caller));
            }
            Self::RefundEscrow {
                escrow_id,
                caller,
                reply,
            } => {
                let _ = reply.send(market.refund_escrow(escrow_id, caller));
            }
            Self::AuditListing { listing_id, reply } => {
                let _ = reply.send(market.audit_listing(listing_id));
            }
            Self::GetListing { listing_id, reply } => {
                let _ = reply.send(market.listing(listing_id));
            }
            Self::GetBid {
                listing_id,
                bidder,
                reply,
            } => {
                let _ = reply.send(Ok(market.bid(listing_id, bidder)));
            }
            Self::GetEscrow { escrow_id, reply } => {
                let _ = reply.send(market.escrow(escrow_id));
            }
            Self::Balance { account, reply } => {
                let _ = reply.send(Ok(market.balance(account)));
            }
            Self::VerifySupply { reply } => {
                let _ = reply.send(market.verify_supply());
            }
            Self::DrainEvents { reply } => {
                let _ = reply.send(Ok(market.drain_events()));
            }
        }
    }
}

/// Cloneable handle to the engine task.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
}

impl EngineHandle {
    /// Move the marketplace onto its own task with the default command
    /// buffer.
    #[must_use]
    pub fn spawn<A>(market: Marketplace<A>) -> Self
    where
        A: AssetRegistry + 'static,
    {
        Self::spawn_with_buffer(market, constants::DEFAULT_COMMAND_BUFFER)
    }

    /// Move the marketplace onto its own task. The task stops once every
    /// handle is dropped.
    #[must_use]
    pub fn spawn_with_buffer<A>(mut market: Marketplace<A>, buffer: usize) -> Self
    where
        A: AssetRegistry + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Command>(buffer.max(1));
        tokio::spawn(async move {
            tracing::info!(
                engine = constants::ENGINE_NAME,
                version = constants::VERSION,
                "Engine task started"
            );
            while let Some(command) = rx.recv().await {
                command.apply(&mut market);
            }
            tracing::info!("Engine task stopped");
        });
        Self { tx }
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| LeadbidError::EngineUnavailable)?;
        rx.await.map_err(|_| LeadbidError::EngineUnavailable)?
    }

    /// # Errors
    /// See [`Marketplace::credit`]; `EngineUnavailable` if the task is gone.
    pub async fn credit(&self, account: AccountId, amount: Decimal) -> Result<()> {
        self.request(|reply| Command::Credit {
            account,
            amount,
            reply,
        })
        .await
    }

    /// # Errors
    /// See [`Marketplace::withdraw`].
    pub async fn withdraw(&self, account: AccountId, amount: Decimal) -> Result<()> {
        self.request(|reply| Command::Withdraw {
            account,
            amount,
            reply,
        })
        .await
    }

    /// # Errors
    /// `EngineUnavailable` if the task is gone.
    pub async fn set_preferences(&self, buyer: AccountId, preferences: BuyerPreferences) -> Result<()> {
        self.request(|reply| Command::SetPreferences {
            buyer,
            preferences,
            reply,
        })
        .await
    }

    /// # Errors
    /// See [`Marketplace::create_listing`].
    pub async fn create_listing(&self, seller: AccountId, params: ListingParams) -> Result<ListingId> {
        self.request(|reply| Command::CreateListing {
            seller,
            params,
            reply,
        })
        .await
    }

    /// # Errors
    /// See [`Marketplace::commit_bid`].
    pub async fn commit_bid(
        &self,
        listing_id: ListingId,
        bidder: AccountId,
        commitment: Commitment,
        origin: BidOrigin,
    ) -> Result<Decimal> {
        self.request(|reply| Command::CommitBid {
            listing_id,
            bidder,
            commitment,
            origin,
            reply,
        })
        .await
    }

    /// # Errors
    /// See [`Marketplace::reveal_bid`].
    pub async fn reveal_bid(
        &self,
        listing_id: ListingId,
        bidder: AccountId,
        amount: Decimal,
        salt: Salt,
    ) -> Result<BidStatus> {
        self.request(|reply| Command::RevealBid {
            listing_id,
            bidder,
            amount,
            salt,
            reply,
        })
        .await
    }

    /// # Errors
    /// See [`Marketplace::withdraw_bid`].
    pub async fn withdraw_bid(&self, listing_id: ListingId, bidder: AccountId) -> Result<Decimal> {
        self.request(|reply| Command::WithdrawBid {
            listing_id,
            bidder,
            reply,
        })
        .await
    }

    /// # Errors
    /// See [`Marketplace::resolve_auction`].
    pub async fn resolve_auction(&self, listing_id: ListingId) -> Result<Resolution> {
        self.request(|reply| Command::ResolveAuction { listing_id, reply })
            .await
    }

    /// # Errors
    /// See [`Marketplace::buy_now`].
    pub async fn buy_now(&self, listing_id: ListingId, buyer: AccountId) -> Result<EscrowId> {
        self.request(|reply| Command::BuyNow {
            listing_id,
            buyer,
            reply,
        })
        .await
    }

    /// # Errors
    /// See [`Marketplace::fund_escrow`].
    pub async fn fund_escrow(&self, escrow_id: EscrowId, caller: AccountId, amount: Decimal) -> Result<()> {
        self.request(|reply| Command::FundEscrow {
            escrow_id,
            caller,
            amount,
            reply,
        })
        .await
    }

    /// # Errors
    /// See [`Marketplace::release_escrow`].
    pub async fn release_escrow(&self, escrow_id: EscrowId) -> Result<ReleaseReceipt> {
        self.request(|reply| Command::ReleaseEscrow { escrow_id, reply })
            .await
    }

    /// # Errors
    /// See [`Marketplace::dispute_escrow`].
    pub async fn dispute_escrow(&self, escrow_id: EscrowId, caller: AccountId) -> Result<()> {
        self.request(|reply| Command::DisputeEscrow {
            escrow_id,
            caller,
            reply,
        })
        .await
    }

    /// # Errors
    /// See [`Marketplace::refund_escrow`].
    pub async fn refund_escrow(&self, escrow_id: EscrowId, caller: AccountId) -> Result<Decimal> {
        self.request(|reply| Command::RefundEscrow {
            escrow_id,
            caller,
            reply,
        })
        .await
    }

    /// # Errors
    /// See [`Marketplace::audit_listing`].
    pub async fn audit_listing(&self, listing_id: ListingId) -> Result<ListingAudit> {
        self.request(|reply| Command::AuditListing { listing_id, reply })
            .await
    }

    /// # Errors
    /// `ListingNotFound`, or `EngineUnavailable`.
    pub async fn listing(&self, listing_id: ListingId) -> Result<Listing> {
        self.request(|reply| Command::GetListing { listing_id, reply })
            .await
    }

    /// # Errors
    /// `EngineUnavailable` if the task is gone.
    pub async fn bid(&self, listing_id: ListingId, bidder: AccountId) -> Result<Option<Bid>> {
        self.request(|reply| Command::GetBid {
            listing_id,
            bidder,
            reply,
        })
        .await
    }

    /// # Errors
    /// `EscrowNotFound`, or `EngineUnavailable`.
    pub async fn escrow(&self, escrow_id: EscrowId) -> Result<Escrow> {
        self.request(|reply| Command::GetEscrow { escrow_id, reply })
            .await
    }

    /// # Errors
    /// `EngineUnavailable` if the task is gone.
    pub async fn balance(&self, account: AccountId) -> Result<BalanceEntry> {
        self.request(|reply| Command::Balance { account, reply })
            .await
    }

    /// # Errors
    /// `SupplyInvariantViolation`, or `EngineUnavailable`.
    pub async fn verify_supply(&self) -> Result<()> {
        self.request(|reply| Command::VerifySupply { reply }).await
    }

    /// # Errors
    /// `EngineUnavailable` if the task is gone.
    pub async fn drain_events(&self) -> Result<Vec<EventRecord>> {
        self.request(|reply| Command::DrainEvents { reply }).await
    }
}
