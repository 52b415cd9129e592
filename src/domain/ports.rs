use crate::domain::farmer::Farmer;
use crate::domain::msisdn::Country;
use crate::domain::payout::Payout;
use crate::domain::wallet::{Balance, Currency, Wallet, WalletTransaction};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn store(&self, wallet: Wallet) -> Result<()>;
    async fn get(&self, wallet_id: Uuid) -> Result<Option<Wallet>>;
    /// Active wallets whose balance meets the payout threshold, in ascending
    /// wallet-id order so sweeps are deterministic.
    async fn eligible(&self, threshold: Balance) -> Result<Vec<Wallet>>;
    /// Conditionally zeroes the balance: succeeds only if the current balance
    /// still equals `expected`. Returns whether the debit was applied.
    async fn debit_exact(&self, wallet_id: Uuid, expected: Balance) -> Result<bool>;
}

#[async_trait]
pub trait FarmerStore: Send + Sync {
    async fn store(&self, farmer: Farmer) -> Result<()>;
    async fn get(&self, farmer_id: Uuid) -> Result<Option<Farmer>>;
}

#[async_trait]
pub trait PayoutStore: Send + Sync {
    async fn store(&self, payout: Payout) -> Result<()>;
    async fn get(&self, payout_id: Uuid) -> Result<Option<Payout>>;
    /// Failed payouts whose retry time has elapsed and whose retry budget is
    /// not exhausted, in ascending payout-id order.
    async fn retry_due(&self, now: DateTime<Utc>) -> Result<Vec<Payout>>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn append(&self, entry: WalletTransaction) -> Result<()>;
    async fn for_wallet(&self, wallet_id: Uuid) -> Result<Vec<WalletTransaction>>;
}

/// One disbursement instruction handed to the PSP gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutInstruction {
    pub farmer_id: Uuid,
    pub amount: Balance,
    pub currency: Currency,
    pub msisdn: String,
    pub country: Country,
    pub reference: String,
    pub description: String,
}

/// Normalized result of a payout initiation.
///
/// The gateway never surfaces transport or validation problems as errors;
/// every failure mode collapses into `Rejected` so callers handle exactly two
/// cases.
#[derive(Debug, Clone, PartialEq)]
pub enum InitiateOutcome {
    Accepted {
        psp_reference: String,
        status: String,
        estimated_arrival: Option<String>,
    },
    Rejected {
        reason: String,
    },
}

impl InitiateOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, InitiateOutcome::Accepted { .. })
    }
}

/// Normalized snapshot of a payout's state on the PSP side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutStatusSnapshot {
    pub reference: String,
    pub status: String,
    pub amount_minor: i64,
    pub currency: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

/// Aggregated result of a sequential batch submission.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    pub items: Vec<(String, InitiateOutcome)>,
}

#[async_trait]
pub trait PspGateway: Send + Sync {
    /// Initiates a mobile-money payout. Infallible at the type level: all
    /// failures are reported through `InitiateOutcome::Rejected`.
    async fn initiate(&self, instruction: &PayoutInstruction) -> InitiateOutcome;
    /// Fetches the PSP's view of a payout, or `None` on any failure.
    async fn check_status(&self, reference: &str) -> Option<PayoutStatusSnapshot>;
    /// Raw PSP balance/limits payload, or `None` on any failure.
    async fn balance(&self) -> Option<serde_json::Value>;
    /// Sequential batch submission with inter-call pacing.
    async fn send_batch(&self, instructions: &[PayoutInstruction]) -> BatchOutcome;
}

pub type WalletStoreBox = Box<dyn WalletStore>;
pub type FarmerStoreBox = Box<dyn FarmerStore>;
pub type PayoutStoreBox = Box<dyn PayoutStore>;
pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type PspGatewayBox = Box<dyn PspGateway>;
