use crate::domain::farmer::Farmer;
use crate::domain::payout::{Destination, Payout, PayoutStatus};
use crate::domain::ports::{
    FarmerStoreBox, InitiateOutcome, LedgerStoreBox, PayoutInstruction, PayoutStoreBox,
    PspGatewayBox, WalletStoreBox,
};
use crate::domain::wallet::{Balance, Wallet, WalletTransaction};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Tuning for one sweep.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Wallets at or above this balance are swept.
    pub min_payout_threshold: Decimal,
    /// Pause between consecutive wallets and retries, to pace PSP load.
    pub pacing: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            min_payout_threshold: dec!(50000),
            pacing: Duration::from_millis(500),
        }
    }
}

/// Outcome for one wallet or retried payout within a sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    pub wallet_id: Uuid,
    pub farmer_id: Option<Uuid>,
    pub payout_id: Option<Uuid>,
    pub amount: Option<Balance>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The job's only externally observable output besides state mutations.
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub timestamp: DateTime<Utc>,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<SweepResult>,
    pub retries_processed: usize,
}

/// Orchestrates the daily payout sweep.
///
/// One invocation makes two passes: new payouts for wallets over the
/// threshold, then retries for previously failed payouts whose backoff has
/// elapsed. Wallets are processed strictly sequentially; the only business
/// rules here are the threshold and the retry policy.
pub struct PayoutScheduler {
    wallets: WalletStoreBox,
    farmers: FarmerStoreBox,
    payouts: PayoutStoreBox,
    ledger: LedgerStoreBox,
    gateway: PspGatewayBox,
    config: SweepConfig,
}

impl PayoutScheduler {
    pub fn new(
        wallets: WalletStoreBox,
        farmers: FarmerStoreBox,
        payouts: PayoutStoreBox,
        ledger: LedgerStoreBox,
        gateway: PspGatewayBox,
        config: SweepConfig,
    ) -> Self {
        Self {
            wallets,
            farmers,
            payouts,
            ledger,
            gateway,
            config,
        }
    }

    /// Runs one full sweep and returns its summary.
    ///
    /// Per-wallet and per-retry failures are recorded and skipped so one bad
    /// record cannot abort the sweep; only setup failures (the initial store
    /// queries) propagate as errors.
    pub async fn sweep(&self) -> Result<SweepSummary> {
        let started = Utc::now();
        let eligible = self
            .wallets
            .eligible(Balance::new(self.config.min_payout_threshold))
            .await?;
        info!(wallets = eligible.len(), "starting payout sweep");

        let mut results = Vec::with_capacity(eligible.len());
        for (i, wallet) in eligible.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.pacing).await;
            }
            let result = match self.process_wallet(wallet).await {
                Ok(result) => result,
                Err(e) => {
                    error!(wallet_id = %wallet.id, error = %e, "wallet processing aborted");
                    SweepResult {
                        wallet_id: wallet.id,
                        farmer_id: Some(wallet.farmer_id),
                        payout_id: None,
                        amount: Some(wallet.balance),
                        status: "failed".to_string(),
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(result);
        }

        let processed = results.len();
        let successful = results.iter().filter(|r| r.status == "processing").count();
        let failed = processed - successful;

        let retries_processed = self.retry_pass(&mut results).await?;

        info!(
            processed, successful, failed, retries_processed,
            "payout sweep finished"
        );
        Ok(SweepSummary {
            timestamp: started,
            processed,
            successful,
            failed,
            results,
            retries_processed,
        })
    }

    /// First-attempt path: creates the payout record and runs the shared
    /// initiation transition.
    async fn process_wallet(&self, wallet: &Wallet) -> Result<SweepResult> {
        let farmer = self.farmers.get(wallet.farmer_id).await?;
        let Some(farmer) = farmer else {
            warn!(wallet_id = %wallet.id, "wallet has no farmer record");
            return Ok(SweepResult {
                wallet_id: wallet.id,
                farmer_id: None,
                payout_id: None,
                amount: Some(wallet.balance),
                status: "failed".to_string(),
                error: Some("Farmer not found".to_string()),
            });
        };
        let Some(msisdn) = farmer.phone_number.clone() else {
            warn!(wallet_id = %wallet.id, farmer_id = %farmer.id, "farmer has no phone number");
            return Ok(SweepResult {
                wallet_id: wallet.id,
                farmer_id: Some(farmer.id),
                payout_id: None,
                amount: Some(wallet.balance),
                status: "failed".to_string(),
                error: Some("Phone number not configured".to_string()),
            });
        };

        let mut payout = Payout::new(
            farmer.id,
            wallet.id,
            wallet.balance,
            wallet.currency,
            Destination {
                msisdn,
                country: farmer.country,
            },
        );
        self.payouts.store(payout.clone()).await?;

        self.attempt(&mut payout, &farmer, true).await?;

        Ok(SweepResult {
            wallet_id: wallet.id,
            farmer_id: Some(farmer.id),
            payout_id: Some(payout.id),
            amount: Some(payout.amount),
            status: status_label(&payout),
            error: payout.failure_reason.clone(),
        })
    }

    /// Second pass: re-drives previously failed payouts whose backoff has
    /// elapsed, through the same attempt transition as first attempts.
    async fn retry_pass(&self, results: &mut Vec<SweepResult>) -> Result<usize> {
        let due = self.payouts.retry_due(Utc::now()).await?;
        info!(retries = due.len(), "starting retry pass");

        let mut processed = 0;
        for mut payout in due {
            if processed > 0 {
                tokio::time::sleep(self.config.pacing).await;
            }
            processed += 1;

            let farmer = match self.farmers.get(payout.farmer_id).await {
                Ok(Some(farmer)) => farmer,
                Ok(None) => {
                    warn!(payout_id = %payout.id, "retry skipped: farmer record gone");
                    continue;
                }
                Err(e) => {
                    error!(payout_id = %payout.id, error = %e, "retry aborted");
                    continue;
                }
            };

            if let Err(e) = self.attempt(&mut payout, &farmer, false).await {
                error!(payout_id = %payout.id, error = %e, "retry aborted");
                continue;
            }

            results.push(SweepResult {
                wallet_id: payout.wallet_id,
                farmer_id: Some(payout.farmer_id),
                payout_id: Some(payout.id),
                amount: Some(payout.amount),
                status: status_label(&payout),
                error: payout.failure_reason.clone(),
            });
        }
        Ok(processed)
    }

    /// The single initiate-and-record transition, shared by first attempts
    /// and retries so the two paths cannot drift apart.
    ///
    /// The wallet debit and ledger entry are tied to a successful first
    /// attempt; a retry success transitions the payout record only.
    async fn attempt(&self, payout: &mut Payout, farmer: &Farmer, first_attempt: bool) -> Result<()> {
        let instruction = PayoutInstruction {
            farmer_id: farmer.id,
            amount: payout.amount,
            currency: payout.currency,
            msisdn: payout.destination.msisdn.clone(),
            country: payout.destination.country,
            reference: payout.reference(),
            description: format!("Coffee sales payout for {}", farmer.name),
        };

        match self.gateway.initiate(&instruction).await {
            InitiateOutcome::Accepted { psp_reference, .. } => {
                payout.mark_processing(psp_reference)?;
                self.payouts.store(payout.clone()).await?;
                info!(payout_id = %payout.id, wallet_id = %payout.wallet_id, "payout initiated");

                if first_attempt {
                    self.debit_and_record(payout).await?;
                }
            }
            InitiateOutcome::Rejected { reason } => {
                warn!(payout_id = %payout.id, %reason, "payout initiation failed");
                payout.mark_failed(reason, first_attempt)?;
                self.payouts.store(payout.clone()).await?;
            }
        }
        Ok(())
    }

    /// Debits the wallet to zero, conditionally on the balance still matching
    /// the payout amount, and appends the ledger entry exactly once.
    async fn debit_and_record(&self, payout: &Payout) -> Result<()> {
        let applied = self.wallets.debit_exact(payout.wallet_id, payout.amount).await?;
        if !applied {
            // The balance moved between the eligibility query and the debit;
            // the disbursement went out, so this needs operator attention.
            error!(
                payout_id = %payout.id,
                wallet_id = %payout.wallet_id,
                "wallet balance changed mid-sweep; debit not applied"
            );
            return Ok(());
        }

        let Some(wallet) = self.wallets.get(payout.wallet_id).await? else {
            return Ok(());
        };
        let entry = WalletTransaction::withdrawal(&wallet, payout.amount, payout.id.to_string());
        self.ledger.append(entry).await?;
        Ok(())
    }
}

fn status_label(payout: &Payout) -> String {
    match payout.status {
        PayoutStatus::Pending => "pending",
        PayoutStatus::Processing => "processing",
        PayoutStatus::Success => "success",
        PayoutStatus::Failed => "failed",
        PayoutStatus::Cancelled => "cancelled",
    }
    .to_string()
}
