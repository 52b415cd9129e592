use async_trait::async_trait;
use harvestpay::application::scheduler::{PayoutScheduler, SweepConfig};
use harvestpay::domain::farmer::Farmer;
use harvestpay::domain::msisdn::Country;
use harvestpay::domain::ports::{
    BatchOutcome, InitiateOutcome, PayoutInstruction, PayoutStatusSnapshot, PspGateway,
};
use harvestpay::domain::wallet::{Balance, Currency, Wallet};
use harvestpay::infrastructure::in_memory::{
    InMemoryFarmerStore, InMemoryLedger, InMemoryPayoutStore, InMemoryWalletStore,
};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Scripted PSP gateway: pops the next outcome off a queue for every initiate
/// call and records the instructions it saw. Once the script is exhausted it
/// accepts everything.
#[derive(Clone, Default)]
pub struct MockPsp {
    script: Arc<Mutex<VecDeque<InitiateOutcome>>>,
    pub calls: Arc<Mutex<Vec<PayoutInstruction>>>,
}

impl MockPsp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_accept(&self, reference: &str) {
        self.script.lock().unwrap().push_back(InitiateOutcome::Accepted {
            psp_reference: reference.to_string(),
            status: "accepted".to_string(),
            estimated_arrival: Some("T+1".to_string()),
        });
    }

    pub fn push_reject(&self, reason: &str) {
        self.script.lock().unwrap().push_back(InitiateOutcome::Rejected {
            reason: reason.to_string(),
        });
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PspGateway for MockPsp {
    async fn initiate(&self, instruction: &PayoutInstruction) -> InitiateOutcome {
        self.calls.lock().unwrap().push(instruction.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| InitiateOutcome::Accepted {
                psp_reference: format!("MM-{}", instruction.reference),
                status: "accepted".to_string(),
                estimated_arrival: None,
            })
    }

    async fn check_status(&self, _reference: &str) -> Option<PayoutStatusSnapshot> {
        None
    }

    async fn balance(&self) -> Option<serde_json::Value> {
        None
    }

    async fn send_batch(&self, instructions: &[PayoutInstruction]) -> BatchOutcome {
        let mut items = Vec::new();
        for instruction in instructions {
            items.push((
                instruction.reference.clone(),
                self.initiate(instruction).await,
            ));
        }
        BatchOutcome {
            batch_id: Uuid::new_v4(),
            items,
        }
    }
}

/// All the moving parts of a sweep, pre-wired with in-memory stores, zero
/// pacing, and a scripted gateway.
pub struct Harness {
    pub wallets: InMemoryWalletStore,
    pub farmers: InMemoryFarmerStore,
    pub payouts: InMemoryPayoutStore,
    pub ledger: InMemoryLedger,
    pub psp: MockPsp,
    pub scheduler: PayoutScheduler,
}

pub fn harness_with_threshold(threshold: Decimal) -> Harness {
    let wallets = InMemoryWalletStore::new();
    let farmers = InMemoryFarmerStore::new();
    let payouts = InMemoryPayoutStore::new();
    let ledger = InMemoryLedger::new();
    let psp = MockPsp::new();

    let scheduler = PayoutScheduler::new(
        Box::new(wallets.clone()),
        Box::new(farmers.clone()),
        Box::new(payouts.clone()),
        Box::new(ledger.clone()),
        Box::new(psp.clone()),
        SweepConfig {
            min_payout_threshold: threshold,
            pacing: Duration::ZERO,
        },
    );

    Harness {
        wallets,
        farmers,
        payouts,
        ledger,
        psp,
        scheduler,
    }
}

pub fn harness() -> Harness {
    harness_with_threshold(Decimal::from(50000))
}

/// Seeds one farmer and a UGX wallet with the given balance; returns both ids.
pub async fn seed_wallet(
    harness: &Harness,
    balance: Decimal,
    phone_number: Option<&str>,
) -> (Uuid, Uuid) {
    use harvestpay::domain::ports::{FarmerStore, WalletStore};

    let farmer = Farmer::new(
        "Akello Grace",
        phone_number.map(|p| p.to_string()),
        Country::Uganda,
    );
    let mut wallet = Wallet::new(farmer.id, Currency::Ugx);
    wallet.credit(Balance::new(balance));

    let farmer_id = farmer.id;
    let wallet_id = wallet.id;
    harness.farmers.store(farmer).await.unwrap();
    harness.wallets.store(wallet).await.unwrap();
    (farmer_id, wallet_id)
}
