use crate::domain::farmer::Farmer;
use crate::domain::payout::Payout;
use crate::domain::ports::{FarmerStore, LedgerStore, PayoutStore, WalletStore};
use crate::domain::wallet::{Balance, Wallet, WalletTransaction};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory store for wallets.
///
/// Uses `Arc<RwLock<HashMap>>` to allow shared concurrent access. Ideal for
/// testing or for driving a sweep from a seed file.
#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    wallets: Arc<RwLock<HashMap<Uuid, Wallet>>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn store(&self, wallet: Wallet) -> Result<()> {
        let mut wallets = self.wallets.write().await;
        wallets.insert(wallet.id, wallet);
        Ok(())
    }

    async fn get(&self, wallet_id: Uuid) -> Result<Option<Wallet>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.get(&wallet_id).cloned())
    }

    async fn eligible(&self, threshold: Balance) -> Result<Vec<Wallet>> {
        let wallets = self.wallets.read().await;
        let mut eligible: Vec<Wallet> = wallets
            .values()
            .filter(|w| w.active && w.balance >= threshold)
            .cloned()
            .collect();
        eligible.sort_by_key(|w| w.id);
        Ok(eligible)
    }

    async fn debit_exact(&self, wallet_id: Uuid, expected: Balance) -> Result<bool> {
        // Compare-and-swap under the write lock: the debit applies only if
        // the balance is still what the caller observed.
        let mut wallets = self.wallets.write().await;
        match wallets.get_mut(&wallet_id) {
            Some(wallet) if wallet.balance == expected => {
                wallet.balance = Balance::ZERO;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// A thread-safe in-memory store for farmer records.
#[derive(Default, Clone)]
pub struct InMemoryFarmerStore {
    farmers: Arc<RwLock<HashMap<Uuid, Farmer>>>,
}

impl InMemoryFarmerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FarmerStore for InMemoryFarmerStore {
    async fn store(&self, farmer: Farmer) -> Result<()> {
        let mut farmers = self.farmers.write().await;
        farmers.insert(farmer.id, farmer);
        Ok(())
    }

    async fn get(&self, farmer_id: Uuid) -> Result<Option<Farmer>> {
        let farmers = self.farmers.read().await;
        Ok(farmers.get(&farmer_id).cloned())
    }
}

/// A thread-safe in-memory store for payout records.
#[derive(Default, Clone)]
pub struct InMemoryPayoutStore {
    payouts: Arc<RwLock<HashMap<Uuid, Payout>>>,
}

impl InMemoryPayoutStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PayoutStore for InMemoryPayoutStore {
    async fn store(&self, payout: Payout) -> Result<()> {
        let mut payouts = self.payouts.write().await;
        payouts.insert(payout.id, payout);
        Ok(())
    }

    async fn get(&self, payout_id: Uuid) -> Result<Option<Payout>> {
        let payouts = self.payouts.read().await;
        Ok(payouts.get(&payout_id).cloned())
    }

    async fn retry_due(&self, now: DateTime<Utc>) -> Result<Vec<Payout>> {
        let payouts = self.payouts.read().await;
        let mut due: Vec<Payout> = payouts
            .values()
            .filter(|p| p.retry_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|p| p.id);
        Ok(due)
    }
}

/// An append-only in-memory ledger.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    entries: Arc<RwLock<Vec<WalletTransaction>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn append(&self, entry: WalletTransaction) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        Ok(())
    }

    async fn for_wallet(&self, wallet_id: Uuid) -> Result<Vec<WalletTransaction>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.wallet_id == wallet_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::msisdn::Country;
    use crate::domain::payout::Destination;
    use crate::domain::wallet::Currency;
    use rust_decimal_macros::dec;

    fn wallet_with_balance(balance: Balance) -> Wallet {
        let mut wallet = Wallet::new(Uuid::new_v4(), Currency::Ugx);
        wallet.credit(balance);
        wallet
    }

    #[tokio::test]
    async fn test_wallet_store_and_retrieve() {
        let store = InMemoryWalletStore::new();
        let wallet = wallet_with_balance(Balance::new(dec!(100.0)));

        store.store(wallet.clone()).await.unwrap();
        let retrieved = store.get(wallet.id).await.unwrap().unwrap();
        assert_eq!(retrieved, wallet);

        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eligible_filters_threshold_and_inactive() {
        let store = InMemoryWalletStore::new();
        let rich = wallet_with_balance(Balance::new(dec!(60000)));
        let poor = wallet_with_balance(Balance::new(dec!(10000)));
        let mut inactive = wallet_with_balance(Balance::new(dec!(90000)));
        inactive.active = false;

        store.store(rich.clone()).await.unwrap();
        store.store(poor).await.unwrap();
        store.store(inactive).await.unwrap();

        let eligible = store.eligible(Balance::new(dec!(50000))).await.unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, rich.id);
    }

    #[tokio::test]
    async fn test_debit_exact_is_conditional() {
        let store = InMemoryWalletStore::new();
        let wallet = wallet_with_balance(Balance::new(dec!(60000)));
        store.store(wallet.clone()).await.unwrap();

        // Stale expectation: no debit.
        let applied = store
            .debit_exact(wallet.id, Balance::new(dec!(50000)))
            .await
            .unwrap();
        assert!(!applied);
        assert_eq!(
            store.get(wallet.id).await.unwrap().unwrap().balance,
            Balance::new(dec!(60000))
        );

        // Matching expectation: balance zeroed.
        let applied = store
            .debit_exact(wallet.id, Balance::new(dec!(60000)))
            .await
            .unwrap();
        assert!(applied);
        assert_eq!(
            store.get(wallet.id).await.unwrap().unwrap().balance,
            Balance::ZERO
        );

        // Second debit against the old balance cannot apply.
        let applied = store
            .debit_exact(wallet.id, Balance::new(dec!(60000)))
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn test_payout_store_retry_due() {
        let store = InMemoryPayoutStore::new();
        let mut failed = Payout::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Balance::new(dec!(60000)),
            Currency::Ugx,
            Destination {
                msisdn: "+256701234567".to_string(),
                country: Country::Uganda,
            },
        );
        failed.mark_failed("rejected".to_string(), true).unwrap();
        store.store(failed.clone()).await.unwrap();

        let now = Utc::now();
        assert!(store.retry_due(now).await.unwrap().is_empty());

        let later = now + chrono::Duration::hours(2);
        let due = store.retry_due(later).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, failed.id);
    }

    #[tokio::test]
    async fn test_ledger_append_and_query() {
        let ledger = InMemoryLedger::new();
        let wallet = wallet_with_balance(Balance::new(dec!(60000)));
        let entry = WalletTransaction::withdrawal(
            &wallet,
            Balance::new(dec!(60000)),
            "ref-1".to_string(),
        );

        ledger.append(entry.clone()).await.unwrap();
        let entries = ledger.for_wallet(wallet.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], entry);

        assert!(ledger.for_wallet(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
