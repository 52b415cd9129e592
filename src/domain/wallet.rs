use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub, SubAssign};
use uuid::Uuid;

/// Represents a monetary value held in a wallet.
///
/// This is a wrapper around `rust_decimal::Decimal` to enforce domain-specific rules
/// and provide type safety for financial calculations.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl Add for Balance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Balance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Balance {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Balance {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

/// Currencies the disbursement rail supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Ugx,
    Kes,
    Rwf,
    Tzs,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Ugx => "UGX",
            Currency::Kes => "KES",
            Currency::Rwf => "RWF",
            Currency::Tzs => "TZS",
        }
    }

    /// Minor units per major unit on the PSP wire.
    ///
    /// UGX and RWF have no subunit in circulation; KES and TZS use cents.
    pub fn minor_per_major(&self) -> Decimal {
        match self {
            Currency::Ugx | Currency::Rwf => Decimal::ONE,
            Currency::Kes | Currency::Tzs => Decimal::from(100),
        }
    }

    /// Smallest amount, in minor units, the PSP accepts for this currency.
    pub fn min_payout_minor(&self) -> i64 {
        match self {
            Currency::Ugx => 1000,
            _ => 1,
        }
    }
}

/// A farmer's wallet, holding the balance accumulated from sales and tips.
///
/// Created lazily on first need, never deleted, only deactivated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub balance: Balance,
    pub currency: Currency,
    #[serde(default)]
    pub credit_score: u32,
    #[serde(default)]
    pub outstanding_loans: Balance,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Wallet {
    pub fn new(farmer_id: Uuid, currency: Currency) -> Self {
        Self {
            id: Uuid::new_v4(),
            farmer_id,
            balance: Balance::ZERO,
            currency,
            credit_score: 0,
            outstanding_loans: Balance::ZERO,
            active: true,
        }
    }

    /// Credits funds into the balance.
    pub fn credit(&mut self, amount: Balance) {
        self.balance += amount;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Withdrawal,
    Deposit,
}

/// Append-only ledger entry recording a wallet balance movement.
///
/// Written exactly once per successful payout debit; never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub tx_type: TransactionType,
    pub amount: Balance,
    pub balance_before: Balance,
    pub balance_after: Balance,
    /// Reference back to the payout that produced this entry.
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    pub fn withdrawal(wallet: &Wallet, balance_before: Balance, reference: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_id: wallet.id,
            tx_type: TransactionType::Withdrawal,
            amount: balance_before,
            balance_before,
            balance_after: Balance::ZERO,
            reference,
            created_at: Utc::now(),
        }
    }
}
