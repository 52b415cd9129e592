use crate::domain::msisdn::Country;
use crate::domain::wallet::{Balance, Currency};
use crate::error::PayoutError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Processing,
    Success,
    Failed,
    Cancelled,
}

impl PayoutStatus {
    /// A terminal payout is never mutated again.
    ///
    /// `Failed` is only terminal once the retry budget is exhausted, which is
    /// checked separately against `retry_count`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PayoutStatus::Success | PayoutStatus::Cancelled)
    }
}

/// Mobile-money destination of a disbursement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub msisdn: String,
    pub country: Country,
}

/// Durable record of one disbursement attempt.
///
/// Retries mutate the same record rather than creating a new one; the payout
/// id doubles as the idempotent PSP reference across attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub wallet_id: Uuid,
    pub amount: Balance,
    pub currency: Currency,
    pub destination: Destination,
    pub status: PayoutStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub psp_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub initiated_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Backoff before retry number `retry_count + 1`: 1h, 3h, 9h.
pub fn backoff_delay(retry_count: u32) -> Duration {
    Duration::hours(3i64.pow(retry_count))
}

impl Payout {
    pub fn new(
        farmer_id: Uuid,
        wallet_id: Uuid,
        amount: Balance,
        currency: Currency,
        destination: Destination,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            farmer_id,
            wallet_id,
            amount,
            currency,
            destination,
            status: PayoutStatus::Pending,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            next_retry_at: None,
            psp_reference: None,
            failure_reason: None,
            initiated_at: Utc::now(),
            executed_at: None,
            completed_at: None,
        }
    }

    /// The reference sent to the PSP, stable across retries.
    pub fn reference(&self) -> String {
        self.id.to_string()
    }

    fn guard_mutable(&self) -> Result<(), PayoutError> {
        if self.status.is_terminal() {
            return Err(PayoutError::ValidationError(format!(
                "payout {} is terminal ({:?}) and cannot transition",
                self.id, self.status
            )));
        }
        Ok(())
    }

    /// Records a successful initiation: the PSP accepted the disbursement and
    /// will settle it asynchronously.
    pub fn mark_processing(&mut self, psp_reference: String) -> Result<(), PayoutError> {
        self.guard_mutable()?;
        self.status = PayoutStatus::Processing;
        self.psp_reference = Some(psp_reference);
        self.executed_at = Some(Utc::now());
        self.failure_reason = None;
        self.next_retry_at = None;
        Ok(())
    }

    /// Records a rejected or errored initiation and schedules the next retry
    /// with exponential backoff, if the retry budget allows one.
    pub fn mark_failed(&mut self, reason: String, first_attempt: bool) -> Result<(), PayoutError> {
        self.guard_mutable()?;
        self.status = PayoutStatus::Failed;
        self.failure_reason = Some(reason);
        if !first_attempt && self.retry_count < self.max_retries {
            self.retry_count += 1;
        }
        self.next_retry_at = if self.retry_count < self.max_retries {
            Some(Utc::now() + backoff_delay(self.retry_count))
        } else {
            None
        };
        Ok(())
    }

    /// Final settlement confirmation, normally driven by the PSP webhook.
    pub fn mark_success(&mut self) -> Result<(), PayoutError> {
        self.guard_mutable()?;
        self.status = PayoutStatus::Success;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Manual out-of-band cancellation.
    pub fn cancel(&mut self) -> Result<(), PayoutError> {
        self.guard_mutable()?;
        self.status = PayoutStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Whether the retry pass should pick this payout up at `now`.
    pub fn retry_due(&self, now: DateTime<Utc>) -> bool {
        self.status == PayoutStatus::Failed
            && self.retry_count < self.max_retries
            && self.next_retry_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn payout() -> Payout {
        Payout::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Balance::new(dec!(60000)),
            Currency::Ugx,
            Destination {
                msisdn: "+256701234567".to_string(),
                country: Country::Uganda,
            },
        )
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut p = payout();
        assert_eq!(p.status, PayoutStatus::Pending);

        p.mark_processing("MM-123".to_string()).unwrap();
        assert_eq!(p.status, PayoutStatus::Processing);
        assert_eq!(p.psp_reference.as_deref(), Some("MM-123"));
        assert!(p.executed_at.is_some());

        p.mark_success().unwrap();
        assert_eq!(p.status, PayoutStatus::Success);
        assert!(p.completed_at.is_some());
    }

    #[test]
    fn test_terminal_payouts_reject_transitions() {
        let mut p = payout();
        p.mark_processing("MM-123".to_string()).unwrap();
        p.mark_success().unwrap();

        assert!(p.mark_failed("late failure".to_string(), false).is_err());
        assert!(p.mark_processing("MM-456".to_string()).is_err());
        assert!(p.cancel().is_err());
    }

    #[test]
    fn test_backoff_schedule() {
        let mut p = payout();
        let now = Utc::now();

        // First failure: retry_count stays 0, retry in ~1 hour.
        p.mark_failed("insufficient PSP liquidity".to_string(), true)
            .unwrap();
        assert_eq!(p.retry_count, 0);
        let at = p.next_retry_at.unwrap();
        assert!(at > now + Duration::minutes(59) && at < now + Duration::minutes(61));

        // Second failure (first retry): retry_count 1, retry in ~3 hours.
        p.mark_failed("still failing".to_string(), false).unwrap();
        assert_eq!(p.retry_count, 1);
        let at = p.next_retry_at.unwrap();
        assert!(at > now + Duration::minutes(179) && at < now + Duration::minutes(181));

        // Third failure: retry_count 2, retry in ~9 hours.
        p.mark_failed("still failing".to_string(), false).unwrap();
        assert_eq!(p.retry_count, 2);
        let at = p.next_retry_at.unwrap();
        assert!(at > now + Duration::minutes(539) && at < now + Duration::minutes(541));

        // Fourth failure exhausts the budget: no further retry scheduled.
        p.mark_failed("still failing".to_string(), false).unwrap();
        assert_eq!(p.retry_count, 3);
        assert!(p.next_retry_at.is_none());
        assert!(!p.retry_due(Utc::now() + Duration::days(365)));
    }

    #[test]
    fn test_retry_due_windows() {
        let mut p = payout();
        p.mark_failed("rejected".to_string(), true).unwrap();

        assert!(!p.retry_due(Utc::now()));
        assert!(p.retry_due(Utc::now() + Duration::hours(2)));
    }

    #[test]
    fn test_processing_clears_failure_state() {
        let mut p = payout();
        p.mark_failed("rejected".to_string(), true).unwrap();
        p.mark_processing("MM-123".to_string()).unwrap();

        assert!(p.failure_reason.is_none());
        assert!(p.next_retry_at.is_none());
    }
}
