use crate::domain::msisdn;
use crate::domain::ports::{
    BatchOutcome, InitiateOutcome, PayoutInstruction, PayoutStatusSnapshot, PspGateway,
};
use crate::domain::wallet::Currency;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Fixed pause between consecutive batch submissions, to stay inside the
/// PSP's rate limits.
pub const BATCH_PACING: Duration = Duration::from_millis(500);

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the Onafriq disbursement API.
#[derive(Debug, Clone)]
pub struct OnafriqConfig {
    pub api_key: String,
    pub client_id: String,
    pub base_url: String,
    /// Base URL this service is reachable at; the PSP posts settlement
    /// webhooks to `{webhook_base_url}/api/payouts/webhook`.
    pub webhook_base_url: String,
    pub request_timeout: Duration,
}

impl OnafriqConfig {
    pub fn new(api_key: String, client_id: String, base_url: String) -> Self {
        Self {
            api_key,
            client_id,
            base_url,
            webhook_base_url: String::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.client_id.is_empty() && !self.base_url.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    msisdn: &'a str,
    country: &'a str,
}

#[derive(Debug, Serialize)]
struct Notification {
    webhook_url: String,
}

#[derive(Debug, Serialize)]
struct InitiateRequest<'a> {
    amount: i64,
    currency: &'a str,
    recipient: Recipient<'a>,
    reference: &'a str,
    description: &'a str,
    metadata: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification: Option<Notification>,
}

#[derive(Debug, Deserialize)]
struct InitiateResponse {
    reference: String,
    status: String,
    estimated_arrival: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    reference: String,
    status: String,
    amount: i64,
    currency: String,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
    failure_reason: Option<String>,
}

/// HTTP client for the Onafriq mobile-money payout API.
///
/// Exception-safe at its boundary: transport and parse errors never escape as
/// `Err`; they are normalized into `Rejected`/`None` results.
pub struct OnafriqClient {
    config: OnafriqConfig,
    http: reqwest::Client,
}

impl OnafriqClient {
    pub fn new(config: OnafriqConfig) -> crate::error::Result<Self> {
        // Per-request timeout so a stalled PSP cannot stall a whole sweep.
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, http })
    }

    /// Converts a major-unit amount into the PSP's minor-unit wire amount.
    fn to_minor_units(amount: Decimal, currency: Currency) -> Option<i64> {
        (amount * currency.minor_per_major()).trunc().to_i64()
    }

    fn validate(&self, instruction: &PayoutInstruction) -> Result<(String, i64), String> {
        if !self.config.is_configured() {
            return Err("PSP credentials not configured".to_string());
        }

        let minor = Self::to_minor_units(instruction.amount.value(), instruction.currency)
            .ok_or_else(|| "Amount out of range".to_string())?;
        let min = instruction.currency.min_payout_minor();
        if minor < min {
            return Err(format!(
                "Amount below minimum payout of {} {} minor units",
                min,
                instruction.currency.code()
            ));
        }

        let normalized = msisdn::normalize(&instruction.msisdn);
        if msisdn::digit_count(&normalized) < msisdn::MIN_DIGITS {
            return Err(format!("Invalid mobile number: {}", instruction.msisdn));
        }

        Ok((
            msisdn::format_mobile_number(&normalized, instruction.country),
            minor,
        ))
    }

    fn notification(&self) -> Option<Notification> {
        if self.config.webhook_base_url.is_empty() {
            return None;
        }
        Some(Notification {
            webhook_url: format!("{}/api/payouts/webhook", self.config.webhook_base_url),
        })
    }

    async fn post_initiate(
        &self,
        instruction: &PayoutInstruction,
        msisdn: &str,
        amount_minor: i64,
    ) -> InitiateOutcome {
        let body = InitiateRequest {
            amount: amount_minor,
            currency: instruction.currency.code(),
            recipient: Recipient {
                kind: "mobile_money",
                msisdn,
                country: instruction.country.code(),
            },
            reference: &instruction.reference,
            description: &instruction.description,
            metadata: serde_json::json!({ "farmer_id": instruction.farmer_id }),
            notification: self.notification(),
        };

        let response = self
            .http
            .post(format!("{}/v1/payouts", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("X-Client-Id", &self.config.client_id)
            .json(&body)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<InitiateResponse>().await {
                Ok(accepted) => InitiateOutcome::Accepted {
                    psp_reference: accepted.reference,
                    status: accepted.status,
                    estimated_arrival: accepted.estimated_arrival,
                },
                Err(e) => InitiateOutcome::Rejected {
                    reason: format!("Unreadable PSP response: {e}"),
                },
            },
            Ok(resp) => {
                let status = resp.status();
                let reason = resp
                    .json::<ErrorBody>()
                    .await
                    .map(|b| b.error.message)
                    .unwrap_or_else(|_| format!("Payout request failed with HTTP {status}"));
                InitiateOutcome::Rejected { reason }
            }
            Err(e) => InitiateOutcome::Rejected {
                reason: format!("PSP unreachable: {e}"),
            },
        }
    }
}

#[async_trait]
impl PspGateway for OnafriqClient {
    async fn initiate(&self, instruction: &PayoutInstruction) -> InitiateOutcome {
        // Validation failures never reach the wire.
        let (msisdn, amount_minor) = match self.validate(instruction) {
            Ok(v) => v,
            Err(reason) => {
                debug!(reference = %instruction.reference, %reason, "payout rejected before dispatch");
                return InitiateOutcome::Rejected { reason };
            }
        };

        let outcome = self.post_initiate(instruction, &msisdn, amount_minor).await;
        if let InitiateOutcome::Rejected { reason } = &outcome {
            warn!(reference = %instruction.reference, %reason, "payout initiation rejected");
        }
        outcome
    }

    async fn check_status(&self, reference: &str) -> Option<PayoutStatusSnapshot> {
        let response = self
            .http
            .get(format!("{}/v1/payouts/{reference}", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("X-Client-Id", &self.config.client_id)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body = response.json::<StatusResponse>().await.ok()?;
        Some(PayoutStatusSnapshot {
            reference: body.reference,
            status: body.status,
            amount_minor: body.amount,
            currency: body.currency,
            completed_at: body.completed_at,
            failure_reason: body.failure_reason,
        })
    }

    async fn balance(&self) -> Option<serde_json::Value> {
        let response = self
            .http
            .get(format!("{}/v1/balance", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .header("X-Client-Id", &self.config.client_id)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        response.json::<serde_json::Value>().await.ok()
    }

    async fn send_batch(&self, instructions: &[PayoutInstruction]) -> BatchOutcome {
        let batch_id = Uuid::new_v4();
        let mut items = Vec::with_capacity(instructions.len());
        for (i, instruction) in instructions.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(BATCH_PACING).await;
            }
            let outcome = self.initiate(instruction).await;
            items.push((instruction.reference.clone(), outcome));
        }
        BatchOutcome { batch_id, items }
    }
}
