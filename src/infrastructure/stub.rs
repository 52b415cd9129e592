use crate::domain::ports::{
    BatchOutcome, InitiateOutcome, PayoutInstruction, PayoutStatusSnapshot, PspGateway,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Gateway that accepts every well-formed instruction without any network
/// traffic. Used for dry runs and CLI tests.
#[derive(Default)]
pub struct StubPsp;

impl StubPsp {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PspGateway for StubPsp {
    async fn initiate(&self, instruction: &PayoutInstruction) -> InitiateOutcome {
        InitiateOutcome::Accepted {
            psp_reference: format!("STUB-{}", instruction.reference),
            status: "accepted".to_string(),
            estimated_arrival: None,
        }
    }

    async fn check_status(&self, reference: &str) -> Option<PayoutStatusSnapshot> {
        Some(PayoutStatusSnapshot {
            reference: reference.to_string(),
            status: "accepted".to_string(),
            amount_minor: 0,
            currency: String::new(),
            completed_at: None,
            failure_reason: None,
        })
    }

    async fn balance(&self) -> Option<serde_json::Value> {
        None
    }

    async fn send_batch(&self, instructions: &[PayoutInstruction]) -> BatchOutcome {
        let mut items = Vec::with_capacity(instructions.len());
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
