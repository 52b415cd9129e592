use crate::domain::msisdn::Country;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The owner of a wallet and the destination of its payouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farmer {
    pub id: Uuid,
    pub name: String,
    /// Mobile-money number in local or international form. A farmer without
    /// one cannot receive payouts.
    pub phone_number: Option<String>,
    pub country: Country,
}

impl Farmer {
    pub fn new(name: impl Into<String>, phone_number: Option<String>, country: Country) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            phone_number,
            country,
        }
    }
}
