//! JSON seed format for the in-memory store.
//!
//! ```json
//! { "customers": [ { "id": 1, "name": "...", "email": "...",
//!                    "created_at": "2023-01-01T00:00:00Z",
//!                    "vehicles": [ { "id": 10, "customer_id": 1, ... } ] } ] }
//! ```
//!
//! A bare array of customers is accepted as well.

use std::path::Path;

use campaign_core::types::Customer;
use campaign_core::CampaignResult;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub customers: Vec<Customer>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedShape {
    Wrapped(SeedData),
    Bare(Vec<Customer>),
}

impl SeedData {
    pub fn from_json(raw: &str) -> CampaignResult<Self> {
        let shape: SeedShape = serde_json::from_str(raw)?;
        Ok(match shape {
            SeedShape::Wrapped(data) => data,
            SeedShape::Bare(customers) => SeedData { customers },
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> CampaignResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Vehicles whose `customer_id` disagrees with the owning customer are
    /// re-owned; the nesting wins.
    pub fn normalized(mut self) -> Self {
        for customer in &mut self.customers {
            for vehicle in &mut customer.vehicles {
                vehicle.customer_id = customer.id;
            }
        }
        self
    }
}
