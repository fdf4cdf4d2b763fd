//! Collaborator seams consumed by the pipeline.
//!
//! Every external dependency of a run is reached through one of these
//! traits so the orchestrator can be exercised with fakes and so each
//! implementation can be swapped independently.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{CampaignError, CampaignResult};
use crate::types::{
    Customer, DispatchRecord, GenerationPrompt, GroupCampaignRecord,
    GroupMetrics, HolidayEvent, OutboundEmail, RunSummary, WeatherFact,
};

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_weather(&self, location: &str) -> CampaignResult<WeatherFact>;
}

#[async_trait]
pub trait HolidayProvider: Send + Sync {
    /// Events in `[today, today + days_ahead]`, any order.
    async fn upcoming_holidays(&self, days_ahead: u32) -> CampaignResult<Vec<HolidayEvent>>;
}

/// Free-text generation. Returns the raw model output; parsing into a
/// template is done by the caller.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, prompt: &GenerationPrompt) -> CampaignResult<String>;
}

#[async_trait]
pub trait MessageDelivery: Send + Sync {
    /// Sends one email and returns the provider's message id.
    async fn send(&self, email: &OutboundEmail) -> CampaignResult<String>;
}

/// Read/write contract against the customer and campaign store.
///
/// Each write commits on its own; there is no transaction spanning calls.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn customers_by_location(&self, location: &str) -> CampaignResult<Vec<Customer>>;

    /// Every customer owning at least one vehicle.
    async fn customers_with_vehicles(&self) -> CampaignResult<Vec<Customer>>;

    async fn create_group_campaign(&self, record: &GroupCampaignRecord) -> CampaignResult<()>;

    async fn insert_dispatch(&self, record: &DispatchRecord) -> CampaignResult<()>;

    /// Persists the outcome already applied to `record`: status, message
    /// id, error and send time are copied as-is.
    async fn update_dispatch_status(&self, record: &DispatchRecord) -> CampaignResult<()>;

    async fn update_group_metrics(
        &self,
        campaign_id: Uuid,
        metrics: &GroupMetrics,
    ) -> CampaignResult<()>;

    async fn dispatches_for_run(&self, run_id: Uuid) -> CampaignResult<Vec<DispatchRecord>>;

    async fn save_run_summary(&self, summary: &RunSummary) -> CampaignResult<()>;

    async fn run_summary(&self, run_id: Uuid) -> CampaignResult<Option<RunSummary>>;
}

/// Rate-limiting delay seam used between dispatches.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Bounds an external call. An elapsed timer becomes `CampaignError::Timeout`.
pub async fn bounded<T, F>(operation: &str, timeout_ms: u64, fut: F) -> CampaignResult<T>
where
    F: Future<Output = CampaignResult<T>>,
{
    match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
        Ok(result) => result,
        Err(_) => Err(CampaignError::timeout(operation, timeout_ms)),
    }
}
