//! In-memory campaign store backed by DashMap.
//!
//! Implements the full `CampaignStore` contract for development runs and
//! tests. Customers are a read-only snapshot loaded at construction;
//! everything written by a run is keyed by id and never overwritten, so
//! earlier runs' dispatch records survive later runs untouched.

use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use campaign_core::providers::CampaignStore;
use campaign_core::types::{
    Customer, CustomerId, DispatchRecord, GroupCampaignRecord, GroupCampaignStatus,
    GroupMetrics, RunSummary,
};
use campaign_core::{CampaignError, CampaignResult};

use crate::seed::SeedData;

pub struct InMemoryStore {
    customers: DashMap<CustomerId, Customer>,
    group_campaigns: DashMap<Uuid, GroupCampaignRecord>,
    group_metrics: DashMap<Uuid, GroupMetrics>,
    dispatches: DashMap<Uuid, DispatchRecord>,
    run_summaries: DashMap<Uuid, RunSummary>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            customers: DashMap::new(),
            group_campaigns: DashMap::new(),
            group_metrics: DashMap::new(),
            dispatches: DashMap::new(),
            run_summaries: DashMap::new(),
        }
    }

    pub fn with_customers(customers: impl IntoIterator<Item = Customer>) -> Self {
        let store = Self::new();
        for customer in customers {
            store.customers.insert(customer.id, customer);
        }
        store
    }

    pub fn from_seed(seed: SeedData) -> Self {
        let store = Self::with_customers(seed.normalized().customers);
        info!(
            customers = store.customers.len(),
            "Campaign store initialized (in-memory)"
        );
        store
    }

    pub fn from_seed_file(path: impl AsRef<Path>) -> CampaignResult<Self> {
        let seed = SeedData::from_file(path)?;
        Ok(Self::from_seed(seed))
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    /// Distinct preferred locations, sorted.
    pub fn locations(&self) -> Vec<String> {
        let mut locations: Vec<String> = self
            .customers
            .iter()
            .filter_map(|r| r.value().preferred_location.clone())
            .collect();
        locations.sort();
        locations.dedup();
        locations
    }

    pub fn group_campaign(&self, id: Uuid) -> Option<GroupCampaignRecord> {
        self.group_campaigns.get(&id).map(|r| r.value().clone())
    }

    pub fn group_metrics(&self, campaign_id: Uuid) -> Option<GroupMetrics> {
        self.group_metrics.get(&campaign_id).map(|r| r.value().clone())
    }

    pub fn group_campaigns_for_run(&self, run_id: Uuid) -> Vec<GroupCampaignRecord> {
        let mut records: Vec<GroupCampaignRecord> = self
            .group_campaigns
            .iter()
            .filter(|r| r.value().run_id == run_id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        records
    }

    pub fn all_dispatches(&self) -> Vec<DispatchRecord> {
        let mut records: Vec<DispatchRecord> =
            self.dispatches.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        records
    }

    fn sorted_customers(&self, keep: impl Fn(&Customer) -> bool) -> Vec<Customer> {
        let mut customers: Vec<Customer> = self
            .customers
            .iter()
            .filter(|r| keep(r.value()))
            .map(|r| r.value().clone())
            .collect();
        customers.sort_by_key(|c| c.id);
        customers
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CampaignStore for InMemoryStore {
    async fn customers_by_location(&self, location: &str) -> CampaignResult<Vec<Customer>> {
        Ok(self.sorted_customers(|c| c.preferred_location.as_deref() == Some(location)))
    }

    async fn customers_with_vehicles(&self) -> CampaignResult<Vec<Customer>> {
        Ok(self.sorted_customers(|c| !c.vehicles.is_empty()))
    }

    async fn create_group_campaign(&self, record: &GroupCampaignRecord) -> CampaignResult<()> {
        if self.group_campaigns.contains_key(&record.id) {
            return Err(CampaignError::Store(format!(
                "group campaign {} already exists",
                record.id
            )));
        }
        self.group_campaigns.insert(record.id, record.clone());
        debug!(campaign_id = %record.id, group = %record.group_label, "Group campaign created");
        Ok(())
    }

    async fn insert_dispatch(&self, record: &DispatchRecord) -> CampaignResult<()> {
        if self.dispatches.contains_key(&record.id) {
            return Err(CampaignError::Store(format!(
                "dispatch {} already exists",
                record.id
            )));
        }
        self.dispatches.insert(record.id, record.clone());
        Ok(())
    }

    async fn update_dispatch_status(&self, update: &DispatchRecord) -> CampaignResult<()> {
        let id = update.id;
        let mut entry = self
            .dispatches
            .get_mut(&id)
            .ok_or_else(|| CampaignError::Store(format!("dispatch {id} not found")))?;
        let record = entry.value_mut();
        if record.status.is_terminal() {
            return Err(CampaignError::Store(format!(
                "dispatch {id} is already {:?}",
                record.status
            )));
        }
        record.status = update.status;
        record.message_id = update.message_id.clone();
        record.error = update.error.clone();
        record.sent_at = update.sent_at;
        Ok(())
    }

    async fn update_group_metrics(
        &self,
        campaign_id: Uuid,
        metrics: &GroupMetrics,
    ) -> CampaignResult<()> {
        let mut campaign = self
            .group_campaigns
            .get_mut(&campaign_id)
            .ok_or_else(|| CampaignError::Store(format!("group campaign {campaign_id} not found")))?;
        if metrics.messages_sent > 0 {
            campaign.value_mut().status = GroupCampaignStatus::Sent;
        }
        self.group_metrics.insert(campaign_id, metrics.clone());
        Ok(())
    }

    async fn dispatches_for_run(&self, run_id: Uuid) -> CampaignResult<Vec<DispatchRecord>> {
        let mut records: Vec<DispatchRecord> = self
            .dispatches
            .iter()
            .filter(|r| r.value().run_id == run_id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn save_run_summary(&self, summary: &RunSummary) -> CampaignResult<()> {
        self.run_summaries
            .insert(summary.result.run_id, summary.clone());
        Ok(())
    }

    async fn run_summary(&self, run_id: Uuid) -> CampaignResult<Option<RunSummary>> {
        Ok(self.run_summaries.get(&run_id).map(|r| r.value().clone()))
    }
}
