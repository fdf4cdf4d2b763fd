//! Group deduplication: partitions targeted customers so content is
//! generated once per distinct key instead of once per customer.

use std::collections::{BTreeMap, HashSet};

use campaign_core::config::TargetingConfig;
use campaign_core::types::{CampaignGroup, Customer, GroupKey, ServiceNeed, TriggerKind};
use chrono::NaiveDate;
use tracing::debug;

pub struct GroupingEngine {
    config: TargetingConfig,
}

impl GroupingEngine {
    pub fn new(config: TargetingConfig) -> Self {
        Self { config }
    }

    /// Splits `customers` into disjoint groups. Location-based triggers key
    /// on preferred location; the rest key on primary service need. Every
    /// customer ends up in exactly one group, and groups come out in key
    /// order.
    pub fn partition(
        &self,
        customers: Vec<Customer>,
        trigger: TriggerKind,
        today: NaiveDate,
    ) -> Vec<CampaignGroup> {
        let mut groups: BTreeMap<GroupKey, CampaignGroup> = BTreeMap::new();
        let mut seen = HashSet::new();

        for customer in customers {
            if !seen.insert(customer.id) {
                continue;
            }
            let key = if trigger.is_location_based() {
                GroupKey::Location(customer.preferred_location.clone().unwrap_or_default())
            } else {
                GroupKey::ServiceNeed(self.primary_need(&customer, today))
            };
            groups
                .entry(key.clone())
                .or_insert_with(|| CampaignGroup::new(key))
                .members
                .push(customer);
        }

        debug!(trigger = %trigger, groups = groups.len(), "Partitioned targeted customers");
        groups.into_values().collect()
    }

    /// Highest-priority need across all of the customer's vehicles.
    pub fn primary_need(&self, customer: &Customer, today: NaiveDate) -> ServiceNeed {
        let cfg = &self.config;
        customer
            .vehicles
            .iter()
            .map(|v| {
                if v
                    .days_until_warranty_expiry(today)
                    .is_some_and(|days| (0..=cfg.warranty_window_days).contains(&days))
                {
                    ServiceNeed::WarrantyExpiring
                } else if v
                    .days_since_service(today)
                    .map_or(true, |days| days > cfg.service_overdue_days)
                {
                    ServiceNeed::ServiceOverdue
                } else if v.mileage.is_some_and(|km| km > cfg.high_mileage_km) {
                    ServiceNeed::HighMileage
                } else {
                    ServiceNeed::GeneralService
                }
            })
            .min()
            .unwrap_or(ServiceNeed::GeneralService)
    }
}
